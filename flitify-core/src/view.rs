//! Presentation helpers shared by panel views
//!
//! Remote paths are always `/`-separated, whatever the operator's platform.

use crate::api::{ClientStatus, CommandResponse};

/// Parent of a remote directory; the root is its own parent
pub fn parent_path(path: &str) -> String {
    let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };

    match path.rfind('/') {
        Some(idx) if idx > 0 => path[..idx].to_string(),
        _ => "/".to_string(),
    }
}

/// Join a remote directory and an entry name
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// `1d 2h 3m`, with the day part omitted when zero
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

/// Rounded percentage, `None` when the total is zero
pub fn percent(used: f64, total: f64) -> Option<u32> {
    if total <= 0.0 {
        return None;
    }
    Some((used / total * 100.0).round().max(0.0) as u32)
}

/// Memory line for the status dashboard
pub fn memory_summary(status: &ClientStatus) -> String {
    match percent(status.memory_used, status.memory_total) {
        Some(p) => format!("{}% ({} / {} GiB)", p, status.memory_used, status.memory_total),
        None => format!("{} / {} GiB", status.memory_used, status.memory_total),
    }
}

/// Trimmed stdout followed by a `[STDERR]` block when stderr is non-empty
pub fn format_command_output(response: &CommandResponse) -> String {
    let mut output = String::new();

    if let Some(stdout) = response.stdout.as_deref().filter(|s| !s.is_empty()) {
        output.push_str(stdout.trim());
    }
    if let Some(stderr) = response.stderr.as_deref().filter(|s| !s.is_empty()) {
        output.push_str("\n[STDERR]\n");
        output.push_str(stderr.trim());
    }

    output
}

/// Running history of a pseudo-interactive shell session
#[derive(Debug, Clone)]
pub struct ShellTranscript {
    history: String,
    pending: Option<String>,
}

impl ShellTranscript {
    pub fn new(client_id: &str) -> Self {
        Self {
            history: format!("Welcome to Flitify pseudo-interactive shell for client {}", client_id),
            pending: None,
        }
    }

    /// Record a command awaiting its response
    pub fn begin(&mut self, cmd: &str) {
        self.pending = Some(cmd.to_string());
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Attach the response to the pending command
    pub fn complete(&mut self, response: &CommandResponse) {
        let output = format_command_output(response);
        self.commit(&output);
    }

    /// Mark the pending command as failed
    pub fn fail(&mut self) {
        self.commit("Failed to execute command");
    }

    pub fn text(&self) -> String {
        match &self.pending {
            Some(cmd) => format!("{}\n$ {}\nWaiting for response...", self.history, cmd),
            None => self.history.clone(),
        }
    }

    fn commit(&mut self, output: &str) {
        if let Some(cmd) = self.pending.take() {
            self.history.push_str(&format!("\n$ {}\n{}", cmd, output));
        }
    }
}
