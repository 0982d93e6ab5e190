//! Application state and logic

use std::path::{Path, PathBuf};
use std::sync::Arc;

use flitify_core::api::{ClientRegistration, ClientStatus, DirEntry, LoginOutcome};
use flitify_core::config::DefaultView;
use flitify_core::view::{self, ShellTranscript};
use flitify_core::{ApiClient, ApiError, Config, GuardDecision, RedirectSlot, Route, RouteGuard};

/// Application result for main loop
pub enum AppResult {
    Continue,
    Quit,
}

/// Status message severity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

/// Login view
#[derive(Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub focus: LoginField,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn active_field(&mut self) -> &mut String {
        match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }
}

/// Registered clients view
#[derive(Debug, Default)]
pub struct ComputersView {
    pub clients: Vec<ClientRegistration>,
    pub cursor: usize,
    pub error: Option<String>,
}

impl ComputersView {
    pub fn selected(&self) -> Option<&ClientRegistration> {
        self.clients.get(self.cursor)
    }
}

/// Panels of the interact view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Status,
    Files,
    Shell,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Status, Tab::Files, Tab::Shell];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Status => "Status",
            Tab::Files => "Files",
            Tab::Shell => "Shell",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Status => 0,
            Tab::Files => 1,
            Tab::Shell => 2,
        }
    }

    pub fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }
}

/// Remote file browser state
#[derive(Debug)]
pub struct FilesPane {
    pub path: String,
    pub entries: Vec<DirEntry>,
    pub cursor: usize,
    pub error: Option<String>,
}

impl Default for FilesPane {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            entries: Vec::new(),
            cursor: 0,
            error: None,
        }
    }
}

impl FilesPane {
    /// Rows as displayed: a `..` row first when not at the root
    pub fn has_parent_row(&self) -> bool {
        self.path != "/"
    }

    pub fn row_count(&self) -> usize {
        self.entries.len() + usize::from(self.has_parent_row())
    }
}

/// Online clients with the selected client's panels
#[derive(Debug, Default)]
pub struct InteractView {
    pub clients: Vec<String>,
    pub selected: usize,
    pub tab: Tab,
    pub status: Option<ClientStatus>,
    pub status_error: Option<String>,
    pub files: FilesPane,
    pub shell: Option<ShellTranscript>,
    pub error: Option<String>,
}

impl InteractView {
    pub fn client_id(&self) -> Option<&str> {
        self.clients.get(self.selected).map(String::as_str)
    }

    fn is_current(&self, client_id: &str) -> bool {
        self.client_id() == Some(client_id)
    }

    /// Swap in a fresh online list, keeping the selection and its panels
    /// when the selected client is still online
    pub fn replace_clients(&mut self, clients: Vec<String>) {
        let previous = self.client_id().map(String::from);
        self.clients = clients;

        let kept = previous
            .as_deref()
            .and_then(|id| self.clients.iter().position(|c| c == id));
        match kept {
            Some(index) => self.selected = index,
            None => {
                self.selected = 0;
                self.reset_panels();
            }
        }
    }

    fn reset_panels(&mut self) {
        self.status = None;
        self.status_error = None;
        self.files = FilesPane::default();
        self.shell = None;
    }
}

pub enum View {
    Login(LoginForm),
    Computers(ComputersView),
    Interact(InteractView),
}

/// Single-line text prompts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// `<client_id> <secret>`
    AddClient,
    ChangeSecret(String),
    ConfirmDelete(String),
    /// Local file to upload into the current remote directory
    Upload,
    Shell,
    ChangePassword,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

impl Prompt {
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            input: String::new(),
        }
    }

    pub fn label(&self) -> String {
        match &self.kind {
            PromptKind::AddClient => "New client (id secret): ".to_string(),
            PromptKind::ChangeSecret(id) => format!("New secret for {}: ", id),
            PromptKind::ConfirmDelete(id) => format!("Remove {}? (y/n): ", id),
            PromptKind::Upload => "Upload local file: ".to_string(),
            PromptKind::Shell => "$ ".to_string(),
            PromptKind::ChangePassword => "New password: ".to_string(),
        }
    }

    /// Whether the input should be masked on screen
    pub fn is_secret(&self) -> bool {
        matches!(self.kind, PromptKind::ChangePassword)
    }
}

/// Main application struct
pub struct App {
    pub config: Config,
    pub api: ApiClient,
    pub guard: RouteGuard,
    pub redirects: Arc<RedirectSlot>,
    pub route: Route,
    pub view: View,
    pub prompt: Option<Prompt>,
    pub status_message: Option<(String, StatusLevel)>,
}

impl App {
    pub fn new(config: Config, api: ApiClient, redirects: Arc<RedirectSlot>) -> Self {
        let guard = RouteGuard::new(api.session().clone());

        Self {
            config,
            api,
            guard,
            redirects,
            route: Route::Login,
            view: View::Login(LoginForm::default()),
            prompt: None,
            status_message: None,
        }
    }

    pub fn username(&self) -> String {
        self.api.session().username()
    }

    pub fn set_status(&mut self, message: impl Into<String>, level: StatusLevel) {
        self.status_message = Some((message.into(), level));
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Navigate to `target`, following guard redirects
    pub async fn navigate(&mut self, target: Route) {
        let mut target = target;

        // Redirect chains are at most unknown -> landing -> login
        for _ in 0..3 {
            match self.guard.check(&target) {
                GuardDecision::Render(route) => {
                    self.render(route).await;
                    return;
                }
                GuardDecision::Redirect(next) => {
                    tracing::debug!("Guard redirected {} to {}", target, next);
                    target = next;
                }
            }
        }

        tracing::warn!("Redirect loop while navigating, showing login");
        self.render(Route::Login).await;
    }

    /// Apply a hard redirect requested by the core, discarding view state
    pub async fn sync_redirect(&mut self) {
        if let Some(route) = self.redirects.take() {
            tracing::info!("Session ended by backend, redirecting to {}", route);
            self.navigate(route).await;
            self.set_status("Session expired, please log in again", StatusLevel::Warning);
        }
    }

    async fn render(&mut self, route: Route) {
        self.prompt = None;

        match route {
            Route::Login => {
                self.view = View::Login(LoginForm::default());
            }
            Route::Computers => {
                self.view = View::Computers(ComputersView::default());
                self.refresh_computers().await;
            }
            Route::Interact => {
                self.view = View::Interact(InteractView::default());
                self.refresh_online().await;
            }
            Route::Logout => {
                self.guard.perform_logout(self.redirects.as_ref());
                let next = self.redirects.take().unwrap_or(Route::Login);
                self.view = View::Login(LoginForm::default());
                self.route = next;
                self.set_status("Logged out", StatusLevel::Info);
                return;
            }
            Route::Root | Route::Unknown(_) => {
                tracing::warn!("Guard rendered non-view route {}", route);
                return;
            }
        }

        self.route = route;
    }

    /// Route opened after a successful login
    fn after_login_route(&self) -> Route {
        match self.config.tui.default_view {
            DefaultView::Interact => Route::Interact,
            DefaultView::Computers => Route::Computers,
        }
    }

    // Login

    pub async fn submit_login(&mut self) {
        let View::Login(form) = &mut self.view else {
            return;
        };
        form.error = None;
        let username = form.username.clone();
        let password = std::mem::take(&mut form.password);

        let result = self.api.login(&username, &password).await;

        match result {
            Ok(LoginOutcome::Success { username }) => {
                self.navigate(self.after_login_route()).await;
                self.set_status(format!("Signed in as {}", username), StatusLevel::Success);
            }
            Ok(LoginOutcome::InvalidCredentials) => {
                self.login_error("invalid username or password".to_string());
            }
            Ok(LoginOutcome::Failed(reason)) => self.login_error(reason),
            Err(e) => {
                tracing::warn!("Login failed: {}", e);
                self.login_error(describe(&e));
            }
        }
    }

    fn login_error(&mut self, message: String) {
        if let View::Login(form) = &mut self.view {
            form.error = Some(message);
        }
    }

    // Computers

    pub async fn refresh_computers(&mut self) {
        let result = self.api.list_clients().await;

        if let View::Computers(v) = &mut self.view {
            match result {
                Ok(clients) => {
                    v.clients = clients;
                    v.cursor = v.cursor.min(v.clients.len().saturating_sub(1));
                    v.error = None;
                }
                Err(e) => v.error = Some(describe(&e)),
            }
        }
    }

    pub async fn add_client(&mut self, input: &str) {
        let mut parts = input.split_whitespace();
        let (Some(client_id), Some(secret), None) = (parts.next(), parts.next(), parts.next()) else {
            self.set_status("Expected: <client_id> <secret>", StatusLevel::Error);
            return;
        };

        match self.api.create_client(client_id, secret).await {
            Ok(()) => self.set_status(format!("Registered {}", client_id), StatusLevel::Success),
            Err(e) => self.set_status(describe(&e), StatusLevel::Error),
        }
        self.refresh_computers().await;
    }

    pub async fn change_secret(&mut self, client_id: &str, secret: &str) {
        if secret.is_empty() {
            self.set_status("Secret cannot be empty", StatusLevel::Error);
            return;
        }

        match self.api.update_client_secret(client_id, secret).await {
            Ok(()) => self.set_status(format!("Secret changed for {}", client_id), StatusLevel::Success),
            Err(e) => self.set_status(describe(&e), StatusLevel::Error),
        }
    }

    pub async fn delete_client(&mut self, client_id: &str) {
        match self.api.delete_client(client_id).await {
            Ok(()) => self.set_status(format!("Removed {}", client_id), StatusLevel::Success),
            Err(e) => self.set_status(describe(&e), StatusLevel::Error),
        }
        self.refresh_computers().await;
    }

    pub async fn change_password(&mut self, new_password: &str) {
        if new_password.is_empty() {
            self.set_status("Password cannot be empty", StatusLevel::Error);
            return;
        }

        match self.api.change_password(new_password).await {
            Ok(()) => self.set_status("Password changed", StatusLevel::Success),
            Err(e) => self.set_status(describe(&e), StatusLevel::Error),
        }
    }

    // Interact

    pub async fn refresh_online(&mut self) {
        let result = self.api.online_clients().await;

        if let View::Interact(v) = &mut self.view {
            match result {
                Ok(clients) => {
                    v.replace_clients(clients);
                    v.error = None;
                }
                Err(e) => {
                    v.error = Some(describe(&e));
                    return;
                }
            }
        }

        self.load_current_tab().await;
    }

    /// Move the client selection by `delta`, wrapping around
    pub async fn select_client(&mut self, delta: isize) {
        let View::Interact(v) = &mut self.view else {
            return;
        };
        if v.clients.is_empty() {
            return;
        }

        let len = v.clients.len() as isize;
        v.selected = (v.selected as isize + delta).rem_euclid(len) as usize;
        v.reset_panels();
        self.load_current_tab().await;
    }

    pub async fn switch_tab(&mut self, tab: Tab) {
        if let View::Interact(v) = &mut self.view {
            v.tab = tab;
        }
        self.load_current_tab().await;
    }

    async fn load_current_tab(&mut self) {
        let View::Interact(v) = &mut self.view else {
            return;
        };
        let Some(client_id) = v.client_id().map(String::from) else {
            return;
        };

        let tab = v.tab;
        match tab {
            Tab::Status => self.load_status(&client_id).await,
            Tab::Files => self.load_dir(&client_id).await,
            Tab::Shell => {
                if v.shell.is_none() {
                    v.shell = Some(ShellTranscript::new(&client_id));
                }
            }
        }
    }

    pub async fn load_status(&mut self, client_id: &str) {
        let result = self.api.client_status(client_id).await;

        // Drop responses for a client that is no longer selected
        let View::Interact(v) = &mut self.view else {
            return;
        };
        if !v.is_current(client_id) {
            return;
        }

        match result {
            Ok(status) => {
                v.status = Some(status);
                v.status_error = None;
            }
            Err(e) => {
                tracing::warn!("Status for {} failed: {}", client_id, e);
                v.status_error = Some("Failed to load status".to_string());
            }
        }
    }

    pub async fn load_dir(&mut self, client_id: &str) {
        let path = match &self.view {
            View::Interact(v) => v.files.path.clone(),
            _ => return,
        };

        let result = self.api.list_dir(client_id, &path).await;

        let View::Interact(v) = &mut self.view else {
            return;
        };
        if !v.is_current(client_id) || v.files.path != path {
            return;
        }

        match result {
            Ok(entries) => {
                v.files.entries = entries;
                v.files.cursor = 0;
                v.files.error = None;
            }
            Err(e) => {
                tracing::warn!("Listing {} on {} failed: {}", path, client_id, e);
                v.files.entries.clear();
                v.files.error = Some("Cannot load files".to_string());
            }
        }
    }

    pub fn files_cursor(&mut self, delta: isize) {
        if let View::Interact(v) = &mut self.view {
            let rows = v.files.row_count();
            if rows == 0 {
                return;
            }
            let next = (v.files.cursor as isize + delta).clamp(0, rows as isize - 1);
            v.files.cursor = next as usize;
        }
    }

    /// Open the row under the cursor: descend into dirs, download files
    pub async fn files_enter(&mut self) {
        let View::Interact(v) = &mut self.view else {
            return;
        };
        let Some(client_id) = v.client_id().map(String::from) else {
            return;
        };

        let files = &mut v.files;
        let index = if files.has_parent_row() {
            if files.cursor == 0 {
                files.path = view::parent_path(&files.path);
                self.load_dir(&client_id).await;
                return;
            }
            files.cursor - 1
        } else {
            files.cursor
        };

        let Some(entry) = files.entries.get(index).cloned() else {
            return;
        };

        if entry.is_dir() {
            files.path = view::join_path(&files.path, &entry.name);
            self.load_dir(&client_id).await;
        } else {
            let remote = view::join_path(&files.path, &entry.name);
            self.download(&client_id, &remote, &entry.name).await;
        }
    }

    pub async fn files_up(&mut self) {
        let View::Interact(v) = &mut self.view else {
            return;
        };
        if !v.files.has_parent_row() {
            return;
        }
        let Some(client_id) = v.client_id().map(String::from) else {
            return;
        };

        v.files.path = view::parent_path(&v.files.path);
        self.load_dir(&client_id).await;
    }

    async fn download(&mut self, client_id: &str, remote: &str, name: &str) {
        let dest = self.download_dir().join(name);

        match self.api.download_to(client_id, remote, &dest).await {
            Ok(bytes) => self.set_status(
                format!("Saved {} ({} bytes) to {}", name, bytes, dest.display()),
                StatusLevel::Success,
            ),
            Err(e) => {
                tracing::warn!("Download of {} failed: {}", remote, e);
                self.set_status("Failed to download file", StatusLevel::Error);
            }
        }
    }

    fn download_dir(&self) -> PathBuf {
        self.config
            .tui
            .download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub async fn upload(&mut self, local: &str) {
        let (client_id, remote_dir) = match &self.view {
            View::Interact(v) => match v.client_id() {
                Some(id) => (id.to_string(), v.files.path.clone()),
                None => return,
            },
            _ => return,
        };

        match self.api.upload_path(&client_id, Path::new(local.trim()), &remote_dir).await {
            Ok(remote) => {
                self.set_status(format!("Uploaded to {}", remote), StatusLevel::Success);
                self.load_dir(&client_id).await;
            }
            Err(e) => self.set_status(format!("Upload failed: {}", describe(&e)), StatusLevel::Error),
        }
    }

    pub async fn run_shell(&mut self, cmd: &str) {
        let cmd = cmd.trim();
        if cmd.is_empty() {
            return;
        }

        let View::Interact(v) = &mut self.view else {
            return;
        };
        let Some(client_id) = v.client_id().map(String::from) else {
            return;
        };
        v.shell
            .get_or_insert_with(|| ShellTranscript::new(&client_id))
            .begin(cmd);

        let result = self.api.shell_command(&client_id, cmd).await;

        let View::Interact(v) = &mut self.view else {
            return;
        };
        if !v.is_current(&client_id) {
            return;
        }
        if let Some(shell) = v.shell.as_mut() {
            match result {
                Ok(response) => shell.complete(&response),
                Err(e) => {
                    tracing::warn!("Shell command on {} failed: {}", client_id, e);
                    shell.fail();
                }
            }
        }
    }

    // Prompts

    pub fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt = Some(Prompt::new(kind));
    }

    pub async fn submit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };

        match prompt.kind {
            PromptKind::AddClient => self.add_client(&prompt.input).await,
            PromptKind::ChangeSecret(id) => self.change_secret(&id, prompt.input.trim()).await,
            PromptKind::ConfirmDelete(id) => {
                if prompt.input.trim().eq_ignore_ascii_case("y") {
                    self.delete_client(&id).await;
                }
            }
            PromptKind::Upload => self.upload(&prompt.input).await,
            PromptKind::Shell => self.run_shell(&prompt.input).await,
            PromptKind::ChangePassword => self.change_password(&prompt.input).await,
        }
    }
}

/// Message shown to the operator for a failed call
pub fn describe(err: &ApiError) -> String {
    match err {
        ApiError::Network(_) => "network error".to_string(),
        ApiError::Rejected { reason, .. } => reason.clone(),
        ApiError::Proxy(status) => format!("proxy error: {}", status),
        other => other.to_string(),
    }
}
