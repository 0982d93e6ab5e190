//! Backend contract: login, client registry and per-client proxy calls
//!
//! Shapes follow the panel backend. Registry endpoints answer with a plain
//! HTTP status; proxy endpoints (`/api/proxy/...`) additionally report
//! `proxy_status`, which must be `"ok"` for the payload to be trusted.

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{ApiClient, ApiError, Auth, RequestOptions};

/// A remote machine registered with the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub client_id: String,
    pub secret: String,
}

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Token issued and stored
    Success { username: String },
    /// Username or password rejected
    InvalidCredentials,
    /// Any other `login_status` reported by the backend
    Failed(String),
}

/// Live status of an online client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientStatus {
    #[serde(default)]
    pub uptime_seconds: u64,
    #[serde(default)]
    pub current_user: String,
    /// Percent
    #[serde(default)]
    pub cpu_usage: f64,
    /// GiB
    #[serde(default)]
    pub memory_used: f64,
    /// GiB
    #[serde(default)]
    pub memory_total: f64,
    #[serde(default)]
    pub disks: BTreeMap<String, DiskUsage>,
    /// Keyed by process identifier
    #[serde(default)]
    pub running_applications: BTreeMap<String, RunningApplication>,
}

/// Disk usage in GB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub used: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningApplication {
    pub name: String,
    #[serde(default)]
    pub open_windows: u32,
}

/// Entry kind in a remote directory listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Dir,
    #[serde(other)]
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Dir
    }
}

/// Output of a remote shell command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    login_status: Option<String>,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ClientsResponse {
    #[serde(default)]
    clients: Vec<ClientRegistration>,
}

#[derive(Deserialize)]
struct OnlineClientsResponse {
    #[serde(default)]
    client_list: Vec<String>,
}

#[derive(Deserialize)]
struct ListDirResponse {
    #[serde(default)]
    entries: Vec<DirEntry>,
}

#[derive(Deserialize)]
struct ShellResponse {
    #[serde(default)]
    command_response: Option<CommandResponse>,
}

impl ApiClient {
    /// Exchange credentials for a token and start a session.
    ///
    /// Sent without a bearer token. The backend answers bad credentials with
    /// 403, so this call does not go through the forced-logout handling of
    /// other requests.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        let url = self.endpoint(&["api", "login"])?;
        let options = RequestOptions::new().json(json!({
            "username": username,
            "password": password,
        }));

        let resp = self.dispatch(Method::POST, url, options, Auth::Anonymous).await?;
        let status = resp.status();
        let text = resp.text().await?;
        let body: LoginResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("login ({}): {}", status, e)))?;

        match (body.login_status.as_deref(), body.token) {
            (Some("ok"), Some(token)) => {
                self.session().login(&token)?;
                let claimed = self.session().username();
                let username = if claimed == crate::UNKNOWN_USERNAME {
                    username.to_string()
                } else {
                    claimed
                };
                Ok(LoginOutcome::Success { username })
            }
            (Some("ok"), None) => Ok(LoginOutcome::Failed("missing token".to_string())),
            (Some("invalid_credentials"), _) => {
                tracing::info!("Login rejected for {}", username);
                Ok(LoginOutcome::InvalidCredentials)
            }
            (other, _) => Ok(LoginOutcome::Failed(other.unwrap_or("unknown error").to_string())),
        }
    }

    /// Change the logged-in operator's password
    pub async fn change_password(&self, new_password: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "users", "change-password"])?;
        let options = RequestOptions::new().json(json!({ "newpassword": new_password }));
        let resp = self.dispatch(Method::POST, url, options, Auth::Session).await?;
        json_body(resp).await.map(|_| ())
    }

    /// All registered clients, online or not
    pub async fn list_clients(&self) -> Result<Vec<ClientRegistration>, ApiError> {
        let url = self.endpoint(&["api", "allclients"])?;
        let resp = self.dispatch(Method::GET, url, RequestOptions::new(), Auth::Session).await?;
        let body: ClientsResponse = parse(json_body(resp).await?)?;
        Ok(body.clients)
    }

    /// Register a client. An existing id is rejected with 409.
    pub async fn create_client(&self, client_id: &str, secret: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "allclients"])?;
        let options = RequestOptions::new().json(json!({
            "client_id": client_id,
            "secret": secret,
        }));
        let resp = self.dispatch(Method::POST, url, options, Auth::Session).await?;
        json_body(resp).await?;
        tracing::info!("Registered client {}", client_id);
        Ok(())
    }

    pub async fn update_client_secret(&self, client_id: &str, secret: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "allclients", client_id])?;
        let options = RequestOptions::new().json(json!({ "secret": secret }));
        let resp = self.dispatch(Method::PUT, url, options, Auth::Session).await?;
        json_body(resp).await.map(|_| ())
    }

    pub async fn delete_client(&self, client_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "allclients", client_id])?;
        let resp = self.dispatch(Method::DELETE, url, RequestOptions::new(), Auth::Session).await?;
        json_body(resp).await?;
        tracing::info!("Removed client {}", client_id);
        Ok(())
    }

    /// Ids of clients currently connected to the backend
    pub async fn online_clients(&self) -> Result<Vec<String>, ApiError> {
        let body = self.proxy_get(&["clients"], RequestOptions::new()).await?;
        let body: OnlineClientsResponse = parse(body)?;
        Ok(body.client_list)
    }

    pub async fn client_status(&self, client_id: &str) -> Result<ClientStatus, ApiError> {
        let mut body = self.proxy_get(&[client_id, "status"], RequestOptions::new()).await?;
        let status = body
            .get_mut(client_id)
            .map(Value::take)
            .ok_or_else(|| ApiError::InvalidResponse(format!("no status for {}", client_id)))?;
        parse(status)
    }

    pub async fn list_dir(&self, client_id: &str, path: &str) -> Result<Vec<DirEntry>, ApiError> {
        let options = RequestOptions::new().query("path", path);
        let body: ListDirResponse = parse(self.proxy_get(&[client_id, "listdir"], options).await?)?;
        Ok(body.entries)
    }

    /// Raw contents of a remote file
    pub async fn get_file(&self, client_id: &str, file_path: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(&["api", "proxy", client_id, "getfile"])?;
        let options = RequestOptions::new().query("file_path", file_path);
        let resp = self.dispatch(Method::GET, url, options, Auth::Session).await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(rejection(status, &text));
        }

        Ok(resp.bytes().await?.to_vec())
    }

    /// Download a remote file to `dest`, returning the number of bytes written
    pub async fn download_to(&self, client_id: &str, file_path: &str, dest: &Path) -> Result<u64, ApiError> {
        let content = self.get_file(client_id, file_path).await?;
        tokio::fs::write(dest, &content).await?;
        tracing::info!("Downloaded {} from {} to {}", file_path, client_id, dest.display());
        Ok(content.len() as u64)
    }

    /// Upload `content` as `file_name`, stored on the client at `path`
    pub async fn upload_file(
        &self,
        client_id: &str,
        file_name: &str,
        content: Vec<u8>,
        path: &str,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "proxy", client_id, "uploadfile"])?;
        let form = Form::new()
            .part("file", Part::bytes(content).file_name(file_name.to_string()))
            .text("path", path.to_string());

        let resp = self
            .dispatch(Method::POST, url, RequestOptions::new().multipart(form), Auth::Session)
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(rejection(status, &text));
        }

        // Some agents answer with an empty body; only a JSON body is checked
        if let Ok(body) = serde_json::from_str::<Value>(&text) {
            ensure_proxy_ok(&body)?;
        }
        Ok(())
    }

    /// Upload a local file into the remote directory `remote_dir`
    pub async fn upload_path(&self, client_id: &str, local: &Path, remote_dir: &str) -> Result<String, ApiError> {
        let file_name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} has no file name", local.display()),
                )
            })?
            .to_string();
        let content = tokio::fs::read(local).await?;
        let remote_path = crate::view::join_path(remote_dir, &file_name);

        self.upload_file(client_id, &file_name, content, &remote_path).await?;
        tracing::info!("Uploaded {} to {}:{}", local.display(), client_id, remote_path);
        Ok(remote_path)
    }

    pub async fn shell_command(&self, client_id: &str, cmd: &str) -> Result<CommandResponse, ApiError> {
        let options = RequestOptions::new().query("cmd", cmd);
        let body: ShellResponse = parse(self.proxy_get(&[client_id, "shellcommand"], options).await?)?;
        Ok(body.command_response.unwrap_or_default())
    }

    /// GET under `/api/proxy/`, returning the body once `proxy_status` is ok
    async fn proxy_get(&self, segments: &[&str], options: RequestOptions) -> Result<Value, ApiError> {
        let mut path = vec!["api", "proxy"];
        path.extend_from_slice(segments);
        let url = self.endpoint(&path)?;

        let resp = self.dispatch(Method::GET, url, options, Auth::Session).await?;
        let body = json_body(resp).await?;
        ensure_proxy_ok(&body)?;
        Ok(body)
    }
}

/// Read a JSON body, turning non-2xx statuses into [`ApiError::Rejected`]
async fn json_body(resp: Response) -> Result<Value, ApiError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(rejection(status, &text));
    }

    serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(format!("expected JSON body: {}", e)))
}

fn parse<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

fn ensure_proxy_ok(body: &Value) -> Result<(), ApiError> {
    match body.get("proxy_status").and_then(Value::as_str) {
        Some("ok") => Ok(()),
        Some(other) => Err(ApiError::Proxy(other.to_string())),
        None => Err(ApiError::Proxy("missing proxy_status".to_string())),
    }
}

/// Business error carrying the backend's own status word when it sent one
fn rejection(status: StatusCode, text: &str) -> ApiError {
    let reason = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|body| {
            ["proxy_status", "login_status", "error", "proxy_error"]
                .iter()
                .find_map(|key| body.get(*key).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    ApiError::Rejected { status, reason }
}
