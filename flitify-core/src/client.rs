//! Authorized HTTP client for the panel backend
//!
//! Every request carries the current bearer token, read fresh from the
//! store. A 401 or 403 from the backend ends the session: the token is
//! cleared, the UI is sent to the login view and the call fails. Every
//! other status goes back to the caller untouched.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, Url};
pub use reqwest::{Method, StatusCode};
use thiserror::Error;

use crate::config::BackendConfig;
use crate::guard::Route;
use crate::navigation::Navigator;
use crate::session::Session;
use crate::token_store::TokenStoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized ({status})")]
    Unauthorized { status: StatusCode },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request rejected ({status}): {reason}")]
    Rejected { status: StatusCode, reason: String },

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to store token: {0}")]
    Storage(#[from] TokenStoreError),

    #[error("Failed to read local file: {0}")]
    LocalIo(#[from] std::io::Error),
}

impl ApiError {
    /// Whether the session was ended because of this error
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

/// Request payload
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(reqwest::multipart::Form),
    Bytes(Vec<u8>),
}

/// Caller-supplied parts of a request
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn multipart(mut self, form: reqwest::multipart::Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn bytes(mut self, content: Vec<u8>) -> Self {
        self.body = RequestBody::Bytes(content);
        self
    }
}

/// How a request is authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    /// Bearer token from the session; 401/403 end the session
    Session,
    /// No bearer token and no session handling, for login
    Anonymous,
}

/// Backend client bound to a session and a navigator
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Session,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Create a client with reqwest's default settings
    pub fn new(base_url: &str, session: Session, navigator: Arc<dyn Navigator>) -> Result<Self, ApiError> {
        Self::build(base_url, Client::new(), session, navigator)
    }

    /// Create a client from the `[backend]` config section
    pub fn from_config(
        config: &BackendConfig,
        session: Session,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Self::build(&config.url, http, session, navigator)
    }

    fn build(base_url: &str, http: Client, session: Session, navigator: Arc<dyn Navigator>) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            http,
            base_url,
            session,
            navigator,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Send an authorized request to `path` (absolute, e.g. `/api/allclients`)
    pub async fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<Response, ApiError> {
        let url = self.url_for(path)?;
        self.dispatch(method, url, options, Auth::Session).await
    }

    pub async fn get(&self, path: &str) -> Result<Response, ApiError> {
        self.request(Method::GET, path, RequestOptions::new()).await
    }

    /// Absolute path joined onto the base URL
    pub(crate) fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", joined, e)))
    }

    /// URL built from raw path segments, each percent-encoded
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(format!("{} cannot have a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request authorized according to `auth`
    pub(crate) async fn dispatch(
        &self,
        method: Method,
        url: Url,
        options: RequestOptions,
        auth: Auth,
    ) -> Result<Response, ApiError> {
        let RequestOptions { mut headers, query, body } = options;

        match (auth, self.session.token()) {
            (Auth::Anonymous, _) => {}
            (Auth::Session, Some(token)) => match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Stored token is not a valid header value, sending without it"),
            },
            (Auth::Session, None) => {
                headers.remove(AUTHORIZATION);
            }
        }

        // Multipart bodies carry their own boundary content type
        let is_multipart = matches!(body, RequestBody::Multipart(_));
        if !is_multipart && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        tracing::debug!("{} {}", method, url.path());

        let mut req = self.http.request(method.clone(), url.clone()).headers(headers);
        if !query.is_empty() {
            req = req.query(&query);
        }
        req = match body {
            RequestBody::Empty => req,
            RequestBody::Json(value) => req.json(&value),
            RequestBody::Multipart(form) => req.multipart(form),
            RequestBody::Bytes(content) => req.body(content),
        };

        let resp = req.send().await.map_err(|e| {
            tracing::warn!("{} {} failed: {}", method, url.path(), e);
            ApiError::Network(e)
        })?;

        let status = resp.status();
        if auth == Auth::Session && (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN) {
            tracing::warn!("{} {} returned {}, ending session", method, url.path(), status);
            self.session.logout();
            self.navigator.redirect(Route::Login);
            return Err(ApiError::Unauthorized { status });
        }

        Ok(resp)
    }
}
