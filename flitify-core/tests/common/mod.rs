//! In-process mock of the panel backend

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use flitify_core::session::unix_now;
use flitify_core::{ApiClient, MemoryTokenStore, RedirectSlot, Session};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

/// A request as the backend saw it
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl SeenRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("json body")
    }
}

type Responder = dyn Fn(&SeenRequest) -> (StatusCode, String) + Send + Sync;

pub struct MockBackend {
    seen: Mutex<Vec<SeenRequest>>,
    respond: Box<Responder>,
}

impl MockBackend {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> SeenRequest {
        self.requests().pop().expect("no request reached the backend")
    }
}

async fn handle(
    State(mock): State<Arc<MockBackend>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };

    let seen = SeenRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(String::from),
        authorization: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE),
        body: body.to_vec(),
    };

    let (status, body) = (mock.respond)(&seen);
    mock.seen.lock().unwrap().push(seen);
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

/// Start a backend answering every request with `respond`
pub async fn spawn_backend<F>(respond: F) -> (String, Arc<MockBackend>)
where
    F: Fn(&SeenRequest) -> (StatusCode, String) + Send + Sync + 'static,
{
    let mock = Arc::new(MockBackend {
        seen: Mutex::new(Vec::new()),
        respond: Box::new(respond),
    });

    let app = Router::new().fallback(handle).with_state(Arc::clone(&mock));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), mock)
}

/// Client wired to an in-memory store and a recording navigator
pub struct Harness {
    pub api: ApiClient,
    pub store: Arc<MemoryTokenStore>,
    pub redirects: Arc<RedirectSlot>,
}

pub fn harness(base_url: &str, token: Option<&str>) -> Harness {
    let store = Arc::new(match token {
        Some(t) => MemoryTokenStore::with_token(t),
        None => MemoryTokenStore::new(),
    });
    let redirects = Arc::new(RedirectSlot::new());
    let api = ApiClient::new(base_url, Session::new(store.clone()), redirects.clone()).unwrap();

    Harness { api, store, redirects }
}

#[derive(Serialize)]
struct Claims<'a> {
    username: &'a str,
    exp: i64,
}

/// HS256 token shaped like the ones the backend issues
pub fn issue_token(username: &str, ttl_secs: i64) -> String {
    let claims = Claims {
        username,
        exp: unix_now() + ttl_secs,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"backend-secret")).unwrap()
}

pub fn ok(body: serde_json::Value) -> (StatusCode, String) {
    (StatusCode::OK, body.to_string())
}
