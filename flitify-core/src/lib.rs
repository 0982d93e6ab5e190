//! flitify-core: Session and backend contract for the Flitify admin panel
//!
//! This crate provides:
//! - Bearer token persistence behind an injectable store
//! - Session state derived from the stored token (structure and expiry)
//! - An authorized HTTP client that ends the session on 401/403
//! - Route guarding for the panel views
//! - Typed calls for the login, client registry and per-client proxy endpoints

pub mod api;
pub mod client;
pub mod config;
pub mod guard;
pub mod navigation;
pub mod session;
pub mod token;
pub mod token_store;
pub mod view;

pub use api::{ClientRegistration, ClientStatus, CommandResponse, DirEntry, EntryType, LoginOutcome};
pub use client::{ApiClient, ApiError, RequestBody, RequestOptions};
pub use config::Config;
pub use guard::{GuardDecision, Route, RouteGuard};
pub use navigation::{Navigator, RedirectSlot};
pub use session::Session;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError};

/// Default port of the panel backend
pub const DEFAULT_BACKEND_PORT: u16 = 2137;

/// Storage key (file name) the bearer token is kept under
pub const TOKEN_KEY: &str = "token";

/// Username reported when the token payload cannot be read
pub const UNKNOWN_USERNAME: &str = "unknown";
