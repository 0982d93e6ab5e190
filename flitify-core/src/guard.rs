//! Route guarding for the panel views
//!
//! Every navigation is checked against a fresh session evaluation. The login
//! view is always reachable; everything else needs a live token.

use std::fmt;

use crate::navigation::Navigator;
use crate::session::{unix_now, Session};

/// Panel views addressable by path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Interact,
    Computers,
    Logout,
    /// `/` with no view selected
    Root,
    /// Any other path
    Unknown(String),
}

impl Route {
    /// Parse a panel path. Query strings, fragments and trailing slashes are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');

        match trimmed {
            "" => Route::Root,
            "/login" => Route::Login,
            "/interact" => Route::Interact,
            "/computers" => Route::Computers,
            "/logout" => Route::Logout,
            other => Route::Unknown(other.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Login => "/login",
            Route::Interact => "/interact",
            Route::Computers => "/computers",
            Route::Logout => "/logout",
            Route::Root => "/",
            Route::Unknown(path) => path,
        }
    }

    /// View shown when the operator lands on `/` or an unknown path
    pub fn landing() -> Self {
        Route::Interact
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show the requested view
    Render(Route),
    /// Navigate elsewhere instead
    Redirect(Route),
}

/// Decides per navigation whether a view may render
#[derive(Clone)]
pub struct RouteGuard {
    session: Session,
}

impl RouteGuard {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn check(&self, route: &Route) -> GuardDecision {
        self.check_at(route, unix_now())
    }

    /// Same as [`RouteGuard::check`] against an explicit clock
    pub fn check_at(&self, route: &Route, now: i64) -> GuardDecision {
        if *route == Route::Login {
            return GuardDecision::Render(Route::Login);
        }

        // Authentication is checked before unknown paths are resolved
        if !self.session.is_authenticated_at(now) {
            tracing::debug!("Blocked {} for unauthenticated session", route);
            return GuardDecision::Redirect(Route::Login);
        }

        match route {
            Route::Root | Route::Unknown(_) => GuardDecision::Redirect(Route::landing()),
            other => GuardDecision::Render(other.clone()),
        }
    }

    /// Effect of the logout view: end the session and go to login
    pub fn perform_logout(&self, navigator: &dyn Navigator) {
        tracing::info!("Logging out {}", self.session.username());
        self.session.logout();
        navigator.redirect(Route::Login);
    }
}
