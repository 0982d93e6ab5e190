//! Navigation capability the core uses to force a view change
//!
//! The core never drives a UI directly. When the backend rejects the
//! session it asks a [`Navigator`] for a hard redirect; the UI decides what
//! that means (a full reset of in-memory view state, in the terminal panel).

use std::sync::Mutex;

use crate::guard::Route;

pub trait Navigator: Send + Sync {
    /// Leave the current view for `route`, discarding any view state
    fn redirect(&self, route: Route);
}

/// Navigator that records the latest redirect for the UI loop to pick up
#[derive(Debug, Default)]
pub struct RedirectSlot {
    pending: Mutex<Option<Route>>,
}

impl RedirectSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the pending redirect, if any, leaving the slot empty
    pub fn take(&self) -> Option<Route> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl Navigator for RedirectSlot {
    fn redirect(&self, route: Route) {
        tracing::debug!("Redirect requested to {}", route);
        *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = Some(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_redirect_wins() {
        let slot = RedirectSlot::new();
        assert!(!slot.is_pending());

        slot.redirect(Route::Computers);
        slot.redirect(Route::Login);
        assert!(slot.is_pending());

        assert_eq!(slot.take(), Some(Route::Login));
        assert_eq!(slot.take(), None);
    }
}
