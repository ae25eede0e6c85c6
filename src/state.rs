//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the flat-file session store, the admin credentials loaded at
//! startup, the in-memory login registry, and the reply generator. There is
//! no cache of chat records: the store re-reads the directory on every
//! listing.

use std::sync::Arc;

use crate::services::auth::Credentials;
use crate::services::echo::ResponseSource;
use crate::services::session::LoginRegistry;
use crate::services::store::SessionStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub credentials: Arc<Credentials>,
    pub logins: LoginRegistry,
    /// Synthetic reply generator used for every chat turn.
    pub responder: Arc<dyn ResponseSource>,
}

impl AppState {
    #[must_use]
    pub fn new(store: SessionStore, credentials: Credentials, responder: Arc<dyn ResponseSource>) -> Self {
        Self { store, credentials: Arc::new(credentials), logins: LoginRegistry::new(), responder }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
