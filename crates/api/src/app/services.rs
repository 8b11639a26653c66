//! Shared handler dependencies, built once at startup.

use std::sync::Arc;

use estate_auth::{AuthorizationGuard, Clock, PasswordHasher, SessionManager};
use estate_core::Store;

/// Everything a handler may touch.
///
/// The store is the only long-lived shared resource; the session manager and
/// the guard hold no state of their own beyond handles to it.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub sessions: SessionManager<dyn Store>,
    pub guard: AuthorizationGuard<dyn Store>,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, hasher: PasswordHasher, clock: Arc<dyn Clock>) -> Self {
        let sessions = SessionManager::new(Arc::clone(&store), hasher, clock);
        let guard = AuthorizationGuard::new(sessions.clone());
        Self {
            store,
            sessions,
            guard,
        }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        self.sessions.hasher()
    }
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
