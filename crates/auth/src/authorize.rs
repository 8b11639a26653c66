//! Authorization guard.
//!
//! This is the single place the `manages_groups` capability is checked. Every
//! group-mutating handler goes through [`AuthorizationGuard::require_manages_groups`]
//! exactly once, before touching persisted state.

use tracing::debug;

use estate_core::{SessionStore, StoreError, User, UserStore};

use crate::error::AuthError;
use crate::manager::SessionManager;

/// Pure policy check on a resolved user.
///
/// - No IO
/// - No panics
pub fn authorize_manages_groups(user: &User) -> Result<(), AuthError> {
    if user.manages_groups {
        Ok(())
    } else {
        Err(AuthError::AccessDenied)
    }
}

pub struct AuthorizationGuard<S: ?Sized> {
    sessions: SessionManager<S>,
}

impl<S: ?Sized> Clone for AuthorizationGuard<S> {
    fn clone(&self) -> Self {
        Self { sessions: self.sessions.clone() }
    }
}

impl<S: ?Sized> core::fmt::Debug for AuthorizationGuard<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthorizationGuard").finish_non_exhaustive()
    }
}

impl<S> AuthorizationGuard<S>
where
    S: UserStore + SessionStore + ?Sized,
{
    pub fn new(sessions: SessionManager<S>) -> Self {
        Self { sessions }
    }

    /// Succeed only for a live session whose user currently holds the
    /// group-management capability.
    ///
    /// A user record that vanished after the session was issued yields
    /// `NoSuchUser`, distinct from `NotLoggedIn`.
    pub async fn require_manages_groups(&self, token: &str) -> Result<(), AuthError> {
        let session = self.sessions.verify_session(token).await?;

        let user = match self.sessions.store().user_by_id(session.user_id).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => return Err(AuthError::NoSuchUser),
            Err(e) => return Err(e.into()),
        };

        authorize_manages_groups(&user).inspect_err(|_| {
            debug!(user_id = %user.id, "group management denied");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::UserId;

    fn user(manages_groups: bool) -> User {
        User {
            id: UserId::new(5),
            login: "bob".into(),
            pass_hash: String::new(),
            first_name: "Bob".into(),
            last_name: "Builder".into(),
            patronymic: None,
            manages_groups,
        }
    }

    #[test]
    fn capability_flag_decides() {
        assert!(authorize_manages_groups(&user(true)).is_ok());
        assert!(matches!(authorize_manages_groups(&user(false)), Err(AuthError::AccessDenied)));
    }
}
