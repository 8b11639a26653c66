//! Session lifecycle: open, verify, close.
//!
//! The manager owns no identity state. Every call reads the injected store,
//! so a logout or an expiry is observed by the very next request.

use std::sync::Arc;

use tracing::debug;

use estate_core::{SessionStore, StoreError, UserStore};

use crate::clock::Clock;
use crate::error::AuthError;
use crate::password::PasswordHasher;
use crate::session::{Session, validate_session};
use crate::token::SessionToken;

pub struct SessionManager<S: ?Sized> {
    store: Arc<S>,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
}

impl<S: ?Sized> Clone for SessionManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hasher: self.hasher.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: ?Sized> core::fmt::Debug for SessionManager<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager").field("clock", &self.clock).finish_non_exhaustive()
    }
}

impl<S> SessionManager<S>
where
    S: UserStore + SessionStore + ?Sized,
{
    pub fn new(store: Arc<S>, hasher: PasswordHasher, clock: Arc<dyn Clock>) -> Self {
        Self { store, hasher, clock }
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Authenticate `login`/`password` and issue a fresh session.
    ///
    /// Earlier sessions of the same user stay valid.
    pub async fn open_session(&self, login: &str, password: &str) -> Result<Session, AuthError> {
        let user = match self.store.user_by_login(login).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => return Err(AuthError::NoSuchUser),
            Err(e) => return Err(e.into()),
        };

        let matches = self
            .hasher
            .verify(password.to_string(), user.pass_hash.clone())
            .await?;
        if !matches {
            return Err(AuthError::WrongPassword);
        }

        let session = Session::issue(SessionToken::generate()?, user.id, self.clock.now());
        self.store.insert_session(session.to_record()).await?;
        debug!(user_id = %user.id, expires_at = %session.expires_at, "session opened");
        Ok(session)
    }

    /// Resolve a token to its live session.
    ///
    /// Unknown, malformed and expired tokens are indistinguishable to the
    /// caller: all yield `NotLoggedIn`.
    pub async fn verify_session(&self, token: &str) -> Result<Session, AuthError> {
        let Some(token) = SessionToken::parse(token) else {
            return Err(AuthError::NotLoggedIn);
        };

        let record = match self.store.session_by_token(token.as_str()).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => return Err(AuthError::NotLoggedIn),
            Err(e) => return Err(e.into()),
        };

        if let Err(reason) = validate_session(&record, self.clock.now()) {
            debug!(user_id = %record.user_id, %reason, "rejecting stored session");
            return Err(AuthError::NotLoggedIn);
        }

        Ok(Session::from_record(token, record))
    }

    /// Delete the session behind `token`.
    ///
    /// Fails with `NotLoggedIn` only when no row existed, so a second close of
    /// the same token never succeeds. An expired but unpurged row is still
    /// removed successfully.
    pub async fn close_session(&self, token: &str) -> Result<(), AuthError> {
        let Some(token) = SessionToken::parse(token) else {
            return Err(AuthError::NotLoggedIn);
        };

        let Some(record) = self.store.delete_session(token.as_str()).await? else {
            return Err(AuthError::NotLoggedIn);
        };

        debug!(
            user_id = %record.user_id,
            expired = record.expires_at <= self.clock.now(),
            "session closed"
        );
        Ok(())
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }
}
