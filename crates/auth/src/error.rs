use thiserror::Error;

use estate_core::StoreError;

use crate::password::PasswordError;
use crate::token::TokenError;

/// Errors surfaced by the session manager and the authorization guard.
///
/// The first four variants are the typed outcomes callers map to wire codes;
/// the rest are infrastructure failures carrying their cause.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no such user")]
    NoSuchUser,

    #[error("wrong password")]
    WrongPassword,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("access denied")]
    AccessDenied,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),
}
