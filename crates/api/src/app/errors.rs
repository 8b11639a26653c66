//! Handler errors and their mapping onto wire status codes.
//!
//! Every typed error is matched explicitly; there is no catch-all arm, so a
//! new error variant fails to compile until it is given a status.

use thiserror::Error;

use estate_auth::{AuthError, PasswordError};
use estate_core::{DomainError, StoreError};

use crate::protocol::Status;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("failed to encode response")]
    Encode(#[source] serde_json::Error),
}

impl HandlerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    pub fn status(&self) -> Status {
        match self {
            HandlerError::Auth(e) => auth_status(e),
            HandlerError::Store(e) => store_status(e),
            HandlerError::Password(_) => Status::Unknown,
            HandlerError::InvalidArguments(_) => Status::InvalidArguments,
            HandlerError::Encode(_) => Status::Unknown,
        }
    }
}

impl From<DomainError> for HandlerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::InvalidArguments(msg),
        }
    }
}

pub fn store_status(err: &StoreError) -> Status {
    match err {
        StoreError::NotFound(_) => Status::NotFound,
        StoreError::AlreadyExists(_) => Status::AlreadyExists,
        StoreError::Backend { .. } => Status::Unknown,
    }
}

pub fn auth_status(err: &AuthError) -> Status {
    match err {
        AuthError::NoSuchUser => Status::NotFound,
        AuthError::WrongPassword => Status::WrongPassword,
        AuthError::NotLoggedIn => Status::NotLoggedIn,
        AuthError::AccessDenied => Status::AccessDenied,
        AuthError::Store(e) => store_status(e),
        AuthError::Password(_) => Status::Unknown,
        AuthError::Token(_) => Status::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::Record;

    #[test]
    fn auth_outcomes_keep_their_own_codes() {
        assert_eq!(HandlerError::from(AuthError::NoSuchUser).status().code(), 2);
        assert_eq!(HandlerError::from(AuthError::WrongPassword).status().code(), 3);
        assert_eq!(HandlerError::from(AuthError::NotLoggedIn).status().code(), 4);
        assert_eq!(HandlerError::from(AuthError::AccessDenied).status().code(), 5);
    }

    #[test]
    fn store_conflicts_and_absence_are_distinct_from_failures() {
        assert_eq!(store_status(&StoreError::AlreadyExists(Record::Group)), Status::AlreadyExists);
        assert_eq!(store_status(&StoreError::NotFound(Record::Task)), Status::NotFound);
        assert_eq!(
            store_status(&StoreError::backend("probe", "connection reset")),
            Status::Unknown
        );
        let wrapped = AuthError::Store(StoreError::backend("probe", "connection reset"));
        assert_eq!(auth_status(&wrapped), Status::Unknown);
    }

    #[test]
    fn domain_validation_is_an_argument_error() {
        let err = HandlerError::from(DomainError::validation("mask out of range"));
        assert_eq!(err.status(), Status::InvalidArguments);
    }
}
