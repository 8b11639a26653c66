//! Errors raised while constructing domain values from untrusted input.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A value was rejected before it reached the store.
///
/// Persistence outcomes (missing rows, conflicts, backend failures) are
/// [`crate::StoreError`], never this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Out-of-range or malformed field, e.g. a permission mask above 63.
    #[error("rejected value: {0}")]
    Validation(String),

    /// A record id that does not parse.
    #[error("bad record id: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
