use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use estate_core::{SessionRecord, UserId};

use crate::token::SessionToken;

/// Absolute session lifetime. Not sliding: the expiry is fixed at issuance.
pub fn session_lifetime() -> Duration {
    Duration::days(2)
}

/// A live login: capability token bound to exactly one user.
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn issue(token: SessionToken, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            token,
            user_id,
            created_at: now,
            expires_at: now + session_lifetime(),
        }
    }

    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            token: self.token.as_str().to_string(),
            user_id: self.user_id,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    pub fn from_record(token: SessionToken, record: SessionRecord) -> Self {
        Self {
            token,
            user_id: record.user_id,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionValidationError {
    #[error("session has expired")]
    Expired,

    #[error("invalid session time window (expires_at <= created_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate a stored session's time window at `now`.
pub fn validate_session(record: &SessionRecord, now: DateTime<Utc>) -> Result<(), SessionValidationError> {
    if record.expires_at <= record.created_at {
        return Err(SessionValidationError::InvalidTimeWindow);
    }
    if now >= record.expires_at {
        return Err(SessionValidationError::Expired);
    }
    Ok(())
}
