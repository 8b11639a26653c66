//! `estate-auth`: session lifecycle and the group-management guard.
//!
//! This crate is decoupled from transport; storage is reached only through
//! the `estate-core` store traits injected at construction.

pub mod authorize;
pub mod clock;
pub mod error;
pub mod manager;
pub mod password;
pub mod session;
pub mod token;

pub use authorize::{AuthorizationGuard, authorize_manages_groups};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AuthError;
pub use manager::SessionManager;
pub use password::{HashCost, PasswordError, PasswordHasher};
pub use session::{Session, SessionValidationError, session_lifetime, validate_session};
pub use token::{SessionToken, TOKEN_ALPHABET, TOKEN_LENGTH, TokenError};
