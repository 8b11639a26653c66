//! API-side session and capability checks.
//!
//! Handlers never inspect the `manages_groups` flag themselves: they call
//! [`require_manages_groups`] once, before any store mutation, or
//! [`acting_user`] when only a live session is needed.

use estate_core::UserId;

use crate::app::errors::HandlerError;
use crate::app::services::Services;

/// Resolve the acting user from a session token.
pub async fn acting_user(services: &Services, token: &str) -> Result<UserId, HandlerError> {
    let session = services.sessions.verify_session(token).await?;
    Ok(session.user_id)
}

/// Gate for group-mutating and capability-granting handlers.
pub async fn require_manages_groups(services: &Services, token: &str) -> Result<(), HandlerError> {
    services.guard.require_manages_groups(token).await?;
    Ok(())
}
