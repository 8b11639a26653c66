//! Application wiring.
//!
//! - `services.rs`: shared handler dependencies (store, sessions, guard)
//! - `dispatch.rs`: selector → handler table and the per-request state machine
//! - `routes/`: handlers, one file per domain area, plus the HTTP endpoints
//! - `dto.rs`: argument and reply shapes
//! - `errors.rs`: handler errors and their status codes

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};
use tower::ServiceBuilder;

pub mod dispatch;
pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use dispatch::Dispatcher;

/// Build the HTTP router: `GET /health` and `POST /rpc`.
pub fn build_app(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/rpc", post(routes::system::rpc))
        .layer(ServiceBuilder::new().layer(Extension(dispatcher)))
}
