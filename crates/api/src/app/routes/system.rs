use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;

use crate::app::dispatch::Dispatcher;
use crate::app::dto::Empty;
use crate::app::errors::HandlerError;
use crate::app::services::Services;
use crate::protocol::Response;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// POST /rpc: one envelope per body, same codes as the socket transport.
pub async fn rpc(Extension(dispatcher): Extension<Arc<Dispatcher>>, body: Bytes) -> Json<Response> {
    Json(dispatcher.dispatch_frame(&body).await)
}

/// Function 0. Succeeds without touching the store.
pub async fn ping(_services: &Services, _args: Option<Empty>) -> Result<(), HandlerError> {
    Ok(())
}
