//! Request dispatcher.
//!
//! Per request: decode selector, decode and validate arguments, run the
//! handler (which authenticates as its contract requires), encode the reply.
//! The dispatcher keeps no state between requests.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use serde_json::value::RawValue;
use tracing::{debug, error, info};

use crate::app::dto::Args;
use crate::app::errors::HandlerError;
use crate::app::routes::{group, structure, system, task, user};
use crate::app::services::Services;
use crate::protocol::{FunctionId, Request, Response, Status};

#[derive(Debug, Clone)]
pub struct Dispatcher {
    services: Services,
}

impl Dispatcher {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Handle one raw frame. A frame that is not a valid envelope yields 253.
    pub async fn dispatch_frame(&self, frame: &[u8]) -> Response {
        match serde_json::from_slice::<Request>(frame) {
            Ok(request) => self.dispatch(request).await,
            Err(err) => {
                info!(error = %err, code = Status::InvalidArguments.code(), "malformed request envelope");
                Response::status(Status::InvalidArguments)
            }
        }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        let Some(function) = FunctionId::from_selector(request.function) else {
            info!(
                selector = request.function,
                code = Status::NoSuchFunction.code(),
                "no such function"
            );
            return Response::status(Status::NoSuchFunction);
        };

        let raw = request.args.as_deref().map_or("null", RawValue::get);
        match self.run(function, raw).await {
            Ok(data) => {
                debug!(function = %function, code = Status::Success.code(), "request handled");
                Response::success(data)
            }
            Err(err) => {
                let status = err.status();
                if status == Status::Unknown {
                    error!(function = %function, code = status.code(), error = ?err, "request failed");
                } else {
                    info!(function = %function, code = status.code(), error = %err, "request rejected");
                }
                Response::status(status)
            }
        }
    }

    async fn run(&self, function: FunctionId, raw: &str) -> Result<Option<Value>, HandlerError> {
        let s = &self.services;
        match function {
            FunctionId::Ping => call(raw, |a| system::ping(s, a)).await,
            FunctionId::UserCreate => call(raw, |a| user::create(s, a)).await,
            FunctionId::LogIn => call(raw, |a| user::log_in(s, a)).await,
            FunctionId::LogOut => call(raw, |a| user::log_out(s, a)).await,
            FunctionId::UserInfo => call(raw, |a| user::info(s, a)).await,
            FunctionId::UserEdit => call(raw, |a| user::edit(s, a)).await,
            FunctionId::UserSetManagesGroups => call(raw, |a| user::set_manages_groups(s, a)).await,
            FunctionId::UserListGroups => call(raw, |a| user::list_groups(s, a)).await,
            FunctionId::GroupCreate => call(raw, |a| group::create(s, a)).await,
            FunctionId::GroupRemove => call(raw, |a| group::remove(s, a)).await,
            FunctionId::GroupAddRemoveUser => call(raw, |a| group::add_remove_user(s, a)).await,
            FunctionId::GroupInfo => call(raw, |a| group::info(s, a)).await,
            FunctionId::StructCreate => call(raw, |a| structure::create(s, a)).await,
            FunctionId::StructInfo => call(raw, |a| structure::info(s, a)).await,
            FunctionId::StructEdit => call(raw, |a| structure::edit(s, a)).await,
            FunctionId::StructRemove => call(raw, |a| structure::remove(s, a)).await,
            FunctionId::StructFind => call(raw, |a| structure::find(s, a)).await,
            FunctionId::TaskCreate => call(raw, |a| task::create(s, a)).await,
            FunctionId::TaskInfo => call(raw, |a| task::info(s, a)).await,
            FunctionId::TaskEdit => call(raw, |a| task::edit(s, a)).await,
            FunctionId::TaskRemove => call(raw, |a| task::remove(s, a)).await,
            FunctionId::TaskFind => call(raw, |a| task::find(s, a)).await,
        }
    }
}

/// Decode → validate → run → encode. `()` replies carry no data.
async fn call<A, R, F, Fut>(raw: &str, handler: F) -> Result<Option<Value>, HandlerError>
where
    A: Args,
    R: Serialize,
    F: FnOnce(A) -> Fut,
    Fut: Future<Output = Result<R, HandlerError>>,
{
    let args: A = serde_json::from_str(raw).map_err(|e| HandlerError::invalid(e.to_string()))?;
    args.validate()?;
    let reply = handler(args).await?;
    let data = serde_json::to_value(reply).map_err(HandlerError::Encode)?;
    Ok((!data.is_null()).then_some(data))
}
