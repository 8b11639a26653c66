//! Framed socket transport.
//!
//! One JSON request per newline-terminated line, one response line per
//! request, any number of requests per connection. Each connection runs on
//! its own task.

mod errors;
mod frame;
mod listener;

pub use errors::{FrameError, ListenerError};
pub use frame::{read_frame, serve_connection};
pub use listener::{Endpoint, SocketListener};

pub(crate) const TRANSPORT_TARGET: &str = "estate::transport";
