//! Request surface: wire protocol, dispatcher, socket and HTTP transports.

pub mod app;
pub mod authz;
pub mod protocol;
pub mod server;
pub mod transport;
