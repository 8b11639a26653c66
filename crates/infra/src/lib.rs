//! Infrastructure layer: store adapters, configuration, background workers.

pub mod config;
pub mod store;
pub mod workers;
