//! Handlers, one file per domain area.
//!
//! Each handler takes the shared [`Services`](crate::app::services::Services)
//! and its already-decoded arguments, and returns a typed reply.

pub mod group;
pub mod structure;
pub mod system;
pub mod task;
pub mod user;
