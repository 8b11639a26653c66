//! `estate-core`: domain records and the persistence contract.
//!
//! This crate contains **pure domain** types plus the store traits the rest of
//! the backend is written against. Adapters live in `estate-infra`.

pub mod entity;
pub mod error;
pub mod id;
pub mod model;
pub mod query;
pub mod store;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{GroupId, StructureId, TaskId, UserId};
pub use model::{
    Group, NewStructure, NewTask, NewUser, Structure, StructurePatch, Task, TaskPatch, User,
    UserPatch,
};
pub use query::{Pagination, SortOrder, StructureFilter, TaskFilter};
pub use store::{
    GroupStore, Record, SessionRecord, SessionStore, Store, StoreError, StoreResult,
    StructureStore, TaskStore, UserStore,
};
pub use value_object::{PermissionMask, ValueObject};
