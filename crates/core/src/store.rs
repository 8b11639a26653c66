//! Persistence contract.
//!
//! The session layer, the authorization guard and every handler are written
//! against these traits only. Adapters (in-memory, Postgres) live in
//! `estate-infra` and are injected at construction time.
//!
//! Implementations must be safe for concurrent use without external locking:
//! the store is the only long-lived shared resource of the backend.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::id::{GroupId, StructureId, TaskId, UserId};
use crate::model::{
    Group, NewStructure, NewTask, NewUser, Structure, StructurePatch, Task, TaskPatch, User,
    UserPatch,
};
use crate::query::{StructureFilter, TaskFilter, Pagination};

/// Result type returned by store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Kind of record a store error refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Record {
    User,
    Session,
    Group,
    Membership,
    Structure,
    Task,
}

impl core::fmt::Display for Record {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Record::User => "user",
            Record::Session => "session",
            Record::Group => "group",
            Record::Membership => "membership",
            Record::Structure => "structure",
            Record::Task => "task",
        })
    }
}

/// Store operation error.
///
/// `NotFound` and `AlreadyExists` are the only conditions callers are expected
/// to branch on. Everything else is a `Backend` failure whose source is kept
/// for server-side diagnostics.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(Record),

    #[error("{0} already exists")]
    AlreadyExists(Record),

    #[error("store backend failure during {operation}")]
    Backend {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl StoreError {
    pub fn backend(
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self::Backend {
            operation,
            source: source.into(),
        }
    }
}

/// A persisted session row.
///
/// Sessions are immutable: they are inserted once and later deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; a duplicate login yields `AlreadyExists(User)`.
    async fn create_user(&self, user: NewUser) -> StoreResult<UserId>;

    async fn user_by_id(&self, id: UserId) -> StoreResult<User>;

    async fn user_by_login(&self, login: &str) -> StoreResult<User>;

    /// Apply a patch to the user's own record.
    ///
    /// A login collision yields `AlreadyExists(User)` and leaves the record
    /// untouched. Zero rows affected is not an error.
    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<()>;

    async fn set_manages_groups(&self, id: UserId, value: bool) -> StoreResult<()>;
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a freshly issued session; a token collision yields `AlreadyExists(Session)`.
    async fn insert_session(&self, session: SessionRecord) -> StoreResult<()>;

    async fn session_by_token(&self, token: &str) -> StoreResult<SessionRecord>;

    /// Delete the session and return the removed row, if there was one.
    async fn delete_session(&self, token: &str) -> StoreResult<Option<SessionRecord>>;

    /// Delete every session that expired at or before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait::async_trait]
pub trait GroupStore: Send + Sync {
    async fn create_group(&self, name: &str) -> StoreResult<Group>;

    async fn group_by_name(&self, name: &str) -> StoreResult<Group>;

    /// Remove the group and all of its memberships atomically.
    async fn remove_group(&self, id: GroupId) -> StoreResult<()>;

    async fn add_member(&self, group: GroupId, user: UserId) -> StoreResult<()>;

    async fn remove_member(&self, group: GroupId, user: UserId) -> StoreResult<()>;

    async fn groups_of_user(&self, user: UserId) -> StoreResult<Vec<Group>>;

    async fn members_of_group(&self, group: GroupId) -> StoreResult<Vec<User>>;
}

#[async_trait::async_trait]
pub trait StructureStore: Send + Sync {
    async fn create_structure(&self, structure: NewStructure) -> StoreResult<StructureId>;

    async fn structure_by_id(&self, id: StructureId) -> StoreResult<Structure>;

    async fn update_structure(&self, id: StructureId, patch: StructurePatch) -> StoreResult<()>;

    async fn remove_structure(&self, id: StructureId) -> StoreResult<()>;

    async fn find_structures(
        &self,
        filter: &StructureFilter,
        page: Pagination,
    ) -> StoreResult<Vec<Structure>>;
}

#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: NewTask) -> StoreResult<TaskId>;

    async fn task_by_id(&self, id: TaskId) -> StoreResult<Task>;

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> StoreResult<()>;

    async fn remove_task(&self, id: TaskId) -> StoreResult<()>;

    async fn find_tasks(&self, filter: &TaskFilter, page: Pagination) -> StoreResult<Vec<Task>>;
}

/// The full persistence surface. Blanket-implemented for any type providing
/// every record store, so `Arc<dyn Store>` can be injected everywhere.
pub trait Store: UserStore + SessionStore + GroupStore + StructureStore + TaskStore {}

impl<T> Store for T where T: UserStore + SessionStore + GroupStore + StructureStore + TaskStore {}
