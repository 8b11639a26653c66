//! A session that outlives its user row: the capability gate answers
//! "not found" (2), never "not logged in" (4).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use estate_api::app::dispatch::Dispatcher;
use estate_api::app::services::Services;
use estate_auth::{HashCost, ManualClock, PasswordHasher};
use estate_core::{
    Group, GroupId, GroupStore, NewStructure, NewTask, NewUser, Pagination, Record,
    SessionRecord, SessionStore, Structure, StructureFilter, StructureId, StructurePatch,
    StructureStore, StoreError, StoreResult, Task, TaskFilter, TaskId, TaskPatch, TaskStore,
    User, UserId, UserPatch, UserStore,
};
use estate_infra::store::InMemoryStore;

/// Delegates to the in-memory store, except that users can no longer be
/// loaded by id.
struct VanishedUsers {
    inner: InMemoryStore,
}

#[async_trait]
impl UserStore for VanishedUsers {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        self.inner.create_user(user).await
    }

    async fn user_by_id(&self, _id: UserId) -> StoreResult<User> {
        Err(StoreError::NotFound(Record::User))
    }

    async fn user_by_login(&self, login: &str) -> StoreResult<User> {
        self.inner.user_by_login(login).await
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<()> {
        self.inner.update_user(id, patch).await
    }

    async fn set_manages_groups(&self, id: UserId, value: bool) -> StoreResult<()> {
        self.inner.set_manages_groups(id, value).await
    }
}

#[async_trait]
impl SessionStore for VanishedUsers {
    async fn insert_session(&self, session: SessionRecord) -> StoreResult<()> {
        self.inner.insert_session(session).await
    }

    async fn session_by_token(&self, token: &str) -> StoreResult<SessionRecord> {
        self.inner.session_by_token(token).await
    }

    async fn delete_session(&self, token: &str) -> StoreResult<Option<SessionRecord>> {
        self.inner.delete_session(token).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.inner.purge_expired(now).await
    }
}

#[async_trait]
impl GroupStore for VanishedUsers {
    async fn create_group(&self, name: &str) -> StoreResult<Group> {
        self.inner.create_group(name).await
    }

    async fn group_by_name(&self, name: &str) -> StoreResult<Group> {
        self.inner.group_by_name(name).await
    }

    async fn remove_group(&self, id: GroupId) -> StoreResult<()> {
        self.inner.remove_group(id).await
    }

    async fn add_member(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        self.inner.add_member(group, user).await
    }

    async fn remove_member(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        self.inner.remove_member(group, user).await
    }

    async fn groups_of_user(&self, user: UserId) -> StoreResult<Vec<Group>> {
        self.inner.groups_of_user(user).await
    }

    async fn members_of_group(&self, group: GroupId) -> StoreResult<Vec<User>> {
        self.inner.members_of_group(group).await
    }
}

#[async_trait]
impl StructureStore for VanishedUsers {
    async fn create_structure(&self, structure: NewStructure) -> StoreResult<StructureId> {
        self.inner.create_structure(structure).await
    }

    async fn structure_by_id(&self, id: StructureId) -> StoreResult<Structure> {
        self.inner.structure_by_id(id).await
    }

    async fn update_structure(&self, id: StructureId, patch: StructurePatch) -> StoreResult<()> {
        self.inner.update_structure(id, patch).await
    }

    async fn remove_structure(&self, id: StructureId) -> StoreResult<()> {
        self.inner.remove_structure(id).await
    }

    async fn find_structures(
        &self,
        filter: &StructureFilter,
        page: Pagination,
    ) -> StoreResult<Vec<Structure>> {
        self.inner.find_structures(filter, page).await
    }
}

#[async_trait]
impl TaskStore for VanishedUsers {
    async fn create_task(&self, task: NewTask) -> StoreResult<TaskId> {
        self.inner.create_task(task).await
    }

    async fn task_by_id(&self, id: TaskId) -> StoreResult<Task> {
        self.inner.task_by_id(id).await
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> StoreResult<()> {
        self.inner.update_task(id, patch).await
    }

    async fn remove_task(&self, id: TaskId) -> StoreResult<()> {
        self.inner.remove_task(id).await
    }

    async fn find_tasks(&self, filter: &TaskFilter, page: Pagination) -> StoreResult<Vec<Task>> {
        self.inner.find_tasks(filter, page).await
    }
}

#[tokio::test]
async fn capability_gate_maps_a_vanished_user_to_not_found() {
    let store = Arc::new(VanishedUsers { inner: InMemoryStore::new() });
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()));
    let services = Services::new(store.clone(), PasswordHasher::new(HashCost::Fast).unwrap(), clock);
    let dispatcher = &Dispatcher::new(services);

    let call = move |function: u64, args: serde_json::Value| {
        let frame = json!({ "function": function, "args": args }).to_string();
        async move { dispatcher.dispatch_frame(frame.as_bytes()).await }
    };

    let created = call(
        1,
        json!({ "login": "ghost", "password": "pw", "first_name": "G", "last_name": "H" }),
    )
    .await;
    assert_eq!(created.code, 0);
    let ghost = store.user_by_login("ghost").await.unwrap();
    store.set_manages_groups(ghost.id, true).await.unwrap();

    let login = call(2, json!({ "login": "ghost", "password": "pw" })).await;
    let token = login.data.unwrap()["token"].as_str().unwrap().to_string();

    // The session itself is still live.
    let info = call(4, json!({ "token": token, "login": "ghost" })).await;
    assert_eq!(info.code, 0);

    let res = call(8, json!({ "token": token, "name": "ops" })).await;
    assert_eq!(res.code, 2);
    assert!(res.data.is_none());
    assert!(store.group_by_name("ops").await.is_err());
}
