use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use estate_core::query::{Predicate, Searchable};
use estate_core::{
    Entity, Group, GroupId, GroupStore, NewStructure, NewTask, NewUser, Pagination, Record,
    SessionRecord, SessionStore, SortOrder, StoreError, StoreResult, Structure, StructureFilter,
    StructureId, StructurePatch, StructureStore, Task, TaskFilter, TaskId, TaskPatch, TaskStore,
    User, UserId, UserPatch, UserStore,
};

/// Rows keyed by id, with a monotonically increasing serial.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,
    next: i64,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next: 1,
        }
    }
}

impl<E: Entity> Table<E> {
    fn allocate(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }

    fn get(&self, id: E::Id, record: Record) -> StoreResult<&E> {
        self.rows.get(&id).ok_or(StoreError::NotFound(record))
    }

    fn get_mut(&mut self, id: E::Id, record: Record) -> StoreResult<&mut E> {
        self.rows.get_mut(&id).ok_or(StoreError::NotFound(record))
    }

    fn insert(&mut self, row: E) {
        self.rows.insert(row.id(), row);
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<User>,
    groups: Table<Group>,
    structures: Table<Structure>,
    tasks: Table<Task>,
    /// (group, user) pairs; the set is the unique index.
    memberships: BTreeSet<(GroupId, UserId)>,
    sessions: HashMap<String, SessionRecord>,
}

impl Tables {
    fn login_taken(&self, login: &str, except: Option<UserId>) -> bool {
        self.users
            .rows
            .values()
            .any(|u| u.login == login && Some(u.id) != except)
    }

    fn structure_name_taken(&self, name: &str, except: Option<StructureId>) -> bool {
        self.structures
            .rows
            .values()
            .any(|s| s.name == name && Some(s.id) != except)
    }

    fn task_name_taken(&self, object: StructureId, name: &str, except: Option<TaskId>) -> bool {
        self.tasks
            .rows
            .values()
            .any(|t| t.object == object && t.name == name && Some(t.id) != except)
    }

    fn ensure_group(&self, id: GroupId) -> StoreResult<()> {
        self.groups.get(id, Record::Group).map(|_| ())
    }

    fn ensure_task_refs(&self, object: StructureId, maintainer: UserId, gid: GroupId) -> StoreResult<()> {
        self.structures.get(object, Record::Structure)?;
        self.users.get(maintainer, Record::User)?;
        self.ensure_group(gid)
    }
}

/// In-memory store for tests/dev.
///
/// All tables sit behind one lock, so multi-row operations (group removal,
/// patch application) are atomic with respect to concurrent callers.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, operation: &'static str) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))
    }

    fn write(&self, operation: &'static str) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))
    }

    /// Number of live and expired sessions currently held.
    pub fn session_count(&self) -> usize {
        self.inner.read().map(|t| t.sessions.len()).unwrap_or(0)
    }

    /// Number of membership rows across all groups.
    pub fn membership_count(&self) -> usize {
        self.inner.read().map(|t| t.memberships.len()).unwrap_or(0)
    }
}

fn paginate<T: Entity + Clone>(rows: impl Iterator<Item = T>, page: Pagination) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by_key(|r| r.id());
    if page.order == SortOrder::Descending {
        rows.reverse();
    }
    rows.into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

fn matches_all<T: Searchable>(record: &T, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| p.matches(record))
}

#[async_trait::async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let mut t = self.write("create_user")?;
        if t.login_taken(&user.login, None) {
            return Err(StoreError::AlreadyExists(Record::User));
        }
        let id = UserId::new(t.users.allocate());
        t.users.insert(User {
            id,
            login: user.login,
            pass_hash: user.pass_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            patronymic: user.patronymic,
            manages_groups: false,
        });
        Ok(id)
    }

    async fn user_by_id(&self, id: UserId) -> StoreResult<User> {
        let t = self.read("user_by_id")?;
        t.users.get(id, Record::User).cloned()
    }

    async fn user_by_login(&self, login: &str) -> StoreResult<User> {
        let t = self.read("user_by_login")?;
        t.users
            .rows
            .values()
            .find(|u| u.login == login)
            .cloned()
            .ok_or(StoreError::NotFound(Record::User))
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<()> {
        let mut t = self.write("update_user")?;
        if let Some(login) = &patch.login {
            if t.login_taken(login, Some(id)) {
                return Err(StoreError::AlreadyExists(Record::User));
            }
        }
        if let Some(user) = t.users.rows.get_mut(&id) {
            patch.apply_to(user);
        }
        Ok(())
    }

    async fn set_manages_groups(&self, id: UserId, value: bool) -> StoreResult<()> {
        let mut t = self.write("set_manages_groups")?;
        t.users.get_mut(id, Record::User)?.manages_groups = value;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemoryStore {
    async fn insert_session(&self, session: SessionRecord) -> StoreResult<()> {
        let mut t = self.write("insert_session")?;
        if t.sessions.contains_key(&session.token) {
            return Err(StoreError::AlreadyExists(Record::Session));
        }
        t.users.get(session.user_id, Record::User)?;
        t.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> StoreResult<SessionRecord> {
        let t = self.read("session_by_token")?;
        t.sessions
            .get(token)
            .cloned()
            .ok_or(StoreError::NotFound(Record::Session))
    }

    async fn delete_session(&self, token: &str) -> StoreResult<Option<SessionRecord>> {
        let mut t = self.write("delete_session")?;
        Ok(t.sessions.remove(token))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut t = self.write("purge_expired")?;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| s.expires_at > now);
        Ok((before - t.sessions.len()) as u64)
    }
}

#[async_trait::async_trait]
impl GroupStore for InMemoryStore {
    async fn create_group(&self, name: &str) -> StoreResult<Group> {
        let mut t = self.write("create_group")?;
        if t.groups.rows.values().any(|g| g.name == name) {
            return Err(StoreError::AlreadyExists(Record::Group));
        }
        let group = Group {
            id: GroupId::new(t.groups.allocate()),
            name: name.to_string(),
        };
        t.groups.insert(group.clone());
        Ok(group)
    }

    async fn group_by_name(&self, name: &str) -> StoreResult<Group> {
        let t = self.read("group_by_name")?;
        t.groups
            .rows
            .values()
            .find(|g| g.name == name)
            .cloned()
            .ok_or(StoreError::NotFound(Record::Group))
    }

    async fn remove_group(&self, id: GroupId) -> StoreResult<()> {
        let mut t = self.write("remove_group")?;
        if t.groups.rows.remove(&id).is_none() {
            return Err(StoreError::NotFound(Record::Group));
        }
        t.memberships.retain(|(gid, _)| *gid != id);
        Ok(())
    }

    async fn add_member(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        let mut t = self.write("add_member")?;
        t.ensure_group(group)?;
        t.users.get(user, Record::User)?;
        if !t.memberships.insert((group, user)) {
            return Err(StoreError::AlreadyExists(Record::Membership));
        }
        Ok(())
    }

    async fn remove_member(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        let mut t = self.write("remove_member")?;
        if !t.memberships.remove(&(group, user)) {
            return Err(StoreError::NotFound(Record::Membership));
        }
        Ok(())
    }

    async fn groups_of_user(&self, user: UserId) -> StoreResult<Vec<Group>> {
        let t = self.read("groups_of_user")?;
        Ok(t.memberships
            .iter()
            .filter(|(_, uid)| *uid == user)
            .filter_map(|(gid, _)| t.groups.rows.get(gid).cloned())
            .collect())
    }

    async fn members_of_group(&self, group: GroupId) -> StoreResult<Vec<User>> {
        let t = self.read("members_of_group")?;
        Ok(t.memberships
            .iter()
            .filter(|(gid, _)| *gid == group)
            .filter_map(|(_, uid)| t.users.rows.get(uid).cloned())
            .collect())
    }
}

#[async_trait::async_trait]
impl StructureStore for InMemoryStore {
    async fn create_structure(&self, structure: NewStructure) -> StoreResult<StructureId> {
        let mut t = self.write("create_structure")?;
        if t.structure_name_taken(&structure.name, None) {
            return Err(StoreError::AlreadyExists(Record::Structure));
        }
        t.ensure_group(structure.gid)?;
        let id = StructureId::new(t.structures.allocate());
        t.structures.insert(structure.into_structure(id));
        Ok(id)
    }

    async fn structure_by_id(&self, id: StructureId) -> StoreResult<Structure> {
        let t = self.read("structure_by_id")?;
        t.structures.get(id, Record::Structure).cloned()
    }

    async fn update_structure(&self, id: StructureId, patch: StructurePatch) -> StoreResult<()> {
        let mut t = self.write("update_structure")?;
        t.structures.get(id, Record::Structure)?;
        if let Some(name) = &patch.name {
            if t.structure_name_taken(name, Some(id)) {
                return Err(StoreError::AlreadyExists(Record::Structure));
            }
        }
        if let Some(gid) = patch.gid {
            t.ensure_group(gid)?;
        }
        patch.apply_to(t.structures.get_mut(id, Record::Structure)?);
        Ok(())
    }

    async fn remove_structure(&self, id: StructureId) -> StoreResult<()> {
        let mut t = self.write("remove_structure")?;
        t.structures.get(id, Record::Structure)?;
        t.tasks.rows.retain(|_, task| task.object != id);
        t.structures.rows.remove(&id);
        Ok(())
    }

    async fn find_structures(
        &self,
        filter: &StructureFilter,
        page: Pagination,
    ) -> StoreResult<Vec<Structure>> {
        let t = self.read("find_structures")?;
        let predicates = filter.predicates();
        Ok(paginate(
            t.structures
                .rows
                .values()
                .filter(|s| matches_all(*s, &predicates))
                .cloned(),
            page,
        ))
    }
}

#[async_trait::async_trait]
impl TaskStore for InMemoryStore {
    async fn create_task(&self, task: NewTask) -> StoreResult<TaskId> {
        let mut t = self.write("create_task")?;
        t.ensure_task_refs(task.object, task.maintainer, task.gid)?;
        if t.task_name_taken(task.object, &task.name, None) {
            return Err(StoreError::AlreadyExists(Record::Task));
        }
        let id = TaskId::new(t.tasks.allocate());
        t.tasks.insert(task.into_task(id));
        Ok(id)
    }

    async fn task_by_id(&self, id: TaskId) -> StoreResult<Task> {
        let t = self.read("task_by_id")?;
        t.tasks.get(id, Record::Task).cloned()
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> StoreResult<()> {
        let mut t = self.write("update_task")?;
        let mut updated = t.tasks.get(id, Record::Task)?.clone();
        patch.apply_to(&mut updated);
        t.ensure_task_refs(updated.object, updated.maintainer, updated.gid)?;
        if t.task_name_taken(updated.object, &updated.name, Some(id)) {
            return Err(StoreError::AlreadyExists(Record::Task));
        }
        t.tasks.insert(updated);
        Ok(())
    }

    async fn remove_task(&self, id: TaskId) -> StoreResult<()> {
        let mut t = self.write("remove_task")?;
        t.tasks
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(Record::Task))
    }

    async fn find_tasks(&self, filter: &TaskFilter, page: Pagination) -> StoreResult<Vec<Task>> {
        let t = self.read("find_tasks")?;
        let predicates = filter.predicates();
        Ok(paginate(
            t.tasks
                .rows
                .values()
                .filter(|task| matches_all(*task, &predicates))
                .cloned(),
            page,
        ))
    }
}
