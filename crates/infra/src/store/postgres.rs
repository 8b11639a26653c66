//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `AlreadyExists(record)` |
//! | Database (foreign key violation) | `23503` | `NotFound(referenced record)` |
//! | RowNotFound | N/A | `NotFound(record)` |
//! | anything else | any | `Backend` with the sqlx error as source |
//!
//! Search queries are assembled with [`QueryBuilder`]: column names and
//! operators come from the closed `Column`/`Op` enums, every value is bound.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::instrument;

use estate_core::query::{Predicate, Value};
use estate_core::{
    Group, GroupId, GroupStore, NewStructure, NewTask, NewUser, Pagination, PermissionMask,
    Record, SessionRecord, SessionStore, StoreError, StoreResult, Structure, StructureFilter,
    StructureId, StructurePatch, StructureStore, Task, TaskFilter, TaskId, TaskPatch, TaskStore,
    User, UserId, UserPatch, UserStore,
};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const USER_COLUMNS: &str =
    "id, login, pass_hash, first_name, last_name, patronymic, manages_groups";
const STRUCTURE_COLUMNS: &str = "id, name, description, district, region, address, kind, state, \
     area, owner, actual_user, gid, permissions";
const TASK_COLUMNS: &str =
    "id, name, description, deadline, status, object, maintainer, gid, permissions";

/// Postgres store.
///
/// `Send + Sync`; every multi-statement operation runs in a transaction.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| StoreError::backend("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| StoreError::backend("migrate", e))?;
        Ok(())
    }

    async fn begin(&self, operation: &'static str) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| StoreError::backend(operation, e))
    }
}

async fn commit(tx: Transaction<'_, Postgres>, operation: &'static str) -> StoreResult<()> {
    tx.commit()
        .await
        .map_err(|e| StoreError::backend(operation, e))
}

async fn ensure_group(
    tx: &mut Transaction<'_, Postgres>,
    gid: GroupId,
    operation: &'static str,
) -> StoreResult<()> {
    let found = sqlx::query("SELECT 1 FROM user_groups WHERE id = $1")
        .bind(gid.get())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error(operation, Record::Group, e))?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound(Record::Group)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

fn decode<T>(operation: &'static str, r: Result<T, sqlx::Error>) -> StoreResult<T> {
    r.map_err(|e| StoreError::backend(operation, e))
}

fn permissions(row: &PgRow, operation: &'static str) -> StoreResult<PermissionMask> {
    let raw: i16 = decode(operation, row.try_get("permissions"))?;
    PermissionMask::try_from(raw).map_err(|e| StoreError::backend(operation, e))
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    const OP: &str = "decode_user";
    Ok(User {
        id: UserId::new(decode(OP, row.try_get("id"))?),
        login: decode(OP, row.try_get("login"))?,
        pass_hash: decode(OP, row.try_get("pass_hash"))?,
        first_name: decode(OP, row.try_get("first_name"))?,
        last_name: decode(OP, row.try_get("last_name"))?,
        patronymic: decode(OP, row.try_get("patronymic"))?,
        manages_groups: decode(OP, row.try_get("manages_groups"))?,
    })
}

fn group_from_row(row: &PgRow) -> StoreResult<Group> {
    const OP: &str = "decode_group";
    Ok(Group {
        id: GroupId::new(decode(OP, row.try_get("id"))?),
        name: decode(OP, row.try_get("name"))?,
    })
}

fn session_from_row(row: &PgRow) -> StoreResult<SessionRecord> {
    const OP: &str = "decode_session";
    Ok(SessionRecord {
        token: decode(OP, row.try_get("token"))?,
        user_id: UserId::new(decode(OP, row.try_get("user_id"))?),
        created_at: decode(OP, row.try_get("created_at"))?,
        expires_at: decode(OP, row.try_get("expires_at"))?,
    })
}

fn structure_from_row(row: &PgRow) -> StoreResult<Structure> {
    const OP: &str = "decode_structure";
    Ok(Structure {
        id: StructureId::new(decode(OP, row.try_get("id"))?),
        name: decode(OP, row.try_get("name"))?,
        description: decode(OP, row.try_get("description"))?,
        district: decode(OP, row.try_get("district"))?,
        region: decode(OP, row.try_get("region"))?,
        address: decode(OP, row.try_get("address"))?,
        kind: decode(OP, row.try_get("kind"))?,
        state: decode(OP, row.try_get("state"))?,
        area: decode(OP, row.try_get("area"))?,
        owner: decode(OP, row.try_get("owner"))?,
        actual_user: decode(OP, row.try_get("actual_user"))?,
        gid: GroupId::new(decode(OP, row.try_get("gid"))?),
        permissions: permissions(row, OP)?,
    })
}

fn task_from_row(row: &PgRow) -> StoreResult<Task> {
    const OP: &str = "decode_task";
    Ok(Task {
        id: TaskId::new(decode(OP, row.try_get("id"))?),
        name: decode(OP, row.try_get("name"))?,
        description: decode(OP, row.try_get("description"))?,
        deadline: decode(OP, row.try_get("deadline"))?,
        status: decode(OP, row.try_get("status"))?,
        object: StructureId::new(decode(OP, row.try_get("object"))?),
        maintainer: UserId::new(decode(OP, row.try_get("maintainer"))?),
        gid: GroupId::new(decode(OP, row.try_get("gid"))?),
        permissions: permissions(row, OP)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Search
// ─────────────────────────────────────────────────────────────────────────────

/// Append `WHERE`/`AND` clauses for `predicates`, binding every value.
pub(crate) fn push_predicates(qb: &mut QueryBuilder<'_, Postgres>, predicates: &[Predicate]) {
    for (i, p) in predicates.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(p.column.as_sql());
        qb.push(" ");
        qb.push(p.op.as_sql());
        qb.push(" ");
        match &p.value {
            Value::Text(s) => qb.push_bind(s.clone()),
            Value::Int(n) => qb.push_bind(*n),
        };
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Pagination) {
    qb.push(" ORDER BY id ");
    qb.push(page.order.as_sql());
    qb.push(" LIMIT ");
    qb.push_bind(i64::from(page.limit));
    qb.push(" OFFSET ");
    qb.push_bind(i64::from(page.offset));
}

fn search_query<'a>(table: &str, columns: &str, predicates: &[Predicate], page: Pagination) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {columns} FROM {table}"));
    push_predicates(&mut qb, predicates);
    push_page(&mut qb, page);
    qb
}

// ─────────────────────────────────────────────────────────────────────────────
// Store impls
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(login = %user.login), err)]
    async fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (login, pass_hash, first_name, last_name, patronymic)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&user.login)
        .bind(&user.pass_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.patronymic)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", Record::User, e))?;
        Ok(UserId::new(decode("create_user", row.try_get("id"))?))
    }

    #[instrument(skip(self), err)]
    async fn user_by_id(&self, id: UserId) -> StoreResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_id", Record::User, e))?;
        user_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn user_by_login(&self, login: &str) -> StoreResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE login = $1"))
            .bind(login)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_login", Record::User, e))?;
        user_from_row(&row)
    }

    /// One statement per present field, in field order, inside a single
    /// transaction. Any failure rolls back every earlier field.
    #[instrument(skip(self, patch), err)]
    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<()> {
        const OP: &str = "update_user";
        let mut tx = self.begin(OP).await?;

        let fields: [(&str, &Option<String>); 5] = [
            ("login", &patch.login),
            ("pass_hash", &patch.pass_hash),
            ("first_name", &patch.first_name),
            ("last_name", &patch.last_name),
            ("patronymic", &patch.patronymic),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                sqlx::query(&format!("UPDATE users SET {column} = $1 WHERE id = $2"))
                    .bind(value)
                    .bind(id.get())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error(OP, Record::User, e))?;
            }
        }

        commit(tx, OP).await
    }

    #[instrument(skip(self), err)]
    async fn set_manages_groups(&self, id: UserId, value: bool) -> StoreResult<()> {
        let done = sqlx::query("UPDATE users SET manages_groups = $1 WHERE id = $2")
            .bind(value)
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_manages_groups", Record::User, e))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(Record::User));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionStore for PostgresStore {
    #[instrument(skip(self, session), fields(user_id = %session.user_id), err)]
    async fn insert_session(&self, session: SessionRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token)
        .bind(session.user_id.get())
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_session", Record::Session, e))?;
        Ok(())
    }

    #[instrument(skip(self, token), err)]
    async fn session_by_token(&self, token: &str) -> StoreResult<SessionRecord> {
        let row = sqlx::query(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("session_by_token", Record::Session, e))?;
        session_from_row(&row)
    }

    #[instrument(skip(self, token), err)]
    async fn delete_session(&self, token: &str) -> StoreResult<Option<SessionRecord>> {
        let row = sqlx::query(
            "DELETE FROM sessions WHERE token = $1 RETURNING token, user_id, created_at, expires_at",
        )
        .bind(token)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_session", Record::Session, e))?;
        row.as_ref().map(session_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let done = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("purge_expired", Record::Session, e))?;
        Ok(done.rows_affected())
    }
}

#[async_trait::async_trait]
impl GroupStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn create_group(&self, name: &str) -> StoreResult<Group> {
        let row = sqlx::query("INSERT INTO user_groups (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_group", Record::Group, e))?;
        group_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn group_by_name(&self, name: &str) -> StoreResult<Group> {
        let row = sqlx::query("SELECT id, name FROM user_groups WHERE name = $1")
            .bind(name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("group_by_name", Record::Group, e))?;
        group_from_row(&row)
    }

    /// Memberships go first, then the group, in one transaction.
    #[instrument(skip(self), err)]
    async fn remove_group(&self, id: GroupId) -> StoreResult<()> {
        const OP: &str = "remove_group";
        let mut tx = self.begin(OP).await?;

        sqlx::query("DELETE FROM group_members WHERE gid = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(OP, Record::Membership, e))?;
        let done = sqlx::query("DELETE FROM user_groups WHERE id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(OP, Record::Group, e))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(Record::Group));
        }

        commit(tx, OP).await
    }

    #[instrument(skip(self), err)]
    async fn add_member(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        sqlx::query("INSERT INTO group_members (gid, uid) VALUES ($1, $2)")
            .bind(group.get())
            .bind(user.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("add_member", Record::Membership, e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn remove_member(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM group_members WHERE gid = $1 AND uid = $2")
            .bind(group.get())
            .bind(user.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_member", Record::Membership, e))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(Record::Membership));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn groups_of_user(&self, user: UserId) -> StoreResult<Vec<Group>> {
        let rows = sqlx::query(
            r#"
            SELECT g.id, g.name
            FROM user_groups g
            JOIN group_members m ON m.gid = g.id
            WHERE m.uid = $1
            ORDER BY g.id
            "#,
        )
        .bind(user.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("groups_of_user", Record::Group, e))?;
        rows.iter().map(group_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn members_of_group(&self, group: GroupId) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.login, u.pass_hash, u.first_name, u.last_name, u.patronymic, u.manages_groups
            FROM users u
            JOIN group_members m ON m.uid = u.id
            WHERE m.gid = $1
            ORDER BY u.id
            "#,
        )
        .bind(group.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("members_of_group", Record::User, e))?;
        rows.iter().map(user_from_row).collect()
    }
}

#[async_trait::async_trait]
impl StructureStore for PostgresStore {
    #[instrument(skip(self, structure), fields(name = %structure.name), err)]
    async fn create_structure(&self, structure: NewStructure) -> StoreResult<StructureId> {
        const OP: &str = "create_structure";
        let mut tx = self.begin(OP).await?;
        ensure_group(&mut tx, structure.gid, OP).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO structures (
                name, description, district, region, address, kind, state,
                area, owner, actual_user, gid, permissions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(&structure.name)
        .bind(&structure.description)
        .bind(&structure.district)
        .bind(&structure.region)
        .bind(&structure.address)
        .bind(&structure.kind)
        .bind(&structure.state)
        .bind(structure.area)
        .bind(&structure.owner)
        .bind(&structure.actual_user)
        .bind(structure.gid.get())
        .bind(i16::from(structure.permissions))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(OP, Record::Structure, e))?;
        let id = StructureId::new(decode(OP, row.try_get("id"))?);

        commit(tx, OP).await?;
        Ok(id)
    }

    #[instrument(skip(self), err)]
    async fn structure_by_id(&self, id: StructureId) -> StoreResult<Structure> {
        let row = sqlx::query(&format!("SELECT {STRUCTURE_COLUMNS} FROM structures WHERE id = $1"))
            .bind(id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("structure_by_id", Record::Structure, e))?;
        structure_from_row(&row)
    }

    #[instrument(skip(self, patch), err)]
    async fn update_structure(&self, id: StructureId, patch: StructurePatch) -> StoreResult<()> {
        const OP: &str = "update_structure";
        let mut tx = self.begin(OP).await?;
        if let Some(gid) = patch.gid {
            ensure_group(&mut tx, gid, OP).await?;
        }

        let done = sqlx::query(
            r#"
            UPDATE structures SET
                name        = COALESCE($2, name),
                description = COALESCE($3, description),
                district    = COALESCE($4, district),
                region      = COALESCE($5, region),
                address     = COALESCE($6, address),
                kind        = COALESCE($7, kind),
                state       = COALESCE($8, state),
                area        = COALESCE($9, area),
                owner       = COALESCE($10, owner),
                actual_user = COALESCE($11, actual_user),
                gid         = COALESCE($12, gid),
                permissions = COALESCE($13, permissions)
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(&patch.district)
        .bind(&patch.region)
        .bind(&patch.address)
        .bind(&patch.kind)
        .bind(&patch.state)
        .bind(patch.area)
        .bind(&patch.owner)
        .bind(&patch.actual_user)
        .bind(patch.gid.map(GroupId::get))
        .bind(patch.permissions.map(i16::from))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(OP, Record::Structure, e))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(Record::Structure));
        }

        commit(tx, OP).await
    }

    /// Tasks attached to the structure are removed with it (`ON DELETE CASCADE`).
    #[instrument(skip(self), err)]
    async fn remove_structure(&self, id: StructureId) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM structures WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_structure", Record::Structure, e))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(Record::Structure));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn find_structures(
        &self,
        filter: &StructureFilter,
        page: Pagination,
    ) -> StoreResult<Vec<Structure>> {
        let mut qb = search_query("structures", STRUCTURE_COLUMNS, &filter.predicates(), page);
        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_structures", Record::Structure, e))?;
        rows.iter().map(structure_from_row).collect()
    }
}

#[async_trait::async_trait]
impl TaskStore for PostgresStore {
    #[instrument(skip(self, task), fields(name = %task.name, object = %task.object), err)]
    async fn create_task(&self, task: NewTask) -> StoreResult<TaskId> {
        const OP: &str = "create_task";
        let mut tx = self.begin(OP).await?;
        ensure_group(&mut tx, task.gid, OP).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO tasks (
                name, description, deadline, status, object, maintainer, gid, permissions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.deadline)
        .bind(&task.status)
        .bind(task.object.get())
        .bind(task.maintainer.get())
        .bind(task.gid.get())
        .bind(i16::from(task.permissions))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(OP, Record::Task, e))?;
        let id = TaskId::new(decode(OP, row.try_get("id"))?);

        commit(tx, OP).await?;
        Ok(id)
    }

    #[instrument(skip(self), err)]
    async fn task_by_id(&self, id: TaskId) -> StoreResult<Task> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("task_by_id", Record::Task, e))?;
        task_from_row(&row)
    }

    #[instrument(skip(self, patch), err)]
    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> StoreResult<()> {
        const OP: &str = "update_task";
        let mut tx = self.begin(OP).await?;
        if let Some(gid) = patch.gid {
            ensure_group(&mut tx, gid, OP).await?;
        }

        let done = sqlx::query(
            r#"
            UPDATE tasks SET
                name        = COALESCE($2, name),
                description = COALESCE($3, description),
                deadline    = COALESCE($4, deadline),
                status      = COALESCE($5, status),
                object      = COALESCE($6, object),
                maintainer  = COALESCE($7, maintainer),
                gid         = COALESCE($8, gid),
                permissions = COALESCE($9, permissions)
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.deadline)
        .bind(&patch.status)
        .bind(patch.object.map(StructureId::get))
        .bind(patch.maintainer.map(UserId::get))
        .bind(patch.gid.map(GroupId::get))
        .bind(patch.permissions.map(i16::from))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(OP, Record::Task, e))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(Record::Task));
        }

        commit(tx, OP).await
    }

    #[instrument(skip(self), err)]
    async fn remove_task(&self, id: TaskId) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_task", Record::Task, e))?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(Record::Task));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn find_tasks(&self, filter: &TaskFilter, page: Pagination) -> StoreResult<Vec<Task>> {
        let mut qb = search_query("tasks", TASK_COLUMNS, &filter.predicates(), page);
        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tasks", Record::Task, e))?;
        rows.iter().map(task_from_row).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

/// Record a foreign-key constraint points at, by constraint name.
fn referenced_record(constraint: Option<&str>) -> Record {
    match constraint {
        Some("tasks_object_fkey") => Record::Structure,
        Some("group_members_group_fkey") => Record::Group,
        _ => Record::User,
    }
}

/// Map a SQLx error to a `StoreError`.
///
/// `record` is the kind of row the statement reads or writes.
fn map_sqlx_error(operation: &'static str, record: Record, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound(record),
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned());
            match code.as_deref() {
                Some("23505") => StoreError::AlreadyExists(record),
                Some("23503") => StoreError::NotFound(referenced_record(db_err.constraint())),
                _ => StoreError::backend(operation, sqlx::Error::Database(db_err)),
            }
        }
        other => StoreError::backend(operation, other),
    }
}
