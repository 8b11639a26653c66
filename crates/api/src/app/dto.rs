//! Argument and reply shapes for every function.
//!
//! All argument structs reject unknown fields. Optional fields are explicit
//! `Option`s: absent means "leave unchanged" on edits.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use estate_core::{
    GroupId, NewStructure, NewTask, Pagination, PermissionMask, Structure, StructureFilter,
    StructureId, StructurePatch, Task, TaskFilter, TaskId, TaskPatch, UserId,
};

use crate::app::errors::HandlerError;

/// Decoded arguments of one function.
///
/// `validate` runs right after decoding, before authentication or any store
/// access, and covers what the type system cannot (e.g. empty names).
pub trait Args: DeserializeOwned + Send {
    fn validate(&self) -> Result<(), HandlerError> {
        Ok(())
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), HandlerError> {
    if value.is_empty() {
        return Err(HandlerError::invalid(format!("`{field}` must not be empty")));
    }
    Ok(())
}

fn non_empty_opt(field: &str, value: Option<&String>) -> Result<(), HandlerError> {
    value.map_or(Ok(()), |v| non_empty(field, v))
}

// -------------------------
// System
// -------------------------

/// Ping accepts absent args, `null` or `{}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Empty {}

impl Args for Option<Empty> {}

// -------------------------
// Users and sessions
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCreateArgs {
    pub login: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub patronymic: Option<String>,
}

impl Args for UserCreateArgs {
    fn validate(&self) -> Result<(), HandlerError> {
        non_empty("login", &self.login)?;
        non_empty("password", &self.password)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogInArgs {
    pub login: String,
    pub password: String,
}

impl Args for LogInArgs {}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogInReply {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenArgs {
    pub token: String,
}

impl Args for TokenArgs {}

/// A token plus the login of the user the call is about.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserLookupArgs {
    pub token: String,
    pub login: String,
}

impl Args for UserLookupArgs {}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfoReply {
    pub login: String,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: Option<String>,
    pub manages_groups: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserEditArgs {
    pub token: String,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub patronymic: Option<String>,
}

impl Args for UserEditArgs {
    fn validate(&self) -> Result<(), HandlerError> {
        non_empty_opt("login", self.login.as_ref())?;
        non_empty_opt("password", self.password.as_ref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserSetManagesGroupsArgs {
    pub token: String,
    pub login: String,
    pub value: bool,
}

impl Args for UserSetManagesGroupsArgs {}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupListReply {
    pub groups: Vec<String>,
    pub count: usize,
}

// -------------------------
// Groups
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupNameArgs {
    pub token: String,
    pub name: String,
}

impl Args for GroupNameArgs {
    fn validate(&self) -> Result<(), HandlerError> {
        non_empty("name", &self.name)
    }
}

/// `action`: `true` adds the user, `false` removes them.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupMembershipArgs {
    pub token: String,
    pub group: String,
    pub login: String,
    pub action: bool,
}

impl Args for GroupMembershipArgs {}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupInfoReply {
    pub id: GroupId,
    pub name: String,
    pub members: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdReply {
    pub id: i64,
}

// -------------------------
// Structures
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdArgs {
    pub token: String,
    pub id: i64,
}

impl Args for IdArgs {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructCreateArgs {
    pub token: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub district: String,
    pub region: String,
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: String,
    pub area: i32,
    pub owner: String,
    pub actual_user: String,
    pub gid: GroupId,
    pub permissions: PermissionMask,
}

impl Args for StructCreateArgs {
    fn validate(&self) -> Result<(), HandlerError> {
        non_empty("name", &self.name)
    }
}

impl StructCreateArgs {
    pub fn into_new(self) -> NewStructure {
        NewStructure {
            name: self.name,
            description: self.description,
            district: self.district,
            region: self.region,
            address: self.address,
            kind: self.kind,
            state: self.state,
            area: self.area,
            owner: self.owner,
            actual_user: self.actual_user,
            gid: self.gid,
            permissions: self.permissions,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructEditArgs {
    pub token: String,
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub area: Option<i32>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub actual_user: Option<String>,
    #[serde(default)]
    pub gid: Option<GroupId>,
    #[serde(default)]
    pub permissions: Option<PermissionMask>,
}

impl Args for StructEditArgs {
    fn validate(&self) -> Result<(), HandlerError> {
        non_empty_opt("name", self.name.as_ref())
    }
}

impl StructEditArgs {
    pub fn split(self) -> (String, StructureId, StructurePatch) {
        let patch = StructurePatch {
            name: self.name,
            description: self.description,
            district: self.district,
            region: self.region,
            address: self.address,
            kind: self.kind,
            state: self.state,
            area: self.area,
            owner: self.owner,
            actual_user: self.actual_user,
            gid: self.gid,
            permissions: self.permissions,
        };
        (self.token, StructureId::new(self.id), patch)
    }
}

/// Search criteria; absent fields do not constrain the result.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructFindArgs {
    pub token: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub area_from: Option<i32>,
    #[serde(default)]
    pub area_to: Option<i32>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub actual_user: Option<String>,
    #[serde(default)]
    pub gid: Option<GroupId>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub sort_asc: Option<bool>,
}

impl Args for StructFindArgs {}

impl StructFindArgs {
    pub fn split(self) -> (String, StructureFilter, Pagination) {
        let page = Pagination::new(self.limit, self.offset, self.sort_asc);
        let filter = StructureFilter {
            name: self.name,
            description: self.description,
            district: self.district,
            region: self.region,
            address: self.address,
            kind: self.kind,
            state: self.state,
            area_from: self.area_from,
            area_to: self.area_to,
            owner: self.owner,
            actual_user: self.actual_user,
            gid: self.gid,
        };
        (self.token, filter, page)
    }
}

/// Structure as sent on the wire (`kind` travels as `type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureReply {
    pub id: StructureId,
    pub name: String,
    pub description: String,
    pub district: String,
    pub region: String,
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: String,
    pub area: i32,
    pub owner: String,
    pub actual_user: String,
    pub gid: GroupId,
    pub permissions: PermissionMask,
}

impl From<Structure> for StructureReply {
    fn from(s: Structure) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description,
            district: s.district,
            region: s.region,
            address: s.address,
            kind: s.kind,
            state: s.state,
            area: s.area,
            owner: s.owner,
            actual_user: s.actual_user,
            gid: s.gid,
            permissions: s.permissions,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StructFindReply {
    pub structures: Vec<StructureReply>,
    pub count: usize,
}

// -------------------------
// Tasks
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskCreateArgs {
    pub token: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub deadline: i64,
    pub status: String,
    pub object: StructureId,
    pub maintainer: UserId,
    pub gid: GroupId,
    pub permissions: PermissionMask,
}

impl Args for TaskCreateArgs {
    fn validate(&self) -> Result<(), HandlerError> {
        non_empty("name", &self.name)
    }
}

impl TaskCreateArgs {
    pub fn into_new(self) -> NewTask {
        NewTask {
            name: self.name,
            description: self.description,
            deadline: self.deadline,
            status: self.status,
            object: self.object,
            maintainer: self.maintainer,
            gid: self.gid,
            permissions: self.permissions,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEditArgs {
    pub token: String,
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub object: Option<StructureId>,
    #[serde(default)]
    pub maintainer: Option<UserId>,
    #[serde(default)]
    pub gid: Option<GroupId>,
    #[serde(default)]
    pub permissions: Option<PermissionMask>,
}

impl Args for TaskEditArgs {
    fn validate(&self) -> Result<(), HandlerError> {
        non_empty_opt("name", self.name.as_ref())
    }
}

impl TaskEditArgs {
    pub fn split(self) -> (String, TaskId, TaskPatch) {
        let patch = TaskPatch {
            name: self.name,
            description: self.description,
            deadline: self.deadline,
            status: self.status,
            object: self.object,
            maintainer: self.maintainer,
            gid: self.gid,
            permissions: self.permissions,
        };
        (self.token, TaskId::new(self.id), patch)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFindArgs {
    pub token: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub object: Option<StructureId>,
    #[serde(default)]
    pub maintainer: Option<UserId>,
    #[serde(default)]
    pub gid: Option<GroupId>,
    #[serde(default)]
    pub deadline_from: Option<i64>,
    #[serde(default)]
    pub deadline_to: Option<i64>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub sort_asc: Option<bool>,
}

impl Args for TaskFindArgs {}

impl TaskFindArgs {
    pub fn split(self) -> (String, TaskFilter, Pagination) {
        let page = Pagination::new(self.limit, self.offset, self.sort_asc);
        let filter = TaskFilter {
            name: self.name,
            status: self.status,
            object: self.object,
            maintainer: self.maintainer,
            gid: self.gid,
            deadline_from: self.deadline_from,
            deadline_to: self.deadline_to,
        };
        (self.token, filter, page)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskFindReply {
    pub tasks: Vec<Task>,
    pub count: usize,
}
