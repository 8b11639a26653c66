//! Persisted records and the write-side shapes used to create or patch them.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::id::{GroupId, StructureId, TaskId, UserId};
use crate::value_object::PermissionMask;

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// A user account as stored.
///
/// `pass_hash` is a PHC-formatted password hash; the plaintext is never kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub login: String,
    pub pass_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: Option<String>,
    pub manages_groups: bool,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Registration payload. New users never manage groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login: String,
    pub pass_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: Option<String>,
}

/// Independent conditional updates of a user's own record.
///
/// Fields are applied in declaration order: login, pass_hash, first_name,
/// last_name, patronymic. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub login: Option<String>,
    pub pass_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub patronymic: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.login.is_none()
            && self.pass_hash.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.patronymic.is_none()
    }

    /// Apply the patch to an in-memory copy, in field order.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(login) = &self.login {
            user.login = login.clone();
        }
        if let Some(hash) = &self.pass_hash {
            user.pass_hash = hash.clone();
        }
        if let Some(name) = &self.first_name {
            user.first_name = name.clone();
        }
        if let Some(name) = &self.last_name {
            user.last_name = name.clone();
        }
        if let Some(name) = &self.patronymic {
            user.patronymic = Some(name.clone());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Groups
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Entity for Group {
    type Id = GroupId;

    fn id(&self) -> GroupId {
        self.id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Structures
// ─────────────────────────────────────────────────────────────────────────────

/// A physical object under management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    pub name: String,
    pub description: String,
    pub district: String,
    pub region: String,
    pub address: String,
    pub kind: String,
    pub state: String,
    pub area: i32,
    pub owner: String,
    pub actual_user: String,
    pub gid: GroupId,
    pub permissions: PermissionMask,
}

impl Entity for Structure {
    type Id = StructureId;

    fn id(&self) -> StructureId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStructure {
    pub name: String,
    pub description: String,
    pub district: String,
    pub region: String,
    pub address: String,
    pub kind: String,
    pub state: String,
    pub area: i32,
    pub owner: String,
    pub actual_user: String,
    pub gid: GroupId,
    pub permissions: PermissionMask,
}

impl NewStructure {
    pub fn into_structure(self, id: StructureId) -> Structure {
        Structure {
            id,
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

/// Conditional updates of a structure, applied in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructurePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub district: Option<String>,
    pub region: Option<String>,
    pub address: Option<String>,
    pub kind: Option<String>,
    pub state: Option<String>,
    pub area: Option<i32>,
    pub owner: Option<String>,
    pub actual_user: Option<String>,
    pub gid: Option<GroupId>,
    pub permissions: Option<PermissionMask>,
}

impl StructurePatch {
    pub fn apply_to(&self, s: &mut Structure) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(v) = &self.$field { s.$field = v.clone(); })*
            };
        }
        set!(
            name, description, district, region, address, kind, state, area, owner, actual_user,
            gid, permissions
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

/// A maintenance task attached to a structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    /// Unix seconds.
    pub deadline: i64,
    pub status: String,
    pub object: StructureId,
    pub maintainer: UserId,
    pub gid: GroupId,
    pub permissions: PermissionMask,
}

impl Entity for Task {
    type Id = TaskId;

    fn id(&self) -> TaskId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub description: String,
    pub deadline: i64,
    pub status: String,
    pub object: StructureId,
    pub maintainer: UserId,
    pub gid: GroupId,
    pub permissions: PermissionMask,
}

impl NewTask {
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
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

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<i64>,
    pub status: Option<String>,
    pub object: Option<StructureId>,
    pub maintainer: Option<UserId>,
    pub gid: Option<GroupId>,
    pub permissions: Option<PermissionMask>,
}

impl TaskPatch {
    pub fn apply_to(&self, t: &mut Task) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(v) = &self.$field { t.$field = v.clone(); })*
            };
        }
        set!(name, description, deadline, status, object, maintainer, gid, permissions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: UserId::new(1),
            login: "alice".into(),
            pass_hash: "$argon2id$stub".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            patronymic: None,
            manages_groups: false,
        }
    }

    #[test]
    fn user_patch_touches_only_present_fields() {
        let mut u = user();
        let patch = UserPatch {
            last_name: Some("Hargreaves".into()),
            patronymic: Some("Pleasance".into()),
            ..Default::default()
        };
        patch.apply_to(&mut u);
        assert_eq!(u.login, "alice");
        assert_eq!(u.first_name, "Alice");
        assert_eq!(u.last_name, "Hargreaves");
        assert_eq!(u.patronymic.as_deref(), Some("Pleasance"));
        assert!(!u.manages_groups);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(UserPatch::default().is_empty());
        assert!(!UserPatch { login: Some("x".into()), ..Default::default() }.is_empty());
    }

    #[test]
    fn structure_patch_keeps_unset_fields() {
        let mut s = NewStructure {
            name: "Boiler house".into(),
            description: String::new(),
            district: "North".into(),
            region: "R1".into(),
            address: "1 Main St".into(),
            kind: "utility".into(),
            state: "ok".into(),
            area: 120,
            owner: "city".into(),
            actual_user: "ops".into(),
            gid: GroupId::new(3),
            permissions: PermissionMask::new(7).unwrap(),
        }
        .into_structure(StructureId::new(9));

        StructurePatch { area: Some(150), state: Some("repair".into()), ..Default::default() }
            .apply_to(&mut s);

        assert_eq!(s.area, 150);
        assert_eq!(s.state, "repair");
        assert_eq!(s.name, "Boiler house");
        assert_eq!(s.permissions.bits(), 7);
    }
}
