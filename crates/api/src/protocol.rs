//! Wire envelope, status codes and the function table.
//!
//! Request: `{"function": <id>, "args": <json, optional>}`.
//! Response: `{"code": <u8>}` or `{"code": 0, "data": <json>}`.
//!
//! Status codes and function ids are part of the external contract and must
//! not be renumbered.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

/// Response status code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Success = 0,
    AlreadyExists = 1,
    NotFound = 2,
    WrongPassword = 3,
    NotLoggedIn = 4,
    AccessDenied = 5,
    InvalidArguments = 253,
    NoSuchFunction = 254,
    Unknown = 255,
}

impl Status {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Every callable function, keyed by its stable wire id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FunctionId {
    Ping = 0,
    UserCreate = 1,
    LogIn = 2,
    LogOut = 3,
    UserInfo = 4,
    UserEdit = 5,
    UserSetManagesGroups = 6,
    UserListGroups = 7,
    GroupCreate = 8,
    GroupRemove = 9,
    GroupAddRemoveUser = 10,
    GroupInfo = 11,
    StructCreate = 12,
    StructInfo = 13,
    StructEdit = 14,
    StructRemove = 15,
    StructFind = 16,
    TaskCreate = 17,
    TaskInfo = 18,
    TaskEdit = 19,
    TaskRemove = 20,
    TaskFind = 21,
}

impl FunctionId {
    /// The fixed table, indexed by wire id.
    pub const ALL: [FunctionId; 22] = [
        FunctionId::Ping,
        FunctionId::UserCreate,
        FunctionId::LogIn,
        FunctionId::LogOut,
        FunctionId::UserInfo,
        FunctionId::UserEdit,
        FunctionId::UserSetManagesGroups,
        FunctionId::UserListGroups,
        FunctionId::GroupCreate,
        FunctionId::GroupRemove,
        FunctionId::GroupAddRemoveUser,
        FunctionId::GroupInfo,
        FunctionId::StructCreate,
        FunctionId::StructInfo,
        FunctionId::StructEdit,
        FunctionId::StructRemove,
        FunctionId::StructFind,
        FunctionId::TaskCreate,
        FunctionId::TaskInfo,
        FunctionId::TaskEdit,
        FunctionId::TaskRemove,
        FunctionId::TaskFind,
    ];

    pub fn from_selector(selector: u64) -> Option<Self> {
        usize::try_from(selector)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub const fn selector(self) -> u64 {
        self as u64
    }

    pub const fn name(self) -> &'static str {
        match self {
            FunctionId::Ping => "Ping",
            FunctionId::UserCreate => "UserCreate",
            FunctionId::LogIn => "LogIn",
            FunctionId::LogOut => "LogOut",
            FunctionId::UserInfo => "UserInfo",
            FunctionId::UserEdit => "UserEdit",
            FunctionId::UserSetManagesGroups => "UserSetManagesGroups",
            FunctionId::UserListGroups => "UserListGroups",
            FunctionId::GroupCreate => "GroupCreate",
            FunctionId::GroupRemove => "GroupRemove",
            FunctionId::GroupAddRemoveUser => "GroupAddRemoveUser",
            FunctionId::GroupInfo => "GroupInfo",
            FunctionId::StructCreate => "StructCreate",
            FunctionId::StructInfo => "StructInfo",
            FunctionId::StructEdit => "StructEdit",
            FunctionId::StructRemove => "StructRemove",
            FunctionId::StructFind => "StructFind",
            FunctionId::TaskCreate => "TaskCreate",
            FunctionId::TaskInfo => "TaskInfo",
            FunctionId::TaskEdit => "TaskEdit",
            FunctionId::TaskRemove => "TaskRemove",
            FunctionId::TaskFind => "TaskFind",
        }
    }

    /// Whether the function takes a session token argument.
    pub const fn requires_session(self) -> bool {
        !matches!(self, FunctionId::Ping | FunctionId::UserCreate | FunctionId::LogIn)
    }

    /// Whether the function is gated on the group-management capability.
    pub const fn requires_manages_groups(self) -> bool {
        matches!(
            self,
            FunctionId::UserSetManagesGroups
                | FunctionId::GroupCreate
                | FunctionId::GroupRemove
                | FunctionId::GroupAddRemoveUser
        )
    }
}

impl core::fmt::Display for FunctionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Request envelope. `args` stays raw until the handler's typed decode.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub function: u64,
    #[serde(default)]
    pub args: Option<Box<RawValue>>,
}

/// Response envelope. A failed call never carries data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn status(status: Status) -> Self {
        Self {
            code: status.code(),
            data: None,
        }
    }

    pub fn success(data: Option<Value>) -> Self {
        Self {
            code: Status::Success.code(),
            data,
        }
    }

    /// Serialize as a single newline-terminated frame.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut out = match serde_json::to_vec(self) {
            Ok(bytes) => bytes,
            // Only a non-string map key could fail here; fall back to the bare code.
            Err(_) => format!("{{\"code\":{}}}", Status::Unknown.code()).into_bytes(),
        };
        out.push(b'\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_wire_id() {
        for (i, f) in FunctionId::ALL.iter().enumerate() {
            assert_eq!(f.selector(), i as u64, "{f}");
            assert_eq!(FunctionId::from_selector(i as u64), Some(*f));
        }
        assert_eq!(FunctionId::from_selector(22), None);
        assert_eq!(FunctionId::from_selector(u64::MAX), None);
    }

    #[test]
    fn only_registration_login_and_ping_skip_the_session() {
        let open: Vec<_> = FunctionId::ALL
            .iter()
            .filter(|f| !f.requires_session())
            .map(|f| f.name())
            .collect();
        assert_eq!(open, vec!["Ping", "UserCreate", "LogIn"]);
        assert!(FunctionId::ALL
            .iter()
            .filter(|f| f.requires_manages_groups())
            .all(|f| f.requires_session()));
    }

    #[test]
    fn status_codes_are_stable() {
        let codes: Vec<u8> = [
            Status::Success,
            Status::AlreadyExists,
            Status::NotFound,
            Status::WrongPassword,
            Status::NotLoggedIn,
            Status::AccessDenied,
            Status::InvalidArguments,
            Status::NoSuchFunction,
            Status::Unknown,
        ]
        .into_iter()
        .map(Status::code)
        .collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5, 253, 254, 255]);
    }

    #[test]
    fn envelope_rejects_extra_fields_and_keeps_args_raw() {
        let req: Request = serde_json::from_str(r#"{"function":2,"args":{"login":"a"}}"#).unwrap();
        assert_eq!(req.function, 2);
        assert_eq!(req.args.unwrap().get(), r#"{"login":"a"}"#);

        assert!(serde_json::from_str::<Request>(r#"{"function":2,"extra":1}"#).is_err());
        assert!(serde_json::from_str::<Request>(r#"{"function":-1}"#).is_err());
    }

    #[test]
    fn failed_responses_omit_data() {
        let frame = Response::status(Status::NotLoggedIn).to_frame();
        assert_eq!(frame, b"{\"code\":4}\n");
    }
}
