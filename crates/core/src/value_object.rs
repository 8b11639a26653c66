//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// construct a new one; validation happens once, at construction.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Access mask attached to structures and tasks.
///
/// Only the low six bits are meaningful, so the valid range is `0..=63`.
/// Out-of-range values cannot be constructed, which means a mask that made it
/// past argument decoding is always storable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PermissionMask(u8);

impl PermissionMask {
    pub const MAX: u8 = 63;

    pub fn new(bits: u8) -> DomainResult<Self> {
        if bits > Self::MAX {
            return Err(DomainError::validation(format!(
                "permission mask {bits} is out of range 0..={}",
                Self::MAX
            )));
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl ValueObject for PermissionMask {}

impl TryFrom<u8> for PermissionMask {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i16> for PermissionMask {
    type Error = DomainError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        let bits = u8::try_from(value)
            .map_err(|_| DomainError::validation(format!("permission mask {value} is negative or too large")))?;
        Self::new(bits)
    }
}

impl From<PermissionMask> for u8 {
    fn from(value: PermissionMask) -> Self {
        value.0
    }
}

impl From<PermissionMask> for i16 {
    fn from(value: PermissionMask) -> Self {
        i16::from(value.0)
    }
}

impl core::fmt::Display for PermissionMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:06b}", self.0)
    }
}
