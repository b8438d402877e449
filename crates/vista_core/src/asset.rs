//! Asset identities resolved from the simulation's asset database

use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique asset identity. Zero is reserved for "no asset".
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetGuid(u64);

impl AssetGuid {
    pub const NONE: AssetGuid = AssetGuid(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for AssetGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Reference to an asset as stored inside simulation components.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct AssetRef {
    pub id: AssetGuid,
}

impl AssetRef {
    pub const fn new(id: AssetGuid) -> Self {
        Self { id }
    }
}

/// View asset descriptor. The prefab it names is resolved on the view side
/// by GUID; the simulation only knows the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewAsset {
    pub guid: AssetGuid,
    pub name: String,
}

impl ViewAsset {
    pub fn new(guid: AssetGuid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
        }
    }
}
