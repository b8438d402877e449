//! View layer settings

use crate::error::ViewError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vista_core::{AssetGuid, SnapshotInterpolationSettings};

/// Top-level settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub updater: UpdaterSettings,
    pub pool: PoolSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterSettings {
    /// Ask the scene for baked map data while none is known.
    pub auto_find_map_data: bool,
    pub snapshot_interpolation: SnapshotInterpolationSettings,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            auto_find_map_data: true,
            snapshot_interpolation: SnapshotInterpolationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Reset local scale to one when an instance is borrowed.
    pub reset_scale: bool,
    pub precache: Vec<PrecacheEntry>,
}

/// Number of instances to pre-warm for the prefab of a view asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheEntry {
    pub asset: AssetGuid,
    pub count: usize,
}

impl ViewSettings {
    pub fn from_json_str(json: &str) -> Result<Self, ViewError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ViewError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
