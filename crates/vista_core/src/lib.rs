//! Vista Core
//!
//! Simulation-facing vocabulary for the view layer:
//! - Entity and asset references
//! - Transform components with teleport markers
//! - `Frame` / `Game` collaborator traits
//! - Snapshot interpolation timing and sample buffers
//! - Plane-convention math

pub mod asset;
pub mod entity;
pub mod frame;
pub mod headless;
pub mod interpolation;
pub mod math;
pub mod time;
pub mod transform;

pub use glam;

pub use asset::{AssetGuid, AssetRef, ViewAsset};
pub use entity::EntityRef;
pub use frame::{
    Frame, FrameNumber, Frames, Game, GameId, MapEntityLink, MapInfo, SessionInfo, ViewLink,
};
pub use interpolation::{InterpolationBuffer, TransformSample};
pub use time::{SnapshotInterpolationSettings, SnapshotInterpolationTimer};
pub use transform::{Transform2D, Transform2DVertical, Transform3D};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
