//! Simulation collaborator interfaces
//!
//! The view layer never owns simulation state. It reads finalized frame
//! snapshots through these traits on the main thread.

use crate::asset::{AssetGuid, AssetRef, ViewAsset};
use crate::entity::EntityRef;
use crate::transform::{Transform2D, Transform2DVertical, Transform3D};

/// Monotonic simulation tick counter.
pub type FrameNumber = i32;

/// Component linking an entity to the view asset it should be rendered with.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ViewLink {
    pub current: AssetRef,
}

impl ViewLink {
    pub fn new(asset: AssetGuid) -> Self {
        Self {
            current: AssetRef::new(asset),
        }
    }
}

/// Component linking an entity to a view instance baked into the scene.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MapEntityLink {
    pub index: usize,
}

/// Identity of the map a frame is running on.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MapInfo {
    pub guid: AssetGuid,
    /// Set when the frame runs a dynamic map created from another map asset.
    pub source: Option<AssetGuid>,
}

impl MapInfo {
    /// True if this map is `map` or was derived from it.
    pub fn is_based_on(&self, map: AssetGuid) -> bool {
        self.guid == map || self.source == Some(map)
    }
}

/// Read-only view of one simulation tick.
pub trait Frame {
    fn number(&self) -> FrameNumber;
    fn is_verified(&self) -> bool;
    fn is_culled(&self, entity: EntityRef) -> bool;

    fn transform_2d(&self, entity: EntityRef) -> Option<Transform2D>;
    fn transform_2d_vertical(&self, entity: EntityRef) -> Option<Transform2DVertical>;
    fn transform_3d(&self, entity: EntityRef) -> Option<Transform3D>;

    /// Append every entity carrying a view link to `out`.
    fn collect_views(&self, out: &mut Vec<(EntityRef, ViewLink)>);
    /// Append every entity carrying a map entity link to `out`.
    fn collect_map_entity_links(&self, out: &mut Vec<(EntityRef, MapEntityLink)>);

    fn map(&self) -> MapInfo;
    fn find_view_asset(&self, asset: AssetRef) -> Option<ViewAsset>;

    fn has_transform_2d(&self, entity: EntityRef) -> bool {
        self.transform_2d(entity).is_some()
    }

    fn has_transform_3d(&self, entity: EntityRef) -> bool {
        self.transform_3d(entity).is_some()
    }
}

/// Identity of a running game session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GameId(pub u64);

/// The frame set a game exposes to presentation code.
#[derive(Clone, Copy, Default)]
pub struct Frames<'a> {
    pub verified: Option<&'a dyn Frame>,
    pub predicted: Option<&'a dyn Frame>,
    /// The predicted frame one tick before `predicted`.
    pub predicted_previous: Option<&'a dyn Frame>,
    /// The predicted frame as it was before the latest simulation update.
    pub previous_update_predicted: Option<&'a dyn Frame>,
}

/// Session properties that drive interpolation decisions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub is_predicted: bool,
    pub is_interpolatable: bool,
    pub update_fps: u32,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            is_predicted: false,
            is_interpolatable: false,
            update_fps: 60,
        }
    }
}

impl SessionInfo {
    /// Duration of one simulation tick in seconds.
    pub fn tick_delta(&self) -> f32 {
        1.0 / self.update_fps.max(1) as f32
    }
}

/// A running simulation as seen from the view layer.
pub trait Game {
    fn id(&self) -> GameId;
    fn frames(&self) -> Frames<'_>;
    fn session(&self) -> SessionInfo;
    /// Inter-tick factor in `[0, 1]` for the current render frame.
    fn interpolation_factor(&self) -> f32;
}
