//! Entity views
//!
//! An [`EntityView`] is the presentation-side mirror of one simulation entity.
//! It owns the scene node, the attached view components, and the smoothing
//! state used to turn tick-rate simulation transforms into render-rate poses.

mod correction;
mod transform_update;

pub use correction::{apply_transform_default, UpdatePositionParameter};

use crate::component::{ComponentContext, ViewComponent, ViewComponentSlot, ViewContexts, ViewEntity};
use crate::pool::PooledInstance;
use crate::prefab::PrefabId;
use crate::scene::{NodeId, SceneGraph};
use bitflags::bitflags;
use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use vista_core::{
    AssetGuid, EntityRef, Frame, Game, InterpolationBuffer, SnapshotInterpolationTimer,
    TransformSample,
};

/// Which frame kind creates and keeps a view alive.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindBehaviour {
    /// Created from predicted frames; appears immediately, may be rolled back.
    #[default]
    NonVerified,
    /// Created from verified frames only.
    Verified,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationMode {
    /// Interpolate between predicted frames and smooth prediction errors.
    #[default]
    Prediction,
    /// Replay verified samples with a fixed render delay.
    SnapshotInterpolation,
    /// Snapshot interpolation only while the entity is prediction-culled.
    Auto,
}

bitflags! {
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ViewFlags: u32 {
        /// Skip behaviour and component update hooks.
        const DISABLE_UPDATE_VIEW = 1 << 0;
        /// Never write the transform.
        const DISABLE_UPDATE_POSITION = 1 << 1;
        /// Keep the node name instead of renaming it after the entity.
        const DISABLE_ENTITY_REF_NAMING = 1 << 2;
        /// Record verified samples so snapshot interpolation can be used.
        const ENABLE_SNAPSHOT_INTERPOLATION = 1 << 3;
    }
}

/// Tunables for prediction error correction.
///
/// Distances are in world units, rotation thresholds in radians and rates in
/// corrections per second.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorCorrectionSettings {
    pub rate_min: f32,
    pub rate_max: f32,
    pub position_blend_start: f32,
    pub position_blend_end: f32,
    pub rotation_blend_start: f32,
    pub rotation_blend_end: f32,
    pub position_min_correction: f32,
    pub position_teleport_distance: f32,
    pub rotation_teleport_distance: f32,
}

impl Default for ErrorCorrectionSettings {
    fn default() -> Self {
        Self {
            rate_min: 3.3,
            rate_max: 10.0,
            position_blend_start: 0.25,
            position_blend_end: 1.0,
            rotation_blend_start: 0.1,
            rotation_blend_end: 0.5,
            position_min_correction: 0.025,
            position_teleport_distance: 2.0,
            rotation_teleport_distance: 0.5,
        }
    }
}

/// Per-prefab (or per baked instance) view configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewTemplate {
    pub bind_behaviour: BindBehaviour,
    pub flags: ViewFlags,
    pub interpolation_mode: InterpolationMode,
    /// The host disposes of the view; the updater only notifies.
    pub manual_disposal: bool,
    pub error_correction: ErrorCorrectionSettings,
}

/// Overridable per-view hooks.
pub trait EntityViewBehaviour {
    fn on_initialize(&mut self, _contexts: &ViewContexts) {}
    fn on_activate(&mut self, _view: &ViewEntity, _frame: &dyn Frame) {}
    fn on_deactivate(&mut self) {}
    fn on_update_view(&mut self, _cx: &mut ComponentContext<'_>) {}
    fn on_late_update_view(&mut self, _cx: &mut ComponentContext<'_>) {}
    fn on_game_changed(&mut self, _game: &dyn Game) {}
    fn on_entity_instantiated(&mut self, _game: &dyn Game, _entity: EntityRef) {}
    fn on_entity_destroyed(&mut self, _game: &dyn Game, _entity: EntityRef) {}

    /// Write the final pose to the scene.
    fn apply_transform(&mut self, scene: &mut dyn SceneGraph, node: NodeId, param: &UpdatePositionParameter) {
        apply_transform_default(scene, node, param);
    }
}

/// Behaviour with no hooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBehaviour;

impl EntityViewBehaviour for DefaultBehaviour {}

/// Inputs for one render update of a view.
pub struct ViewUpdateContext<'a> {
    pub game: &'a dyn Game,
    pub scene: &'a mut dyn SceneGraph,
    pub snapshot: &'a SnapshotInterpolationTimer,
    /// Render delta time in seconds.
    pub delta_time: f32,
}

pub struct EntityView {
    node: NodeId,
    prefab: Option<PrefabId>,
    asset_guid: AssetGuid,
    entity: EntityRef,
    template: ViewTemplate,
    behaviour: Box<dyn EntityViewBehaviour>,
    components: Vec<ViewComponentSlot>,
    initialized: bool,

    last_position_2d: Vec2,
    last_vertical_2d: f32,
    last_rotation_2d: f32,
    last_position_3d: Vec3,
    last_rotation_3d: Quat,
    error_visual_vector: Vec3,
    error_visual_quaternion: Quat,

    interpolation_buffer: Option<InterpolationBuffer<TransformSample>>,
    snapshot_subscribed: bool,
    use_snapshot_interpolation: bool,
    map_slot: Option<usize>,
}

impl EntityView {
    pub fn new(node: NodeId, template: ViewTemplate) -> Self {
        Self {
            node,
            prefab: None,
            asset_guid: AssetGuid::NONE,
            entity: EntityRef::NONE,
            template,
            behaviour: Box::new(DefaultBehaviour),
            components: Vec::new(),
            initialized: false,
            last_position_2d: Vec2::ZERO,
            last_vertical_2d: 0.0,
            last_rotation_2d: 0.0,
            last_position_3d: Vec3::ZERO,
            last_rotation_3d: Quat::IDENTITY,
            error_visual_vector: Vec3::ZERO,
            error_visual_quaternion: Quat::IDENTITY,
            interpolation_buffer: None,
            snapshot_subscribed: false,
            use_snapshot_interpolation: false,
            map_slot: None,
        }
    }

    pub fn with_behaviour(mut self, behaviour: Box<dyn EntityViewBehaviour>) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn with_component(mut self, component: Box<dyn ViewComponent>) -> Self {
        self.components.push(ViewComponentSlot::new(component));
        self
    }

    pub(crate) fn with_prefab(mut self, prefab: PrefabId) -> Self {
        self.prefab = Some(prefab);
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn prefab(&self) -> Option<PrefabId> {
        self.prefab
    }

    /// GUID of the view asset this view was created for; `NONE` for baked map views.
    pub fn asset_guid(&self) -> AssetGuid {
        self.asset_guid
    }

    pub(crate) fn set_asset_guid(&mut self, guid: AssetGuid) {
        self.asset_guid = guid;
    }

    pub fn entity(&self) -> EntityRef {
        self.entity
    }

    pub(crate) fn set_entity(&mut self, entity: EntityRef) {
        self.entity = entity;
    }

    pub fn view_entity(&self) -> ViewEntity {
        ViewEntity {
            entity: self.entity,
            node: self.node,
        }
    }

    pub fn template(&self) -> &ViewTemplate {
        &self.template
    }

    pub fn bind_behaviour(&self) -> BindBehaviour {
        self.template.bind_behaviour
    }

    pub fn flags(&self) -> ViewFlags {
        self.template.flags
    }

    pub fn has_flag(&self, flag: ViewFlags) -> bool {
        self.template.flags.contains(flag)
    }

    pub fn set_flag(&mut self, flag: ViewFlags, enabled: bool) {
        self.template.flags.set(flag, enabled);
    }

    pub fn interpolation_mode(&self) -> InterpolationMode {
        self.template.interpolation_mode
    }

    pub fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.template.interpolation_mode = mode;
    }

    pub fn manual_disposal(&self) -> bool {
        self.template.manual_disposal
    }

    pub fn error_correction(&self) -> &ErrorCorrectionSettings {
        &self.template.error_correction
    }

    pub fn error_correction_mut(&mut self) -> &mut ErrorCorrectionSettings {
        &mut self.template.error_correction
    }

    pub fn error_visual_vector(&self) -> Vec3 {
        self.error_visual_vector
    }

    pub fn error_visual_quaternion(&self) -> Quat {
        self.error_visual_quaternion
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn uses_snapshot_interpolation(&self) -> bool {
        self.use_snapshot_interpolation
    }

    /// Whether verified samples are currently being recorded.
    pub fn is_snapshot_subscribed(&self) -> bool {
        self.snapshot_subscribed
    }

    pub fn interpolation_buffer(&self) -> Option<&InterpolationBuffer<TransformSample>> {
        self.interpolation_buffer.as_ref()
    }

    pub fn components(&self) -> &[ViewComponentSlot] {
        &self.components
    }

    pub fn behaviour(&self) -> &dyn EntityViewBehaviour {
        self.behaviour.as_ref()
    }

    pub fn behaviour_mut(&mut self) -> &mut dyn EntityViewBehaviour {
        self.behaviour.as_mut()
    }

    /// Slot index in the map data for scene-baked views.
    pub fn map_slot(&self) -> Option<usize> {
        self.map_slot
    }

    pub(crate) fn set_map_slot(&mut self, slot: Option<usize>) {
        self.map_slot = slot;
    }

    /// Bind to the current entity. Snaps to the entity's transform when it
    /// has one so that fresh views never slide in from the origin.
    pub fn activate(&mut self, cx: &mut ViewUpdateContext<'_>, frame: &dyn Frame, contexts: &ViewContexts) {
        self.last_position_2d = Vec2::ZERO;
        self.last_vertical_2d = 0.0;
        self.last_rotation_2d = 0.0;
        self.last_position_3d = Vec3::ZERO;
        self.last_rotation_3d = Quat::IDENTITY;
        self.error_visual_vector = Vec3::ZERO;
        self.error_visual_quaternion = Quat::IDENTITY;

        if frame.has_transform_2d(self.entity) {
            self.update_from_2d(cx, false, false, true);
        } else if frame.has_transform_3d(self.entity) {
            self.update_from_3d(cx, false, false, true);
        }

        if !self.initialized {
            self.behaviour.on_initialize(contexts);
            for slot in &mut self.components {
                slot.initialize(contexts);
            }
            self.initialized = true;
        }

        let view = self.view_entity();
        self.behaviour.on_activate(&view, frame);

        if self.has_flag(ViewFlags::ENABLE_SNAPSHOT_INTERPOLATION) {
            self.interpolation_buffer
                .get_or_insert_with(InterpolationBuffer::default)
                .reset();
            self.snapshot_subscribed = true;
        }

        let mut component_cx = ComponentContext::new(cx.game, &mut *cx.scene, Some(view));
        for slot in &mut self.components {
            slot.activate(&mut component_cx, frame);
        }
    }

    /// Record a verified simulation result for snapshot interpolation.
    pub fn record_snapshot(&mut self, frame: &dyn Frame) {
        if !self.snapshot_subscribed || !frame.is_verified() {
            return;
        }
        let Some(buffer) = self.interpolation_buffer.as_mut() else {
            return;
        };
        if let Some(sample) = TransformSample::capture(frame, self.entity) {
            buffer.add(sample, frame.number());
        }
    }

    pub fn deactivate(&mut self) {
        if !self.initialized {
            return;
        }

        self.snapshot_subscribed = false;
        for slot in &mut self.components {
            slot.deactivate();
        }
        self.behaviour.on_deactivate();
    }

    pub fn game_changed(&mut self, game: &dyn Game) {
        self.behaviour.on_game_changed(game);
        for slot in &mut self.components {
            slot.game_changed(game);
        }
    }

    pub(crate) fn notify_instantiated(&mut self, game: &dyn Game) {
        self.behaviour.on_entity_instantiated(game, self.entity);
    }

    pub(crate) fn notify_destroyed(&mut self, game: &dyn Game) {
        self.behaviour.on_entity_destroyed(game, self.entity);
    }

    /// Per render update: move the view and run update hooks.
    pub fn update_view(
        &mut self,
        cx: &mut ViewUpdateContext<'_>,
        use_clock_aliasing_interpolation: bool,
        use_error_correction: bool,
    ) {
        if !self.has_flag(ViewFlags::DISABLE_UPDATE_POSITION) {
            let game = cx.game;
            let predicted = game.frames().predicted;
            let has_2d = predicted.is_some_and(|f| f.has_transform_2d(self.entity));
            let has_3d = predicted.is_some_and(|f| f.has_transform_3d(self.entity));

            if has_2d {
                self.update_from_2d(cx, use_clock_aliasing_interpolation, use_error_correction, false);
            } else if has_3d {
                self.update_from_3d(cx, use_clock_aliasing_interpolation, use_error_correction, false);
            }
        }

        if self.has_flag(ViewFlags::DISABLE_UPDATE_VIEW) {
            return;
        }

        let mut component_cx = ComponentContext::new(cx.game, &mut *cx.scene, Some(self.view_entity()));
        self.behaviour.on_update_view(&mut component_cx);
        for slot in &mut self.components {
            slot.update_view(&mut component_cx);
        }
    }

    pub fn late_update_view(&mut self, cx: &mut ComponentContext<'_>) {
        if self.has_flag(ViewFlags::DISABLE_UPDATE_VIEW) {
            return;
        }

        self.behaviour.on_late_update_view(cx);
        for slot in &mut self.components {
            slot.late_update_view(cx);
        }
    }
}

impl PooledInstance for EntityView {
    fn node(&self) -> NodeId {
        self.node
    }
}

#[cfg(test)]
mod tests;
