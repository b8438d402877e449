//! Render pose resolution and prediction error decay.

use super::EntityView;
use crate::scene::{NodeId, SceneGraph};
use glam::{Quat, Vec3};
use vista_core::math::{angle_from_identity, lerp_clamped};

/// Pose candidates for one render update, handed to
/// [`EntityViewBehaviour::apply_transform`](super::EntityViewBehaviour::apply_transform).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UpdatePositionParameter {
    /// Interpolated pose.
    pub new_position: Vec3,
    pub new_rotation: Quat,
    /// Latest sampled pose without interpolation.
    pub uninterpolated_position: Vec3,
    pub uninterpolated_rotation: Quat,
    pub error_visual_vector: Vec3,
    pub error_visual_quaternion: Quat,
    /// Accumulated error exceeded its teleport threshold and was dropped.
    pub position_error_teleport: bool,
    pub rotation_error_teleport: bool,
    /// The simulation marked the sampled frame as a teleport.
    pub position_teleport: bool,
    pub rotation_teleport: bool,
}

impl Default for UpdatePositionParameter {
    fn default() -> Self {
        Self {
            new_position: Vec3::ZERO,
            new_rotation: Quat::IDENTITY,
            uninterpolated_position: Vec3::ZERO,
            uninterpolated_rotation: Quat::IDENTITY,
            error_visual_vector: Vec3::ZERO,
            error_visual_quaternion: Quat::IDENTITY,
            position_error_teleport: false,
            rotation_error_teleport: false,
            position_teleport: false,
            rotation_teleport: false,
        }
    }
}

/// Teleported axes use the uninterpolated pose; the others get the visual
/// error applied on top of the interpolated pose.
pub fn apply_transform_default(scene: &mut dyn SceneGraph, node: NodeId, param: &UpdatePositionParameter) {
    let position = if param.position_teleport {
        param.uninterpolated_position
    } else {
        param.new_position + param.error_visual_vector
    };

    let rotation = if param.rotation_teleport {
        param.uninterpolated_rotation
    } else {
        param.error_visual_quaternion * param.new_rotation
    };

    scene.set_position(node, position);
    scene.set_rotation(node, rotation);
}

/// Map an error magnitude onto a correction rate between `min` and `max`.
fn correction_rate(magnitude: f32, blend_start: f32, blend_end: f32, min: f32, max: f32) -> f32 {
    let range = blend_end - blend_start;
    let blend = if range > 0.0 {
        ((magnitude - blend_start) / range).clamp(0.0, 1.0)
    } else if magnitude >= blend_start {
        1.0
    } else {
        0.0
    };
    lerp_clamped(min, max, blend)
}

impl EntityView {
    pub(super) fn update_render_position(
        &mut self,
        scene: &mut dyn SceneGraph,
        delta_time: f32,
        param: &mut UpdatePositionParameter,
    ) {
        let settings = self.template.error_correction;
        let mut position_rate = settings.rate_min;
        let mut rotation_rate = settings.rate_min;

        let position_error = self.error_visual_vector.length();
        if position_error > settings.position_teleport_distance {
            param.position_error_teleport = true;
            self.error_visual_vector = Vec3::ZERO;
            param.new_position = param.uninterpolated_position;
        } else {
            position_rate = correction_rate(
                position_error,
                settings.position_blend_start,
                settings.position_blend_end,
                settings.rate_min,
                settings.rate_max,
            );
        }

        let rotation_error = angle_from_identity(self.error_visual_quaternion);
        if rotation_error > settings.rotation_teleport_distance {
            param.rotation_error_teleport = true;
            self.error_visual_quaternion = Quat::IDENTITY;
            param.new_rotation = param.uninterpolated_rotation;
        } else {
            rotation_rate = correction_rate(
                rotation_error,
                settings.rotation_blend_start,
                settings.rotation_blend_end,
                settings.rate_min,
                settings.rate_max,
            );
        }

        param.error_visual_vector = self.error_visual_vector;
        param.error_visual_quaternion = self.error_visual_quaternion;

        {
            let _span = tracing::trace_span!("entity_view.apply_transform").entered();
            self.behaviour.apply_transform(scene, self.node, param);
        }

        let multiplier = (1.0 - delta_time * position_rate).clamp(0.0, 1.0);
        let corrected = self.error_visual_vector * multiplier;
        if corrected.length() < settings.position_min_correction {
            self.apply_min_position_correction(settings.position_min_correction);
        } else {
            self.error_visual_vector = corrected;
        }

        let t = (delta_time * rotation_rate).clamp(0.0, 1.0);
        self.error_visual_quaternion = self.error_visual_quaternion.slerp(Quat::IDENTITY, t);
    }

    /// Step the error toward zero by a fixed distance, zeroing each axis
    /// that would cross zero.
    fn apply_min_position_correction(&mut self, min_correction: f32) {
        let error = self.error_visual_vector;
        if error == Vec3::ZERO {
            return;
        }

        let before = error.to_array();
        let mut after = (error - error.normalize() * min_correction).to_array();
        for axis in 0..3 {
            if (before[axis] >= 0.0) != (after[axis] >= 0.0) {
                after[axis] = 0.0;
            }
        }
        self.error_visual_vector = Vec3::from_array(after);
    }
}
