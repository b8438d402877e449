//! Sampling simulation transforms and the 2D/3D update paths.

use super::{EntityView, InterpolationMode, UpdatePositionParameter, ViewFlags, ViewUpdateContext};
use glam::{Quat, Vec3};
use vista_core::math::{planar_rotation_to_world, planar_to_world, with_vertical};
use vista_core::{Frame, FrameNumber, Game, SnapshotInterpolationTimer, Transform2D, Transform2DVertical, Transform3D};

/// Which sample a transform is read for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum TimeReference {
    To,
    From,
    ErrorCorrection,
}

#[derive(Debug, Copy, Clone)]
struct Sample2D {
    frame: FrameNumber,
    transform: Transform2D,
    vertical: Option<Transform2DVertical>,
}

impl Sample2D {
    fn world_position(&self) -> Vec3 {
        let position = planar_to_world(self.transform.position);
        match self.vertical {
            Some(vertical) => with_vertical(position, vertical.position),
            None => position,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Sample3D {
    frame: FrameNumber,
    transform: Transform3D,
}

impl EntityView {
    fn time_reference_frame<'g>(game: &'g dyn Game, time: TimeReference) -> Option<&'g dyn Frame> {
        let frames = game.frames();
        match time {
            TimeReference::To => frames.predicted,
            TimeReference::From => frames.predicted_previous,
            TimeReference::ErrorCorrection => frames.previous_update_predicted,
        }
    }

    /// Buffer frame for a time reference while snapshot interpolating.
    /// Error correction has no snapshot counterpart.
    fn snapshot_frame(snapshot: &SnapshotInterpolationTimer, time: TimeReference) -> Option<FrameNumber> {
        match time {
            TimeReference::To => Some(snapshot.current_from() + 1),
            TimeReference::From => Some(snapshot.current_from()),
            TimeReference::ErrorCorrection => None,
        }
    }

    fn sample_2d(
        &self,
        game: &dyn Game,
        snapshot: &SnapshotInterpolationTimer,
        time: TimeReference,
        spawning: bool,
    ) -> Option<Sample2D> {
        if !spawning && self.use_snapshot_interpolation {
            let frame = Self::snapshot_frame(snapshot, time)?;
            let sample = self.interpolation_buffer.as_ref()?.get(frame)?;
            return Some(Sample2D {
                frame,
                transform: sample.transform_2d?,
                vertical: sample.vertical,
            });
        }

        let frame = Self::time_reference_frame(game, time)?;
        Some(Sample2D {
            frame: frame.number(),
            transform: frame.transform_2d(self.entity)?,
            vertical: frame.transform_2d_vertical(self.entity),
        })
    }

    fn sample_3d(
        &self,
        game: &dyn Game,
        snapshot: &SnapshotInterpolationTimer,
        time: TimeReference,
        spawning: bool,
    ) -> Option<Sample3D> {
        if !spawning && self.use_snapshot_interpolation {
            let frame = Self::snapshot_frame(snapshot, time)?;
            let sample = self.interpolation_buffer.as_ref()?.get(frame)?;
            return Some(Sample3D {
                frame,
                transform: sample.transform_3d?,
            });
        }

        let frame = Self::time_reference_frame(game, time)?;
        Some(Sample3D {
            frame: frame.number(),
            transform: frame.transform_3d(self.entity)?,
        })
    }

    fn interpolation_alpha(&self, cx: &ViewUpdateContext<'_>) -> f32 {
        let alpha = if self.use_snapshot_interpolation {
            cx.snapshot.alpha()
        } else {
            cx.game.interpolation_factor()
        };
        alpha.clamp(0.0, 1.0)
    }

    pub(super) fn refresh_interpolation_mode(&mut self, game: &dyn Game) {
        self.use_snapshot_interpolation = false;

        if self.has_flag(ViewFlags::ENABLE_SNAPSHOT_INTERPOLATION) {
            let culled = game
                .frames()
                .predicted
                .is_some_and(|frame| frame.is_culled(self.entity));
            self.use_snapshot_interpolation = match self.template.interpolation_mode {
                InterpolationMode::SnapshotInterpolation => true,
                InterpolationMode::Auto => culled,
                InterpolationMode::Prediction => false,
            };
        } else if cfg!(debug_assertions) && self.template.interpolation_mode != InterpolationMode::Prediction {
            tracing::warn!(
                entity = %self.entity,
                mode = ?self.template.interpolation_mode,
                "interpolation mode requires the snapshot interpolation flag; falling back to prediction"
            );
            self.template.interpolation_mode = InterpolationMode::Prediction;
        }
    }

    pub(super) fn update_from_2d(
        &mut self,
        cx: &mut ViewUpdateContext<'_>,
        use_clock_aliasing_interpolation: bool,
        use_error_correction: bool,
        spawning: bool,
    ) {
        let game = cx.game;
        self.refresh_interpolation_mode(game);

        let Some(to) = self.sample_2d(game, cx.snapshot, TimeReference::To, spawning) else {
            return;
        };

        let mut param = UpdatePositionParameter {
            new_position: to.world_position(),
            new_rotation: planar_rotation_to_world(to.transform.rotation),
            position_teleport: to.transform.position_teleport_frame == Some(to.frame),
            rotation_teleport: to.transform.rotation_teleport_frame == Some(to.frame),
            ..Default::default()
        };
        param.uninterpolated_position = param.new_position;
        param.uninterpolated_rotation = param.new_rotation;

        if let Some(from) = self.sample_2d(game, cx.snapshot, TimeReference::From, spawning) {
            if use_clock_aliasing_interpolation {
                let alpha = self.interpolation_alpha(cx);
                param.new_position = from.world_position().lerp(param.new_position, alpha);
                param.new_rotation = planar_rotation_to_world(from.transform.rotation).slerp(param.new_rotation, alpha);
            }

            if use_error_correction {
                match self.sample_2d(game, cx.snapshot, TimeReference::ErrorCorrection, false) {
                    Some(old) => {
                        let planar = planar_to_world(self.last_position_2d - old.transform.position);
                        let vertical = self.last_vertical_2d - old.vertical.map_or(0.0, |v| v.position);
                        self.error_visual_vector += with_vertical(planar, vertical);

                        let rotation = planar_rotation_to_world(self.last_rotation_2d - old.transform.rotation);
                        self.error_visual_quaternion = rotation * self.error_visual_quaternion;
                    }
                    None => self.reset_error(),
                }
            }
        }

        self.update_render_position(cx.scene, cx.delta_time, &mut param);

        self.last_position_2d = to.transform.position;
        self.last_vertical_2d = to.vertical.map_or(0.0, |v| v.position);
        self.last_rotation_2d = to.transform.rotation;
    }

    pub(super) fn update_from_3d(
        &mut self,
        cx: &mut ViewUpdateContext<'_>,
        use_clock_aliasing_interpolation: bool,
        use_error_correction: bool,
        spawning: bool,
    ) {
        let game = cx.game;
        self.refresh_interpolation_mode(game);

        let Some(to) = self.sample_3d(game, cx.snapshot, TimeReference::To, spawning) else {
            return;
        };

        let mut param = UpdatePositionParameter {
            new_position: to.transform.position,
            new_rotation: to.transform.rotation,
            uninterpolated_position: to.transform.position,
            uninterpolated_rotation: to.transform.rotation,
            position_teleport: to.transform.position_teleport_frame == Some(to.frame),
            rotation_teleport: to.transform.rotation_teleport_frame == Some(to.frame),
            ..Default::default()
        };

        if let Some(from) = self.sample_3d(game, cx.snapshot, TimeReference::From, spawning) {
            if use_clock_aliasing_interpolation {
                let alpha = self.interpolation_alpha(cx);
                param.new_position = from.transform.position.lerp(param.new_position, alpha);
                param.new_rotation = from.transform.rotation.slerp(param.new_rotation, alpha);
            }

            if use_error_correction {
                match self.sample_3d(game, cx.snapshot, TimeReference::ErrorCorrection, false) {
                    Some(old) => {
                        self.error_visual_vector += self.last_position_3d - old.transform.position;
                        let rotation = old.transform.rotation.inverse() * self.last_rotation_3d;
                        self.error_visual_quaternion = rotation * self.error_visual_quaternion;
                    }
                    None => self.reset_error(),
                }
            }
        }

        self.update_render_position(cx.scene, cx.delta_time, &mut param);

        self.last_position_3d = to.transform.position;
        self.last_rotation_3d = to.transform.rotation;
    }

    pub(super) fn reset_error(&mut self) {
        self.error_visual_vector = Vec3::ZERO;
        self.error_visual_quaternion = Quat::IDENTITY;
    }
}
