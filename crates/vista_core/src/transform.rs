//! Transform components read from simulation frames
//!
//! Values arrive already converted from the simulation's fixed-point types.
//! Each transform may carry a teleport marker per axis group: the frame
//! number on which the simulation moved the entity discontinuously.

use crate::frame::FrameNumber;
use glam::{Quat, Vec2, Vec3};

/// Planar transform (position on the plane, rotation in radians).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Transform2D {
    pub position: Vec2,
    pub rotation: f32,
    pub position_teleport_frame: Option<FrameNumber>,
    pub rotation_teleport_frame: Option<FrameNumber>,
}

impl Transform2D {
    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Mark both axis groups as teleported on `frame`.
    pub fn teleported_at(mut self, frame: FrameNumber) -> Self {
        self.position_teleport_frame = Some(frame);
        self.rotation_teleport_frame = Some(frame);
        self
    }
}

/// Height offset for pseudo-3D planar entities.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Transform2DVertical {
    pub position: f32,
    pub height: f32,
}

impl Transform2DVertical {
    pub fn new(position: f32) -> Self {
        Self {
            position,
            height: 0.0,
        }
    }
}

/// Full spatial transform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform3D {
    pub position: Vec3,
    pub rotation: Quat,
    pub position_teleport_frame: Option<FrameNumber>,
    pub rotation_teleport_frame: Option<FrameNumber>,
}

impl Default for Transform3D {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            position_teleport_frame: None,
            rotation_teleport_frame: None,
        }
    }
}

impl Transform3D {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Mark both axis groups as teleported on `frame`.
    pub fn teleported_at(mut self, frame: FrameNumber) -> Self {
        self.position_teleport_frame = Some(frame);
        self.rotation_teleport_frame = Some(frame);
        self
    }
}
