//! Math utilities
//!
//! Re-exports glam with the plane convention used to lift planar
//! simulation data into world space. By default planar entities live on the
//! XZ plane with Y up; the `xy` feature switches to the XY plane where the
//! vertical offset maps onto negative Z.

pub use glam::*;

/// Lift a planar vector into world space.
#[inline]
pub fn planar_to_world(v: Vec2) -> Vec3 {
    #[cfg(feature = "xy")]
    {
        Vec3::new(v.x, v.y, 0.0)
    }
    #[cfg(not(feature = "xy"))]
    {
        Vec3::new(v.x, 0.0, v.y)
    }
}

/// Rotation about the plane normal, in radians, as a world quaternion.
#[inline]
pub fn planar_rotation_to_world(radians: f32) -> Quat {
    #[cfg(feature = "xy")]
    {
        Quat::from_rotation_z(radians)
    }
    #[cfg(not(feature = "xy"))]
    {
        Quat::from_rotation_y(-radians)
    }
}

/// Overwrite the world axis that carries the planar vertical offset.
#[inline]
pub fn with_vertical(mut v: Vec3, vertical: f32) -> Vec3 {
    #[cfg(feature = "xy")]
    {
        v.z = -vertical;
    }
    #[cfg(not(feature = "xy"))]
    {
        v.y = vertical;
    }
    v
}

/// Angle in radians between `q` and the identity rotation.
///
/// Uses the signed dot product, so a quaternion with negative `w` reports
/// the long way round (up to 2π) rather than the shortest arc.
#[inline]
pub fn angle_from_identity(q: Quat) -> f32 {
    q.dot(Quat::IDENTITY).clamp(-1.0, 1.0).acos() * 2.0
}

/// Linear interpolation with `t` clamped to `[0, 1]`.
#[inline]
pub fn lerp_clamped(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_has_zero_angle() {
        assert_eq!(angle_from_identity(Quat::IDENTITY), 0.0);
    }

    #[test]
    fn quarter_turn_angle() {
        let q = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!((angle_from_identity(q) - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn negative_w_reports_long_way_round() {
        let q = Quat::from_rotation_y(6.2);
        assert!(q.w < 0.0);
        assert!((angle_from_identity(q) - 6.2).abs() < 1e-4);
    }

    #[test]
    fn vertical_overrides_height_axis() {
        let lifted = with_vertical(planar_to_world(Vec2::new(1.0, 2.0)), 5.0);
        #[cfg(not(feature = "xy"))]
        assert_eq!(lifted, Vec3::new(1.0, 5.0, 2.0));
        #[cfg(feature = "xy")]
        assert_eq!(lifted, Vec3::new(1.0, 2.0, -5.0));
    }

    #[test]
    fn lerp_clamps_factor() {
        assert_eq!(lerp_clamped(2.0, 4.0, 2.0), 4.0);
        assert_eq!(lerp_clamped(2.0, 4.0, -1.0), 2.0);
        assert_eq!(lerp_clamped(2.0, 4.0, 0.5), 3.0);
    }
}
