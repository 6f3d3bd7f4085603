//! # Object Transform

use glam::{DAffine3, DQuat, DVec3, EulerRot};

/// Location, rotation and scale of a scene object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub location: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        location: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: DVec3::ONE,
    };

    /// Transform at `location` with no rotation or scale.
    pub fn from_location(location: DVec3) -> Self {
        Self {
            location,
            ..Self::IDENTITY
        }
    }

    /// Builds a transform from XYZ Euler angles in degrees.
    pub fn from_euler_degrees(location: DVec3, rotation: [f64; 3], scale: DVec3) -> Self {
        let [x, y, z] = rotation.map(f64::to_radians);
        Self {
            location,
            rotation: DQuat::from_euler(EulerRot::XYZ, x, y, z),
            scale,
        }
    }

    /// Object-to-world matrix (scale, then rotation, then translation).
    pub fn matrix(&self) -> DAffine3 {
        DAffine3::from_scale_rotation_translation(self.scale, self.rotation, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_matrix() {
        let p = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(Transform::default().matrix().transform_point3(p), p);
    }

    #[test]
    fn test_euler_degrees_rotate_about_z() {
        let t = Transform::from_euler_degrees(DVec3::X, [0.0, 0.0, 90.0], DVec3::splat(2.0));
        let p = t.matrix().transform_point3(DVec3::X);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-12);
    }
}
