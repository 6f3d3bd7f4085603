//! # Cutting Plane
//!
//! Plane representation with point classification.

use config::constants::PLANE_EPSILON;
use glam::DVec3;
use serde::{Deserialize, Serialize};

// =============================================================================
// AXIS
// =============================================================================

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Unit vector along the axis.
    pub fn unit(self) -> DVec3 {
        match self {
            Axis::X => DVec3::X,
            Axis::Y => DVec3::Y,
            Axis::Z => DVec3::Z,
        }
    }

    /// Component index (0, 1 or 2).
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classification of a point relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Point is in front of plane (positive side).
    Front,
    /// Point is behind plane (negative side).
    Back,
    /// Point is on the plane.
    Coplanar,
}

impl Classification {
    /// `1` for front, `-1` for back, `0` on the plane.
    pub fn sign(self) -> i8 {
        match self {
            Classification::Front => 1,
            Classification::Back => -1,
            Classification::Coplanar => 0,
        }
    }
}

// =============================================================================
// PLANE
// =============================================================================

/// A plane in 3D space defined by unit normal and distance from origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: DVec3,
    w: f64,
}

impl Plane {
    /// Axis-aligned plane `axis = offset`.
    pub fn axis_aligned(axis: Axis, offset: f64) -> Self {
        Self {
            normal: axis.unit(),
            w: offset,
        }
    }

    /// Get the plane normal.
    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    /// Get the plane distance.
    pub fn w(&self) -> f64 {
        self.w
    }

    /// Signed distance from point to plane.
    ///
    /// Positive = front, negative = back, zero = on plane.
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.w
    }

    /// Classify a point relative to this plane. Points within
    /// `PLANE_EPSILON` count as coplanar.
    pub fn classify_point(&self, point: DVec3) -> Classification {
        let dist = self.signed_distance(point);
        if dist > PLANE_EPSILON {
            Classification::Front
        } else if dist < -PLANE_EPSILON {
            Classification::Back
        } else {
            Classification::Coplanar
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
