//! Core value types shared across the crate.
//!
//! These types are pure data: face identifiers, contact-pair tags,
//! surface classifications, body ids, and the pose/velocity pair the
//! rest of the crate computes with.

use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Discrete identifier for one of the six axis-aligned face directions
/// of a box.
///
/// Positive directions come first so that `index()` matches the
/// face-table layout in [`crate::block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NormalId {
    /// +X face.
    X,
    /// +Y face.
    Y,
    /// +Z face.
    Z,
    /// -X face.
    XNeg,
    /// -Y face.
    YNeg,
    /// -Z face.
    ZNeg,
}

impl NormalId {
    /// All six face directions, in index order.
    pub const ALL: [Self; 6] = [
        Self::X,
        Self::Y,
        Self::Z,
        Self::XNeg,
        Self::YNeg,
        Self::ZNeg,
    ];

    /// Face-table index (0..6).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
            Self::XNeg => 3,
            Self::YNeg => 4,
            Self::ZNeg => 5,
        }
    }

    /// Face direction for a face-table index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Coordinate axis of the face (0, 1 or 2).
    #[must_use]
    pub fn axis(self) -> usize {
        self.index() % 3
    }

    /// Whether the face points along the positive axis direction.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.index() < 3
    }

    /// The face on the opposite side of the box.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::X => Self::XNeg,
            Self::Y => Self::YNeg,
            Self::Z => Self::ZNeg,
            Self::XNeg => Self::X,
            Self::YNeg => Self::Y,
            Self::ZNeg => Self::Z,
        }
    }

    /// Unit outward normal of the face in body coordinates.
    #[must_use]
    pub fn direction(self) -> Vector3<f64> {
        let sign = if self.is_positive() { 1.0 } else { -1.0 };
        let mut v = Vector3::zeros();
        v[self.axis()] = sign;
        v
    }

    /// Classify a direction as one of the six face normals.
    ///
    /// Returns `None` when the direction is not aligned with any axis
    /// within [`crate::Tolerance::JOINT_ANGLE_MAX`]. Used to recover
    /// the axle/hole face of a joint attachment frame.
    #[must_use]
    pub fn from_direction(direction: &Vector3<f64>) -> Option<Self> {
        let norm = direction.norm();
        if norm < f64::EPSILON {
            return None;
        }
        let unit = direction / norm;
        let cos_max = crate::Tolerance::JOINT_ANGLE_MAX.cos();
        Self::ALL
            .into_iter()
            .find(|id| unit.dot(&id.direction()) >= cos_max)
    }
}

/// Classification of which feature of a box a sphere contact lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GeoPairType {
    /// Sphere against a face plane.
    BallPlanePair,
    /// Sphere against an edge.
    BallEdgePair,
    /// Sphere against a corner vertex.
    BallPointPair,
}

/// Surface classification of a primitive face.
///
/// Consumed by the joint classifier: only the rotate family produces
/// joints in this core, everything else is handled elsewhere (welding,
/// gluing) or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SurfaceType {
    /// Featureless surface.
    Smooth,
    /// Glued surface.
    Glue,
    /// Welded surface.
    Weld,
    /// Stud surface (snaps to inlets).
    Studs,
    /// Inlet surface (accepts studs).
    Inlet,
    /// Accepts both studs and inlets.
    Universal,
    /// Free-spinning hinge axle.
    Rotate,
    /// Velocity-driven rotating axle.
    RotateV,
    /// Position-driven rotating axle.
    RotateP,
}

/// Unique identifier for a primitive (rigid body with collision
/// geometry) owned outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrimitiveId(pub u64);

impl PrimitiveId {
    /// Create a new primitive ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Primitive({})", self.0)
    }
}

/// Position and orientation of a body or attachment frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position in the parent frame.
    pub position: Point3<f64>,
    /// Orientation as a unit quaternion.
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Identity pose (origin, no rotation).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Pose from position only (identity rotation).
    #[must_use]
    pub fn from_position(position: Point3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Pose from position and rotation.
    #[must_use]
    pub const fn from_position_rotation(
        position: Point3<f64>,
        rotation: UnitQuaternion<f64>,
    ) -> Self {
        Self { position, rotation }
    }

    /// Transform a point from this frame to the parent frame.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f64>) -> Point3<f64> {
        self.position + self.rotation * local.coords
    }

    /// Rotate a vector from this frame to the parent frame.
    #[must_use]
    pub fn transform_vector(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * local
    }

    /// Compose with another pose: `self * other` maps `other`-local
    /// coordinates through `other` then `self`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            position: self.transform_point(&other.position),
            rotation: self.rotation * other.rotation,
        }
    }

    /// Inverse pose.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            position: Point3::from(-(inv_rotation * self.position.coords)),
            rotation: inv_rotation,
        }
    }

    /// Rotation as a 3x3 matrix.
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.to_rotation_matrix().into_inner()
    }
}

/// Linear and rotational velocity of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Velocity {
    /// Linear velocity.
    pub linear: Vector3<f64>,
    /// Rotational (angular) velocity.
    pub rotational: Vector3<f64>,
}

impl Default for Velocity {
    fn default() -> Self {
        Self::zero()
    }
}

impl Velocity {
    /// Zero velocity.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            linear: Vector3::zeros(),
            rotational: Vector3::zeros(),
        }
    }

    /// Velocity from linear and rotational parts.
    #[must_use]
    pub const fn new(linear: Vector3<f64>, rotational: Vector3<f64>) -> Self {
        Self { linear, rotational }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_id_roundtrip() {
        for id in NormalId::ALL {
            assert_eq!(NormalId::from_index(id.index()), Some(id));
            assert_eq!(id.opposite().opposite(), id);
            assert_eq!(id.axis(), id.opposite().axis());
            assert_relative_eq!(id.direction().norm(), 1.0);
            assert_relative_eq!(id.direction().dot(&id.opposite().direction()), -1.0);
        }
        assert_eq!(NormalId::from_index(6), None);
    }

    #[test]
    fn test_normal_id_from_direction() {
        assert_eq!(
            NormalId::from_direction(&Vector3::new(2.0, 0.0, 0.0)),
            Some(NormalId::X)
        );
        assert_eq!(
            NormalId::from_direction(&Vector3::new(0.0, 0.0, -0.5)),
            Some(NormalId::ZNeg)
        );
        // Slight misalignment within tolerance still classifies.
        assert_eq!(
            NormalId::from_direction(&Vector3::new(1.0, 0.001, 0.0)),
            Some(NormalId::X)
        );
        // A diagonal is not a face direction.
        assert_eq!(NormalId::from_direction(&Vector3::new(1.0, 1.0, 0.0)), None);
        assert_eq!(NormalId::from_direction(&Vector3::zeros()), None);
    }

    #[test]
    fn test_pose_compose_inverse() {
        let a = Pose::from_position_rotation(
            Point3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        );
        let b = Pose::from_position_rotation(
            Point3::new(-2.0, 0.5, 1.0),
            UnitQuaternion::from_euler_angles(0.0, -0.4, 0.9),
        );

        let ab = a.compose(&b);
        let p = Point3::new(0.3, -0.7, 2.1);
        let direct = a.transform_point(&b.transform_point(&p));
        let composed = ab.transform_point(&p);
        assert_relative_eq!(direct, composed, epsilon = 1e-12);

        let round_trip = a.inverse().transform_point(&a.transform_point(&p));
        assert_relative_eq!(round_trip, p, epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_zero_default() {
        assert_eq!(Velocity::default(), Velocity::zero());
        assert_relative_eq!(Velocity::zero().linear.norm(), 0.0);
    }
}
