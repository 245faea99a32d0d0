//! Pose/velocity composite for rigid-body state sampling.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{Pose, Velocity};

/// A rigid body's pose and velocity, taken together.
///
/// Every method is a pure computation: sampling the velocity field of
/// the body at a world point, or composing the state under a local
/// frame offset. No method mutates the PV.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PV {
    /// World pose of the body frame.
    pub pose: Pose,
    /// Velocity of the body frame origin.
    pub velocity: Velocity,
}

impl PV {
    /// Combine a pose and a velocity.
    #[must_use]
    pub const fn new(pose: Pose, velocity: Velocity) -> Self {
        Self { pose, velocity }
    }

    /// PV at rest at the given pose.
    #[must_use]
    pub fn at_rest(pose: Pose) -> Self {
        Self {
            pose,
            velocity: Velocity::zero(),
        }
    }

    /// Velocity of the rigid body at a world-space point.
    ///
    /// The linear part picks up the `ω × r` contribution of the body's
    /// rotation; the rotational part is shared by every point of the
    /// body.
    #[must_use]
    pub fn velocity_at_point(&self, world_point: &Point3<f64>) -> Velocity {
        let arm = world_point - self.pose.position;
        Velocity::new(
            self.velocity.linear + self.velocity.rotational.cross(&arm),
            self.velocity.rotational,
        )
    }

    /// PV of a frame rigidly attached at a local coordinate frame.
    #[must_use]
    pub fn pv_at_local_coord(&self, local: &Pose) -> Self {
        let world_pose = self.pose.compose(local);
        let world_velocity = self.velocity_at_point(&world_pose.position);
        Self::new(world_pose, world_velocity)
    }

    /// PV of a frame rigidly attached at a local offset (identity
    /// rotation).
    #[must_use]
    pub fn pv_at_local_offset(&self, local_offset: &Vector3<f64>) -> Self {
        self.pv_at_local_coord(&Pose::from_position(Point3::from(*local_offset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    #[test]
    fn test_velocity_at_point_pure_translation() {
        let pv = PV::new(
            Pose::from_position(Point3::new(1.0, 0.0, 0.0)),
            Velocity::new(Vector3::new(2.0, 0.0, 0.0), Vector3::zeros()),
        );
        let v = pv.velocity_at_point(&Point3::new(5.0, 5.0, 5.0));
        assert_relative_eq!(v.linear, Vector3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(v.rotational, Vector3::zeros());
    }

    #[test]
    fn test_velocity_at_point_spin() {
        // Spinning about +Z at the origin: a point at +X moves toward +Y.
        let pv = PV::new(
            Pose::identity(),
            Velocity::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0)),
        );
        let v = pv.velocity_at_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(v.linear, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(v.rotational, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_pv_at_local_offset_matches_local_coord() {
        let pv = PV::new(
            Pose::from_position_rotation(
                Point3::new(1.0, 2.0, 3.0),
                UnitQuaternion::from_euler_angles(0.3, -0.2, 0.5),
            ),
            Velocity::new(Vector3::new(0.1, 0.2, 0.3), Vector3::new(-0.5, 0.25, 1.0)),
        );
        let offset = Vector3::new(0.5, -1.0, 2.0);

        let via_offset = pv.pv_at_local_offset(&offset);
        let via_coord = pv.pv_at_local_coord(&Pose::from_position(Point3::from(offset)));
        assert_relative_eq!(
            via_offset.pose.position,
            via_coord.pose.position,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            via_offset.velocity.linear,
            via_coord.velocity.linear,
            epsilon = 1e-12
        );
        // Identity-rotation offset keeps the body orientation.
        assert_relative_eq!(
            via_offset.pose.rotation.angle_to(&pv.pose.rotation),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_pv_at_local_coord_velocity_consistency() {
        // The composed frame's velocity must equal the velocity field
        // sampled at the composed frame's origin.
        let pv = PV::new(
            Pose::from_position_rotation(
                Point3::new(-1.0, 4.0, 0.5),
                UnitQuaternion::from_euler_angles(1.0, 0.0, -0.7),
            ),
            Velocity::new(Vector3::new(1.0, -1.0, 0.0), Vector3::new(0.0, 2.0, 0.5)),
        );
        let local = Pose::from_position_rotation(
            Point3::new(0.25, 0.25, -0.75),
            UnitQuaternion::from_euler_angles(0.0, 0.9, 0.0),
        );

        let attached = pv.pv_at_local_coord(&local);
        let sampled = pv.velocity_at_point(&attached.pose.position);
        assert_relative_eq!(attached.velocity.linear, sampled.linear, epsilon = 1e-12);
        assert_relative_eq!(
            attached.velocity.rotational,
            sampled.rotational,
            epsilon = 1e-12
        );
    }
}
