//! Process-wide numeric thresholds for geometry and joint matching.
//!
//! Every tolerance is expressed relative to [`Tolerance::MAIN_GRID`],
//! the edge length of one grid cell. Joint matching uses the loose
//! `JOINT_*` values; the rotate family holds parts to the tighter
//! `ROTATE_*` values, glued surfaces to the loosest `GLUE_*` values.

use nalgebra::Vector3;

/// Table of numeric thresholds consumed by geometry and joint-matching
/// code. Stateless; all members are constants or pure functions.
pub struct Tolerance;

impl Tolerance {
    /// Edge length of one grid cell.
    pub const MAIN_GRID: f64 = 1.0;

    /// Maximum distance between two attachment points that still count
    /// as the same point.
    pub const JOINT_MAX_UNALIGNED: f64 = 0.05;

    /// Minimum face overlap for two surfaces to be joinable.
    pub const JOINT_OVERLAP_MIN: f64 = 0.05;

    /// Maximum angular misalignment of joined faces (radians).
    pub const JOINT_ANGLE_MAX: f64 = 0.05;

    /// Maximum in-plane drift of joined faces.
    pub const JOINT_PLANAR_MAX: f64 = 0.05;

    /// Maximum angular misalignment for a rotate axle in its hole
    /// (radians). Tighter than the generic joint tolerance.
    pub const ROTATE_ANGLE_MAX: f64 = 0.025;

    /// Maximum in-plane drift for a rotate axle in its hole.
    pub const ROTATE_PLANAR_MAX: f64 = 0.025;

    /// Maximum angular misalignment tolerated by a glue joint (radians).
    pub const GLUE_ANGLE_MAX: f64 = 0.1;

    /// Maximum in-plane drift tolerated by a glue joint.
    pub const GLUE_PLANAR_MAX: f64 = 0.1;

    /// Maximum penetration or gap between touching surfaces.
    pub const MAX_OVERLAP_OR_GAP: f64 = 0.1;

    /// Whether two points are too far apart to be treated as the same
    /// attachment point.
    #[must_use]
    pub fn points_unaligned(a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        (a - b).norm() > Self::JOINT_MAX_UNALIGNED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_unaligned() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        assert!(!Tolerance::points_unaligned(&a, &a));
        let nearby = a + Vector3::new(0.01, 0.0, 0.0);
        assert!(!Tolerance::points_unaligned(&a, &nearby));
        let far = a + Vector3::new(0.0, 0.2, 0.0);
        assert!(Tolerance::points_unaligned(&a, &far));
    }

    #[test]
    fn test_tolerance_ordering() {
        // Rotate joints hold parts tighter than generic joints, glue is
        // the loosest. The relationships matter more than the values.
        assert!(Tolerance::ROTATE_ANGLE_MAX < Tolerance::JOINT_ANGLE_MAX);
        assert!(Tolerance::JOINT_ANGLE_MAX < Tolerance::GLUE_ANGLE_MAX);
        assert!(Tolerance::ROTATE_PLANAR_MAX < Tolerance::JOINT_PLANAR_MAX);
        assert!(Tolerance::JOINT_PLANAR_MAX < Tolerance::GLUE_PLANAR_MAX);
        assert!(Tolerance::JOINT_MAX_UNALIGNED < Tolerance::MAIN_GRID);
    }
}
