//! Mechanical joints between primitives.
//!
//! A [`Joint`] is a tagged variant over four kinds — free-spinning
//! [`Rotate`](JointKind::Rotate), velocity-driven
//! [`RotateV`](JointKind::RotateV), position-driven
//! [`RotateP`](JointKind::RotateP) and actuated
//! [`Motor`](JointKind::Motor) — sharing one [`JointAttachment`]
//! record: two attachment frames into two primitives the joint never
//! owns.
//!
//! [`Joint::can_build_joint`] is the classifier: a pure decision table
//! from the surface types of two touching faces to the joint kind that
//! should connect them (or no joint at all).
//!
//! Joints register with the external solver through the [`Kernel`]
//! seam and must be `InKernel` to be stepped.

use nalgebra::{UnitQuaternion, Vector3};

use crate::error::WorldError;
use crate::pv::PV;
use crate::surface::SurfaceData;
use crate::tolerance::Tolerance;
use crate::types::{NormalId, Pose, PrimitiveId, SurfaceType};
use crate::Result;

/// External body/geometry owner, seen through the narrow interface the
/// joint classifier needs: surface classification, surface drive data
/// and an attachment frame per face.
///
/// The attachment frame convention: the frame's +Z axis is the outward
/// face normal in body coordinates.
pub trait Primitive {
    /// Identifier of this primitive.
    fn id(&self) -> PrimitiveId;
    /// Surface classification of a face.
    fn surface_type(&self, face: NormalId) -> SurfaceType;
    /// Drive data of a face's surface.
    fn surface_data(&self, face: NormalId) -> SurfaceData;
    /// Attachment frame of a face in body coordinates.
    fn face_frame(&self, face: NormalId) -> Pose;
}

/// External constraint solver. The core only ever registers and
/// unregisters solver payloads; their internal representation is the
/// solver's business.
pub trait Kernel {
    /// Register a rotate constraint.
    fn insert_connector(&mut self, connector: &RotateConnector);
    /// Unregister a rotate constraint.
    fn remove_connector(&mut self, connector: &RotateConnector);
    /// Register a revolute link.
    fn insert_link(&mut self, link: &RevoluteLink);
    /// Unregister a revolute link.
    fn remove_link(&mut self, link: &RevoluteLink);
}

/// Kernel-side kinematic link driven by a motor joint.
///
/// Owned by the motor until [`Joint::reset_link`] transfers it out
/// (used when the joint is torn down but the link must survive).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevoluteLink {
    joint_angle: f64,
}

impl RevoluteLink {
    /// Create a link at angle zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The kernel-side joint angle.
    #[must_use]
    pub fn joint_angle(&self) -> f64 {
        self.joint_angle
    }

    /// Write the kernel-side joint angle.
    pub fn set_joint_angle(&mut self, angle: f64) {
        self.joint_angle = angle;
    }
}

/// Solver-side revolute constraint payload owned by rotate joints.
#[derive(Debug, Clone, PartialEq)]
pub struct RotateConnector {
    /// Primitive carrying the axle surface.
    pub axle: PrimitiveId,
    /// Primitive carrying the hole surface.
    pub hole: PrimitiveId,
    /// Axle attachment frame in axle-body coordinates.
    pub axle_coord: Pose,
    /// Hole attachment frame in hole-body coordinates.
    pub hole_coord: Pose,
    /// Target spin rate about the axle (rad per UI step), driven by a
    /// velocity surface.
    pub rate: f64,
    /// Goal spin angle about the axle, driven by a position surface.
    pub goal_angle: f64,
}

impl RotateConnector {
    fn new(axle: PrimitiveId, hole: PrimitiveId, axle_coord: Pose, hole_coord: Pose) -> Self {
        Self {
            axle,
            hole,
            axle_coord,
            hole_coord,
            rate: 0.0,
            goal_angle: 0.0,
        }
    }
}

/// Joint kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    /// Free-spinning hinge.
    Rotate,
    /// Velocity-driven hinge.
    RotateV,
    /// Position-driven hinge.
    RotateP,
    /// Actuated motor.
    Motor,
}

/// Kernel-registration state of a joint.
///
/// `put_in_kernel` and `remove_from_kernel` are the only legal
/// transitions; a joint must be `InKernel` to be stepped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointStage {
    /// Attached to its primitives, not yet registered with the solver.
    Attached,
    /// Registered with the solver.
    InKernel,
    /// Unregistered; the joint is being torn down.
    Removed,
}

/// The two attachment points of a joint: primitive ids and attachment
/// frames in the respective body coordinates. Back-references only —
/// the joint never owns the primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct JointAttachment {
    prims: [PrimitiveId; 2],
    coords: [Pose; 2],
}

impl JointAttachment {
    /// Create an attachment between two primitives.
    #[must_use]
    pub fn new(prim0: PrimitiveId, prim1: PrimitiveId, c0: Pose, c1: Pose) -> Self {
        Self {
            prims: [prim0, prim1],
            coords: [c0, c1],
        }
    }

    /// Primitive id of attachment point `index`.
    ///
    /// # Panics
    ///
    /// Panics unless `index` is 0 or 1.
    #[must_use]
    pub fn primitive(&self, index: usize) -> PrimitiveId {
        debug_assert!(index < 2, "attachment index is 0 or 1, got {index}");
        self.prims[index]
    }

    /// Attachment frame of attachment point `index`.
    ///
    /// # Panics
    ///
    /// Panics unless `index` is 0 or 1.
    #[must_use]
    pub fn joint_coord(&self, index: usize) -> &Pose {
        debug_assert!(index < 2, "attachment index is 0 or 1, got {index}");
        &self.coords[index]
    }
}

/// Actuation state of a motor joint.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorState {
    link: Option<Box<RevoluteLink>>,
    polarity: i8,
    current_angle: f64,
    // Invariant: finite and non-negative, so step()'s clamp bounds are
    // always a valid interval.
    max_velocity: f64,
    /// Angle the motor drives toward (rad).
    pub desired_angle: f64,
}

impl MotorState {
    fn new(polarity: i8, max_velocity: f64) -> Self {
        let mut state = Self {
            link: Some(Box::new(RevoluteLink::new())),
            polarity: if polarity < 0 { -1 } else { 1 },
            current_angle: 0.0,
            max_velocity: 0.0,
            desired_angle: 0.0,
        };
        state.set_max_velocity(max_velocity);
        state
    }

    /// Maximum angle change per UI step (rad). Always finite and
    /// non-negative.
    #[must_use]
    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    /// Set the per-step angle limit. The sign is discarded; a
    /// non-finite value stops the motor (limit zero).
    pub fn set_max_velocity(&mut self, max_velocity: f64) {
        self.max_velocity = if max_velocity.is_finite() {
            max_velocity.abs()
        } else {
            0.0
        };
    }

    /// Sign convention mapping external angles to the link's internal
    /// convention. Fixed at construction, never flips.
    #[must_use]
    pub fn polarity(&self) -> i8 {
        self.polarity
    }

    /// The authoritative motor angle.
    #[must_use]
    pub fn current_angle(&self) -> f64 {
        self.current_angle
    }

    /// The owned link, if it has not been reset out.
    #[must_use]
    pub fn link(&self) -> Option<&RevoluteLink> {
        self.link.as_deref()
    }

    /// Set the motor angle, normalized into `(-π, π]`, writing it
    /// through to the link under the motor's polarity.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LinkDetached`] after `reset_link`.
    pub fn set_current_angle(&mut self, angle: f64) -> Result<()> {
        let normalized = normalize_angle(angle);
        let link = self.link.as_mut().ok_or(WorldError::LinkDetached)?;
        link.set_joint_angle(f64::from(self.polarity) * normalized);
        self.current_angle = normalized;
        Ok(())
    }

    /// Advance the angle toward `desired_angle`, at most `max_velocity`
    /// per step.
    fn step(&mut self) -> Result<()> {
        let delta =
            (self.desired_angle - self.current_angle).clamp(-self.max_velocity, self.max_velocity);
        self.set_current_angle(self.current_angle + delta)
    }

    /// Transfer ownership of the link out, leaving the motor without
    /// one. Link-dependent operations fail afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LinkDetached`] if the link was already
    /// taken.
    pub fn reset_link(&mut self) -> Result<Box<RevoluteLink>> {
        self.link.take().ok_or(WorldError::LinkDetached)
    }
}

/// Joint kind with its per-kind state.
#[derive(Debug, Clone, PartialEq)]
pub enum JointKind {
    /// Free-spinning hinge.
    Rotate {
        /// Solver payload.
        connector: RotateConnector,
    },
    /// Velocity-driven hinge: the axle surface's channel drives the
    /// connector's spin rate.
    RotateV {
        /// Solver payload.
        connector: RotateConnector,
        /// Drive data captured from the axle surface at build time.
        drive: SurfaceData,
    },
    /// Position-driven hinge: the axle surface's channel drives the
    /// connector's goal angle, rate-limited per step.
    RotateP {
        /// Solver payload.
        connector: RotateConnector,
        /// Drive data captured from the axle surface at build time.
        drive: SurfaceData,
    },
    /// Actuated motor.
    Motor(MotorState),
}

/// A mechanical constraint between two primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    attachment: JointAttachment,
    kind: JointKind,
    stage: JointStage,
}

impl Joint {
    /// Build a free-spinning rotate joint.
    #[must_use]
    pub fn rotate(axle: PrimitiveId, hole: PrimitiveId, c0: Pose, c1: Pose) -> Self {
        Self {
            kind: JointKind::Rotate {
                connector: RotateConnector::new(axle, hole, c0, c1),
            },
            attachment: JointAttachment::new(axle, hole, c0, c1),
            stage: JointStage::Attached,
        }
    }

    /// Build a velocity-driven rotate joint.
    #[must_use]
    pub fn rotate_v(
        axle: PrimitiveId,
        hole: PrimitiveId,
        c0: Pose,
        c1: Pose,
        drive: SurfaceData,
    ) -> Self {
        Self {
            kind: JointKind::RotateV {
                connector: RotateConnector::new(axle, hole, c0, c1),
                drive,
            },
            attachment: JointAttachment::new(axle, hole, c0, c1),
            stage: JointStage::Attached,
        }
    }

    /// Build a position-driven rotate joint.
    #[must_use]
    pub fn rotate_p(
        axle: PrimitiveId,
        hole: PrimitiveId,
        c0: Pose,
        c1: Pose,
        drive: SurfaceData,
    ) -> Self {
        Self {
            kind: JointKind::RotateP {
                connector: RotateConnector::new(axle, hole, c0, c1),
                drive,
            },
            attachment: JointAttachment::new(axle, hole, c0, c1),
            stage: JointStage::Attached,
        }
    }

    /// Build a motor joint. `polarity` fixes the angle sign convention
    /// for the life of the joint (non-negative means +1).
    #[must_use]
    pub fn motor(
        prim0: PrimitiveId,
        prim1: PrimitiveId,
        c0: Pose,
        c1: Pose,
        polarity: i8,
        max_velocity: f64,
    ) -> Self {
        Self {
            attachment: JointAttachment::new(prim0, prim1, c0, c1),
            kind: JointKind::Motor(MotorState::new(polarity, max_velocity)),
            stage: JointStage::Attached,
        }
    }

    /// The joint-type discriminator.
    #[must_use]
    pub fn joint_type(&self) -> JointType {
        match self.kind {
            JointKind::Rotate { .. } => JointType::Rotate,
            JointKind::RotateV { .. } => JointType::RotateV,
            JointKind::RotateP { .. } => JointType::RotateP,
            JointKind::Motor(_) => JointType::Motor,
        }
    }

    /// Current kernel-registration stage.
    #[must_use]
    pub fn stage(&self) -> JointStage {
        self.stage
    }

    /// The shared attachment record.
    #[must_use]
    pub fn attachment(&self) -> &JointAttachment {
        &self.attachment
    }

    /// Kind-specific state.
    #[must_use]
    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    /// The axle-side primitive (attachment point 0).
    #[must_use]
    pub fn axle_prim(&self) -> PrimitiveId {
        self.attachment.primitive(0)
    }

    /// The hole-side primitive (attachment point 1).
    #[must_use]
    pub fn hole_prim(&self) -> PrimitiveId {
        self.attachment.primitive(1)
    }

    /// Face of the axle primitive the joint is attached to, recovered
    /// from the attachment frame's +Z axis.
    #[must_use]
    pub fn axle_id(&self) -> Option<NormalId> {
        NormalId::from_direction(&(self.attachment.joint_coord(0).rotation * Vector3::z()))
    }

    /// Face of the hole primitive the joint is attached to.
    #[must_use]
    pub fn hole_id(&self) -> Option<NormalId> {
        NormalId::from_direction(&(self.attachment.joint_coord(1).rotation * Vector3::z()))
    }

    /// Motor state, if this is a motor joint.
    #[must_use]
    pub fn motor_state(&self) -> Option<&MotorState> {
        match &self.kind {
            JointKind::Motor(motor) => Some(motor),
            _ => None,
        }
    }

    /// Mutable motor state, if this is a motor joint.
    pub fn motor_state_mut(&mut self) -> Option<&mut MotorState> {
        match &mut self.kind {
            JointKind::Motor(motor) => Some(motor),
            _ => None,
        }
    }

    /// Whether a joint is a motor joint.
    #[must_use]
    pub fn is_motor_joint(joint: &Self) -> bool {
        matches!(joint.kind, JointKind::Motor(_))
    }

    /// Lever arm of the attachment point, floored at half a grid cell.
    #[must_use]
    pub fn torque_arm_length(&self) -> f64 {
        self.attachment.joint_coord(0)
            .position
            .coords
            .norm()
            .max(Tolerance::MAIN_GRID * 0.5)
    }

    /// Whether this kind does per-step actuation work.
    #[must_use]
    pub fn can_step_ui(&self) -> bool {
        !matches!(self.kind, JointKind::Rotate { .. })
    }

    /// Advance actuation by one UI step.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotInKernel`] unless the joint is
    /// registered with the solver, and [`WorldError::LinkDetached`]
    /// for a motor whose link was reset out.
    pub fn step_ui(&mut self, ui_step_id: u32) -> Result<()> {
        if self.stage != JointStage::InKernel {
            return Err(WorldError::NotInKernel);
        }
        match &mut self.kind {
            JointKind::Rotate { .. } => Ok(()),
            JointKind::RotateV { connector, drive } => {
                connector.rate = drive.channel_value(ui_step_id);
                Ok(())
            }
            JointKind::RotateP { connector, drive } => {
                let target = drive.channel_value(ui_step_id);
                let delta = (target - connector.goal_angle)
                    .clamp(-Tolerance::ROTATE_ANGLE_MAX, Tolerance::ROTATE_ANGLE_MAX);
                connector.goal_angle += delta;
                Ok(())
            }
            JointKind::Motor(motor) => motor.step(),
        }
    }

    /// Constraint-violation check against the two bodies' current
    /// states: the attachment axes must stay aligned and the attachment
    /// points together, within the joint family's tolerances.
    #[must_use]
    pub fn is_broken(&self, pv0: &PV, pv1: &PV) -> bool {
        let world0 = pv0.pose.compose(self.attachment.joint_coord(0));
        let world1 = pv1.pose.compose(self.attachment.joint_coord(1));

        // Touching faces have opposed outward normals when intact, so
        // the intact configuration is axis0 == -axis1.
        let axis0 = world0.rotation * Vector3::z();
        let axis1 = world1.rotation * Vector3::z();
        let angular = (-axis0.dot(&axis1)).clamp(-1.0, 1.0).acos();
        let planar = (world0.position - world1.position).norm();

        let (angle_max, planar_max) = match self.kind {
            JointKind::Motor(_) => (Tolerance::JOINT_ANGLE_MAX, Tolerance::JOINT_PLANAR_MAX),
            _ => (Tolerance::ROTATE_ANGLE_MAX, Tolerance::ROTATE_PLANAR_MAX),
        };
        angular > angle_max || planar > planar_max
    }

    /// Register the joint's solver payload with the kernel.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotAttachable`] unless the joint is in the
    /// `Attached` stage, and [`WorldError::LinkDetached`] for a motor
    /// whose link was reset out.
    pub fn put_in_kernel(&mut self, kernel: &mut dyn Kernel) -> Result<()> {
        if self.stage != JointStage::Attached {
            return Err(WorldError::NotAttachable);
        }
        match &self.kind {
            JointKind::Rotate { connector }
            | JointKind::RotateV { connector, .. }
            | JointKind::RotateP { connector, .. } => kernel.insert_connector(connector),
            JointKind::Motor(motor) => {
                let link = motor.link().ok_or(WorldError::LinkDetached)?;
                kernel.insert_link(link);
            }
        }
        self.stage = JointStage::InKernel;
        Ok(())
    }

    /// Unregister the joint's solver payload from the kernel.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotInKernel`] unless the joint is
    /// currently registered.
    pub fn remove_from_kernel(&mut self, kernel: &mut dyn Kernel) -> Result<()> {
        if self.stage != JointStage::InKernel {
            return Err(WorldError::NotInKernel);
        }
        match &self.kind {
            JointKind::Rotate { connector }
            | JointKind::RotateV { connector, .. }
            | JointKind::RotateP { connector, .. } => kernel.remove_connector(connector),
            JointKind::Motor(motor) => {
                if let Some(link) = motor.link() {
                    kernel.remove_link(link);
                }
            }
        }
        self.stage = JointStage::Removed;
        Ok(())
    }

    /// Transfer the motor's link ownership out (tear-down path: the
    /// joint goes away, the link survives).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotAMotor`] for non-motor joints and
    /// [`WorldError::LinkDetached`] if the link was already taken.
    pub fn reset_link(&mut self) -> Result<Box<RevoluteLink>> {
        self.motor_state_mut()
            .ok_or(WorldError::NotAMotor)?
            .reset_link()
    }

    /// Pose of primitive `me` expressed in the other primitive's frame,
    /// through the motor's current angle about the attachment +Z axis.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotAMotor`] for non-motor joints, or an
    /// invalid-geometry error when `me` is not attached to this joint.
    pub fn me_in_other(&self, me: PrimitiveId) -> Result<Pose> {
        let motor = self.motor_state().ok_or(WorldError::NotAMotor)?;
        let (me_index, other_index) = if me == self.attachment.primitive(0) {
            (0, 1)
        } else if me == self.attachment.primitive(1) {
            (1, 0)
        } else {
            return Err(WorldError::invalid_geometry(format!(
                "{me} is not attached to this joint"
            )));
        };

        let angle = f64::from(motor.polarity()) * motor.current_angle();
        let spin = Pose::from_position_rotation(
            nalgebra::Point3::origin(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle),
        );
        Ok(self
            .attachment
            .joint_coord(other_index)
            .compose(&spin)
            .compose(&self.attachment.joint_coord(me_index).inverse()))
    }

    /// The joint-type classifier: decide from the surface types of two
    /// touching faces which joint, if any, should connect the
    /// primitives, and build it with the two attachment frames.
    ///
    /// The first primitive's surface is tried as the axle first; an
    /// unmatched pair is a valid "no joint" outcome.
    #[must_use]
    pub fn can_build_joint(
        p0: &dyn Primitive,
        p1: &dyn Primitive,
        n0: NormalId,
        n1: NormalId,
    ) -> Option<Self> {
        Self::surface_type_to_joint(p0.surface_type(n0), p0, p1, n0, n1)
            .or_else(|| Self::surface_type_to_joint(p1.surface_type(n1), p1, p0, n1, n0))
    }

    /// Decision table from an axle surface type to a joint kind.
    fn surface_type_to_joint(
        surface_type: SurfaceType,
        axle: &dyn Primitive,
        hole: &dyn Primitive,
        axle_face: NormalId,
        hole_face: NormalId,
    ) -> Option<Self> {
        let c0 = axle.face_frame(axle_face);
        let c1 = hole.face_frame(hole_face);
        match surface_type {
            SurfaceType::Rotate => Some(Self::rotate(axle.id(), hole.id(), c0, c1)),
            SurfaceType::RotateV => Some(Self::rotate_v(
                axle.id(),
                hole.id(),
                c0,
                c1,
                axle.surface_data(axle_face),
            )),
            SurfaceType::RotateP => Some(Self::rotate_p(
                axle.id(),
                hole.id(),
                c0,
                c1,
                axle.surface_data(axle_face),
            )),
            _ => None,
        }
    }
}

/// Normalize an angle into `(-π, π]`.
fn normalize_angle(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let mut wrapped = angle % TAU;
    if wrapped <= -PI {
        wrapped += TAU;
    } else if wrapped > PI {
        wrapped -= TAU;
    }
    wrapped
}
