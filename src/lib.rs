//! Rigid-body joint and collision-geometry core for a real-time 3D world.
//!
//! This crate answers three questions every simulation step:
//!
//! - which bodies are currently in motion and need simulation work
//!   ([`MovingManager`] — sleep aggregation),
//! - how two bodies are mechanically connected ([`Joint`] and the
//!   surface-type classifier [`Joint::can_build_joint`]),
//! - for a box-shaped collision primitive, which geometric feature
//!   (corner/edge/face) is nearest a query point, and what the
//!   primitive's inertial properties are ([`Block`]).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    external collaborators                │
//! │   Kernel (solver)      Primitive (body/geometry owner)   │
//! └───────────┬──────────────────────────┬───────────────────┘
//!             │ put_in_kernel /          │ surface types,
//!             │ remove_from_kernel       │ attachment frames
//! ┌───────────▼──────────┐   ┌───────────▼───────────────────┐
//! │  Joint (variant over │   │  Block (cuboid geometry:      │
//! │  Rotate / RotateV /  │   │  inertia, feature queries,    │
//! │  RotateP / Motor)    │   │  shared vertex cache)         │
//! └──────────────────────┘   └───────────────────────────────┘
//!             ▲
//!             │ heartbeat / notify_moved
//! ┌───────────┴──────────────────────────────────────────────┐
//! │  MovingManager (who is awake, who may sleep)             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure in-memory computation driven by one
//! synchronous heartbeat per simulation tick. The force-resolution
//! solver, broad-phase collision and asset formats live outside this
//! crate; they appear only as trait seams ([`Kernel`], [`Primitive`]).
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use nalgebra::Vector3;
//! use world_core::{Block, VertexCache};
//!
//! let cache = Arc::new(VertexCache::new());
//! let block = Block::new(Vector3::new(4.0, 1.0, 2.0), &cache)?;
//!
//! // Bounding-sphere radius and inertia of the hollow box.
//! let r = block.radius();
//! let inertia = block.moment(8.0);
//! assert!(r > 0.0 && inertia.m11 > 0.0);
//! # Ok::<(), world_core::WorldError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/world-core/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,  // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,      // mul_add style changes aren't always clearer
    clippy::doc_markdown,          // Not all technical terms need backticks
)]

pub mod block;
pub mod error;
pub mod joint;
pub mod moving;
pub mod pv;
pub mod surface;
pub mod tolerance;
pub mod types;

pub use block::{BallBlockInfo, Block, VertexCache};
pub use error::WorldError;
pub use joint::{
    Joint, JointAttachment, JointKind, JointStage, JointType, Kernel, Primitive, RevoluteLink,
    RotateConnector,
};
pub use moving::{MovingId, MovingManager, MovingObserver, MAX_STEPS_TO_SLEEP};
pub use pv::PV;
pub use surface::{SurfaceData, SurfaceInput};
pub use tolerance::Tolerance;
pub use types::{GeoPairType, NormalId, Pose, PrimitiveId, SurfaceType, Velocity};

/// Result type for world-core operations.
pub type Result<T> = std::result::Result<T, WorldError>;
