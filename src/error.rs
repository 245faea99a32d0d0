//! Error types for joint and geometry operations.

use thiserror::Error;

/// Errors that can occur in the joint and collision-geometry core.
///
/// Every variant is a programming-contract violation detected as early
/// as possible, never a transient condition; nothing here retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// A geometric query violated its preconditions (degenerate box,
    /// wrong feature-count classification, out-of-range edge id).
    #[error("invalid geometry query: {reason}")]
    InvalidGeometryQuery {
        /// What precondition was violated.
        reason: String,
    },

    /// A motor operation needed the revolute link after `reset_link`
    /// transferred it out.
    #[error("motor link detached")]
    LinkDetached,

    /// The joint was stepped or removed while not registered with the
    /// kernel.
    #[error("joint not in kernel")]
    NotInKernel,

    /// `put_in_kernel` was called on a joint that is already registered
    /// or has been removed.
    #[error("joint not in an attachable state")]
    NotAttachable,

    /// A motor-only operation was invoked on a non-motor joint.
    #[error("operation requires a motor joint")]
    NotAMotor,
}

impl WorldError {
    /// Create an invalid geometry query error.
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometryQuery {
            reason: reason.into(),
        }
    }
}
