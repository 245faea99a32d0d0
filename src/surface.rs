//! Surface drive data: how a body surface drives a joint.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// UI stepping rate used to evaluate time-varying surface channels.
const UI_STEP_HZ: f64 = 30.0;

/// Input source that drives a joint channel from a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SurfaceInput {
    /// The surface drives nothing.
    NoInput,
    /// Constant drive value (`param_b`).
    Constant,
    /// Sinusoidal drive: amplitude `param_a`, angular frequency
    /// `param_b`.
    Sin,
}

/// How a body surface drives a joint: an input-type tag plus two
/// numeric parameters.
///
/// The canonical empty value is [`SurfaceData::EMPTY`] — a fixed value
/// used as a default and sentinel, not a null.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceData {
    /// What drives the channel.
    pub input_type: SurfaceInput,
    /// First parameter (amplitude for `Sin`).
    pub param_a: f64,
    /// Second parameter (value for `Constant`, frequency for `Sin`).
    pub param_b: f64,
}

impl Default for SurfaceData {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl SurfaceData {
    /// The canonical empty surface: no input, default parameters.
    pub const EMPTY: Self = Self {
        input_type: SurfaceInput::NoInput,
        param_a: -0.5,
        param_b: 0.5,
    };

    /// Create surface data with explicit parameters.
    #[must_use]
    pub const fn new(input_type: SurfaceInput, param_a: f64, param_b: f64) -> Self {
        Self {
            input_type,
            param_a,
            param_b,
        }
    }

    /// Whether this is the canonical empty value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Evaluate the drive channel at a UI step.
    #[must_use]
    pub fn channel_value(&self, ui_step_id: u32) -> f64 {
        match self.input_type {
            SurfaceInput::NoInput => 0.0,
            SurfaceInput::Constant => self.param_b,
            SurfaceInput::Sin => {
                let t = f64::from(ui_step_id) / UI_STEP_HZ;
                self.param_a * (self.param_b * t).sin()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_is_canonical() {
        assert!(SurfaceData::EMPTY.is_empty());
        assert!(SurfaceData::default().is_empty());
        assert_eq!(SurfaceData::EMPTY.input_type, SurfaceInput::NoInput);
        assert_relative_eq!(SurfaceData::EMPTY.param_a, -0.5);
        assert_relative_eq!(SurfaceData::EMPTY.param_b, 0.5);
    }

    #[test]
    fn test_structural_equality() {
        let a = SurfaceData::new(SurfaceInput::Constant, 1.0, 2.0);
        let b = SurfaceData::new(SurfaceInput::Constant, 1.0, 2.0);
        assert_eq!(a, b);
        assert!(!a.is_empty());
        // Same parameters, different input type: not equal.
        let c = SurfaceData::new(SurfaceInput::Sin, 1.0, 2.0);
        assert_ne!(a, c);
        // Default parameters with a live input type are not empty.
        let d = SurfaceData::new(SurfaceInput::Constant, -0.5, 0.5);
        assert!(!d.is_empty());
    }

    #[test]
    fn test_channel_value() {
        assert_relative_eq!(SurfaceData::EMPTY.channel_value(17), 0.0);

        let constant = SurfaceData::new(SurfaceInput::Constant, 0.0, 3.5);
        assert_relative_eq!(constant.channel_value(0), 3.5);
        assert_relative_eq!(constant.channel_value(1000), 3.5);

        let sin = SurfaceData::new(SurfaceInput::Sin, 2.0, 1.0);
        assert_relative_eq!(sin.channel_value(0), 0.0);
        let expected = 2.0 * (30.0_f64 / 30.0).sin();
        assert_relative_eq!(sin.channel_value(30), expected, epsilon = 1e-12);
    }
}
