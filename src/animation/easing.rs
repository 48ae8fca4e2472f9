//! Easing functions for animation interpolation.
//!
//! Curves map a raw time fraction onto an eased fraction. Input is
//! clamped to [0.0, 1.0] before evaluation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Easing function variants for animation curves.
#[derive(
    Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EasingFunction {
    /// Linear interpolation (no easing).
    #[default]
    Linear,
    /// Quadratic ease-in (slow start, fast end).
    QuadraticIn,
    /// Quadratic ease-out (fast start, slow end).
    QuadraticOut,
    /// Square root ease-out (fast start, gradual slow).
    SqrtOut,
    /// Smoothstep ease-in-out: `t*t*(3-2t)`.
    ///
    /// This is the curve shaders use for preloaded animations.
    EaseInOut,
    /// Cubic Hermite interpolation with configurable control points.
    /// Formula: c1·3t(1-t)² + c2·3(1-t)t² + t³
    CubicHermite {
        /// First control point.
        c1: f64,
        /// Second control point.
        c2: f64,
    },
}

impl EasingFunction {
    /// Evaluate the easing function at time t.
    ///
    /// Input t is clamped to [0.0, 1.0].
    /// Returns the eased value, also in [0.0, 1.0].
    #[inline]
    #[must_use]
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::QuadraticIn => t * t,
            Self::QuadraticOut => {
                let omt = 1.0 - t;
                1.0 - omt * omt
            }
            Self::SqrtOut => t.sqrt(),
            Self::EaseInOut => t * t * (3.0 - 2.0 * t),
            Self::CubicHermite { c1, c2 } => {
                let omt = 1.0 - t;
                c1 * 3.0 * t * omt * omt + c2 * 3.0 * omt * t * t + t * t * t
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_endpoints() {
        let linear = EasingFunction::Linear;
        assert_eq!(linear.evaluate(0.0), 0.0);
        assert_eq!(linear.evaluate(0.5), 0.5);
        assert_eq!(linear.evaluate(1.0), 1.0);
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        let curve = EasingFunction::EaseInOut;
        assert_eq!(curve.evaluate(0.0), 0.0);
        assert_eq!(curve.evaluate(0.5), 0.5);
        assert_eq!(curve.evaluate(1.0), 1.0);
        let a = curve.evaluate(0.25);
        let b = curve.evaluate(0.75);
        assert!((a + b - 1.0).abs() < 1e-12);
        assert!(a < 0.25, "ease-in-out starts slow, got {a}");
    }

    #[test]
    fn test_cubic_hermite_endpoints() {
        let hermite = EasingFunction::CubicHermite { c1: 0.33, c2: 1.0 };
        assert_eq!(hermite.evaluate(0.0), 0.0);
        assert!((hermite.evaluate(1.0) - 1.0).abs() < 1e-9);
        assert!(hermite.evaluate(0.25) > 0.25);
    }

    #[test]
    fn test_input_clamping() {
        let linear = EasingFunction::Linear;
        assert_eq!(linear.evaluate(-0.5), 0.0);
        assert_eq!(linear.evaluate(1.5), 1.0);

        let quad_out = EasingFunction::QuadraticOut;
        assert_eq!(quad_out.evaluate(0.5), 0.75);
        assert_eq!(quad_out.evaluate(2.0), 1.0);
    }

    #[test]
    fn test_sqrt_out() {
        let sqrt_out = EasingFunction::SqrtOut;
        assert!((sqrt_out.evaluate(0.25) - 0.5).abs() < 1e-9);
    }
}
