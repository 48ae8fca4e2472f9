//! Timed animation: an interpolator, a duration, and an easing curve.

use super::easing::EasingFunction;
use super::interpolation::Interpolator;
use crate::value::Value;

/// Default animation duration in milliseconds.
pub const DEFAULT_DURATION_MS: f64 = 1000.0;

/// Describes one animation of one attribute.
///
/// Preloadable animators are evaluated by the rendering backend (e.g. a
/// vertex shader) from a `{start, end, startTime, endTime}` segment rather
/// than on the CPU each tick.
#[derive(Debug, Clone)]
pub struct Animator {
    interpolator: Interpolator,
    duration: f64,
    curve: EasingFunction,
    preloadable: bool,
}

impl Animator {
    /// Linear-time animation over `duration_ms`.
    #[must_use]
    pub fn new(interpolator: Interpolator, duration_ms: f64) -> Self {
        Self {
            interpolator,
            duration: duration_ms.max(0.0),
            curve: EasingFunction::Linear,
            preloadable: false,
        }
    }

    /// Zero-duration animation that resolves immediately.
    #[must_use]
    pub fn immediate(final_value: impl Into<Value>) -> Self {
        Self::new(Interpolator::to(final_value), 0.0)
    }

    /// Shader-delegated ease-in-out animation toward `final_value`.
    #[must_use]
    pub fn preloadable(final_value: impl Into<Value>, duration_ms: f64) -> Self {
        Self {
            interpolator: Interpolator::to(final_value),
            duration: duration_ms.max(0.0),
            curve: EasingFunction::EaseInOut,
            preloadable: true,
        }
    }

    /// Replace the easing curve.
    #[must_use]
    pub fn with_curve(mut self, curve: EasingFunction) -> Self {
        self.curve = curve;
        self
    }

    /// Duration in milliseconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Easing curve applied to the time fraction.
    #[must_use]
    pub fn curve(&self) -> EasingFunction {
        self.curve
    }

    /// Whether interpolation is delegated to the rendering backend.
    #[must_use]
    pub fn is_preloadable(&self) -> bool {
        self.preloadable
    }

    /// Final value, when the interpolator knows it.
    #[must_use]
    pub fn final_value(&self) -> Option<&Value> {
        self.interpolator.final_value()
    }

    /// Value `dt` milliseconds after the animation started from `initial`.
    #[must_use]
    pub fn evaluate(&self, initial: &Value, dt: f64) -> Value {
        let raw_t = if self.duration > 0.0 {
            dt / self.duration
        } else {
            1.0
        };
        self.interpolator
            .interpolate(initial, self.curve.evaluate(raw_t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_resolves_immediately() {
        let anim = Animator::immediate(7.0);
        assert_eq!(anim.evaluate(&Value::from(1.0), 0.0), Value::from(7.0));
    }

    #[test]
    fn evaluate_uses_time_fraction() {
        let anim = Animator::new(Interpolator::to(15.0), 1000.0);
        assert_eq!(anim.evaluate(&Value::from(5.0), 500.0), Value::from(10.0));
        assert_eq!(anim.evaluate(&Value::from(5.0), 1000.0), Value::from(15.0));
    }

    #[test]
    fn preloadable_uses_ease_in_out() {
        let anim = Animator::preloadable(10.0, 100.0);
        assert!(anim.is_preloadable());
        assert_eq!(anim.curve(), EasingFunction::EaseInOut);
        let quarter = anim.evaluate(&Value::from(0.0), 25.0).number_or(0.0);
        assert!(quarter < 2.5);
        assert_eq!(anim.final_value(), Some(&Value::from(10.0)));
    }
}
