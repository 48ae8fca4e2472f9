//! Interpolation strategies for attribute animation.
//!
//! An interpolator maps `(initial value, eased fraction)` to a value. Only
//! numbers interpolate; any other value snaps to the final value.

use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// Final value read at every evaluation, for targets that keep moving.
pub type FinalValueFn = Rc<dyn Fn() -> f64>;

/// Arbitrary interpolation `(initial, t) -> value`.
pub type InterpolateFn = Rc<dyn Fn(&Value, f64) -> Value>;

/// How an animated attribute moves from its starting value.
#[derive(Clone)]
pub enum Interpolator {
    /// Linear path to a fixed final value.
    To(Value),
    /// Linear path to a final value that may change while animating.
    ToFunction(FinalValueFn),
    /// Piecewise-linear path through the given waypoints, starting from
    /// the initial value.
    AlongPath(Vec<f64>),
    /// Caller-supplied interpolation.
    Custom(InterpolateFn),
}

impl Interpolator {
    /// Linear interpolation toward `final_value`.
    pub fn to(final_value: impl Into<Value>) -> Self {
        Self::To(final_value.into())
    }

    /// Interpolation toward a target that is re-read on every evaluation.
    pub fn to_function(final_value: impl Fn() -> f64 + 'static) -> Self {
        Self::ToFunction(Rc::new(final_value))
    }

    /// Interpolation along a sequence of waypoints.
    #[must_use]
    pub fn along_path(path: Vec<f64>) -> Self {
        Self::AlongPath(path)
    }

    /// Custom interpolation function.
    pub fn custom(f: impl Fn(&Value, f64) -> Value + 'static) -> Self {
        Self::Custom(Rc::new(f))
    }

    /// The value this interpolation ends at, when it is known up front.
    #[must_use]
    pub fn final_value(&self) -> Option<&Value> {
        match self {
            Self::To(v) => Some(v),
            _ => None,
        }
    }

    /// Evaluate at eased fraction `t` starting from `initial`.
    #[must_use]
    pub fn interpolate(&self, initial: &Value, t: f64) -> Value {
        let t = t.min(1.0);
        match self {
            Self::To(target) => match (initial, target) {
                (Value::Number(a), Value::Number(b)) => {
                    Value::Number(lerp_f64(t, *a, *b))
                }
                _ => target.clone(),
            },
            Self::ToFunction(target) => {
                let b = target();
                match initial {
                    Value::Number(a) => Value::Number(lerp_f64(t, *a, b)),
                    _ => Value::Number(b),
                }
            }
            Self::AlongPath(path) => interpolate_path(initial, path, t),
            Self::Custom(f) => f(initial, t),
        }
    }
}

impl fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::To(v) => f.debug_tuple("To").field(v).finish(),
            Self::ToFunction(_) => f.write_str("ToFunction(..)"),
            Self::AlongPath(path) => {
                f.debug_tuple("AlongPath").field(&path.len()).finish()
            }
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Lerp two f64 values.
#[inline]
#[must_use]
pub fn lerp_f64(t: f64, start: f64, end: f64) -> f64 {
    start * (1.0 - t) + end * t
}

/// The initial value is the first waypoint; `path` supplies the rest, each
/// segment taking an equal share of the animation.
fn interpolate_path(initial: &Value, path: &[f64], t: f64) -> Value {
    let Some(&last) = path.last() else {
        return initial.clone();
    };
    let Some(start) = initial.as_f64() else {
        return Value::Number(last);
    };
    if t <= 0.0 {
        return Value::Number(start);
    }
    if t >= 1.0 {
        return Value::Number(last);
    }
    let scaled = t * path.len() as f64;
    let segment = scaled.floor() as usize;
    let local_t = scaled - segment as f64;
    let from = if segment == 0 { start } else { path[segment - 1] };
    Value::Number(lerp_f64(local_t, from, path[segment]))
}
