//! Time-based animation primitives.
//!
//! - [`EasingFunction`] shapes the time fraction.
//! - [`Interpolator`] maps `(initial value, fraction)` to a value.
//! - [`Animator`] pairs an interpolator with a duration and curve.
//! - [`Clock`] is the shared millisecond time base of a mark set.
//! - [`AnimationPool`] runs enter/exit lifecycles of pooled elements.

pub mod animator;
pub mod clock;
pub mod easing;
pub mod interpolation;
pub mod pool;

pub use animator::{Animator, DEFAULT_DURATION_MS};
pub use clock::Clock;
pub use easing::EasingFunction;
pub use interpolation::Interpolator;
pub use pool::{
    AnimationPool, PoolCallbacks, PoolEntry, PoolState, Settled, Settlement,
    TransitionToken,
};
