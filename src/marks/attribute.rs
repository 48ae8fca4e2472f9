//! A single animatable property.
//!
//! An [`Attribute`] holds either a literal value or a compute function over
//! its owner's context `C`, an optional output transform, and at most one
//! in-flight animation. Time is taken from a shared [`Clock`] when one is
//! attached, otherwise from the `dt` passed to [`Attribute::advance`].

use std::fmt;
use std::rc::Rc;

use crate::animation::{Animator, Clock};
use crate::value::{approx_equals, Value};

/// Animations within this many milliseconds of their end are completed
/// on the current tick.
pub const COMPLETION_EPSILON_MS: f64 = 20.0;

/// Compute function for a derived attribute.
pub type ValueFn<C> = Rc<dyn Fn(&C) -> Value>;

/// Post-processing applied to a raw value before rendering.
pub type TransformFn = Rc<dyn Fn(&Value) -> Value>;

/// Where an attribute's un-animated value comes from.
pub enum Source<C: ?Sized> {
    /// Stored literal.
    Literal(Value),
    /// Derived from the owner on demand.
    Computed(ValueFn<C>),
}

impl<C: ?Sized> Clone for Source<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Literal(v) => Self::Literal(v.clone()),
            Self::Computed(f) => Self::Computed(Rc::clone(f)),
        }
    }
}

/// Linear animation segment handed to a rendering backend.
///
/// With no animation in flight, `start == end` and
/// `start_time == end_time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Preload {
    /// Value at `start_time`.
    pub start: Value,
    /// Value at `end_time`.
    pub end: Value,
    /// Animation start, in the caller's time base (ms).
    pub start_time: f64,
    /// Animation end, in the caller's time base (ms).
    pub end_time: f64,
}

#[derive(Debug, Clone)]
struct Animation {
    animator: Animator,
    start: f64,
}

/// An animatable value owned by a mark or decoration.
pub struct Attribute<C: ?Sized> {
    source: Source<C>,
    transform: Option<TransformFn>,
    cached: bool,
    /// `(raw, transformed)` from the last transform call.
    transform_cache: Option<(Value, Value)>,
    lazy: bool,
    precompute: bool,
    has_computed: bool,
    needs_update: bool,
    animation: Option<Animation>,
    /// Value of the in-flight animation at `current_time`.
    getter_value: Option<Value>,
    /// Last evaluated compute result; the interpolation anchor for
    /// computed attributes.
    computed_last: Value,
    current_time: f64,
    clock: Option<Clock>,
}

impl<C: ?Sized> Attribute<C> {
    /// Attribute holding a literal value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::with_source(Source::Literal(value.into()))
    }

    /// Attribute derived from its owner.
    pub fn computed(f: impl Fn(&C) -> Value + 'static) -> Self {
        Self::with_source(Source::Computed(Rc::new(f)))
    }

    /// Attribute with an explicit source.
    #[must_use]
    pub fn with_source(source: Source<C>) -> Self {
        Self {
            source,
            transform: None,
            cached: false,
            transform_cache: None,
            lazy: false,
            precompute: false,
            has_computed: false,
            needs_update: false,
            animation: None,
            getter_value: None,
            computed_last: Value::Null,
            current_time: 0.0,
            clock: None,
        }
    }

    /// Apply `transform` to values read with `transform = true`.
    #[must_use]
    pub fn with_transform(
        mut self,
        transform: impl Fn(&Value) -> Value + 'static,
    ) -> Self {
        self.transform = Some(Rc::new(transform));
        self
    }

    /// Memoize the transform against the last raw input.
    #[must_use]
    pub fn cached(mut self) -> Self {
        self.cached = true;
        self
    }

    /// Evaluate the compute function only once, until [`Self::compute`].
    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Recompute on every idle [`Self::advance`].
    #[must_use]
    pub fn precompute(mut self) -> Self {
        self.precompute = true;
        self
    }

    /// Attach a shared clock. Time then follows the clock instead of `dt`.
    pub fn set_clock(&mut self, clock: Clock) {
        self.current_time = clock.now();
        self.clock = Some(clock);
    }

    /// Attribute-local time in milliseconds.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Whether an animation is in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Whether the current animation is shader-delegated.
    #[must_use]
    pub fn is_preloading(&self) -> bool {
        self.animation
            .as_ref()
            .is_some_and(|a| a.animator.is_preloadable())
    }

    /// Whether the value is derived from a compute function.
    #[must_use]
    pub fn is_computed(&self) -> bool {
        matches!(self.source, Source::Computed(_))
    }

    /// Current source.
    #[must_use]
    pub fn source(&self) -> &Source<C> {
        &self.source
    }

    /// Re-evaluate the compute function and store it as the last value.
    pub fn compute(&mut self, arg: &C) {
        if let Source::Computed(f) = &self.source {
            self.computed_last = f(arg);
        }
    }

    /// Switch to a literal value.
    pub fn set(&mut self, value: impl Into<Value>) {
        self.source = Source::Literal(value.into());
        self.getter_value = None;
        self.needs_update = true;
    }

    /// Switch to a compute function. A previous literal becomes the
    /// interpolation anchor for any in-flight animation.
    pub fn set_fn(&mut self, f: impl Fn(&C) -> Value + 'static) {
        self.set_source(Source::Computed(Rc::new(f)));
    }

    /// Replace the source.
    pub fn set_source(&mut self, source: Source<C>) {
        if let (Source::Literal(old), Source::Computed(_)) =
            (&self.source, &source)
        {
            if !old.is_null() {
                self.computed_last = old.clone();
            }
        }
        self.source = source;
        self.getter_value = None;
        self.needs_update = true;
    }

    /// Un-animated value of the source.
    #[must_use]
    pub fn data(&self, arg: &C) -> Value {
        match &self.source {
            Source::Literal(v) => v.clone(),
            Source::Computed(f) => f(arg),
        }
    }

    /// Current value, applying the transform when `transform` is set.
    pub fn get(&mut self, arg: &C, transform: bool) -> Value {
        self.compute_animation(arg, true);

        let value = if let Some(v) = &self.getter_value {
            v.clone()
        } else {
            self.base_value(arg)
        };

        if transform {
            self.apply_transform(value)
        } else {
            value
        }
    }

    /// Side-effect-free read at the clock's current time.
    ///
    /// Used when another object reads this attribute through a shared
    /// borrow; the transform is applied without touching its cache.
    #[must_use]
    pub fn peek(&self, arg: &C, transform: bool) -> Value {
        let value = match &self.animation {
            Some(animation) => {
                let now =
                    self.clock.as_ref().map_or(self.current_time, Clock::now);
                let duration = animation.animator.duration();
                let elapsed = now - animation.start;
                let elapsed = if duration - COMPLETION_EPSILON_MS <= elapsed {
                    duration
                } else {
                    elapsed.min(duration)
                };
                animation.animator.evaluate(self.anchor(), elapsed)
            }
            None => match &self.source {
                Source::Literal(v) => v.clone(),
                Source::Computed(f) => {
                    if self.lazy && self.has_computed {
                        self.computed_last.clone()
                    } else {
                        f(arg)
                    }
                }
            },
        };
        match (&self.transform, transform) {
            (Some(t), true) => t(&value),
            _ => value,
        }
    }

    /// Segment describing the in-flight animation for shader-side
    /// interpolation.
    ///
    /// `current_time` re-bases the returned times onto the caller's clock.
    /// Returns `None` (and logs an error) when the in-flight animation is
    /// not preloadable.
    pub fn get_preload(
        &mut self,
        arg: &C,
        transform: bool,
        current_time: Option<f64>,
    ) -> Option<Preload> {
        self.sync_clock();

        let finished = self.animation_finished();
        match &self.animation {
            None => {
                let value = self.get(arg, transform);
                let at = current_time.unwrap_or(self.current_time);
                return Some(Preload {
                    start: value.clone(),
                    end: value,
                    start_time: at,
                    end_time: at,
                });
            }
            Some(animation) if !animation.animator.is_preloadable() => {
                log::error!(
                    "get_preload called on a non-preloadable animation; \
                     register the attribute as preloadable"
                );
                return None;
            }
            Some(_) if finished => {
                self.compute_animation(arg, true);
                return self.get_preload(arg, transform, current_time);
            }
            Some(_) => {}
        }

        let start = self.base_value(arg);
        let (end, start_time, duration) = match &self.animation {
            Some(animation) => (
                animation.animator.final_value().cloned().unwrap_or_default(),
                animation.start,
                animation.animator.duration(),
            ),
            None => return None,
        };
        let (start, end) = if transform {
            (self.apply_transform(start), self.apply_transform(end))
        } else {
            (start, end)
        };

        let delta = current_time.unwrap_or(self.current_time) - self.current_time;
        Some(Preload {
            start,
            end,
            start_time: start_time + delta,
            end_time: start_time + duration + delta,
        })
    }

    /// Last rendered value, without recomputing the source.
    pub fn last(&mut self, arg: &C) -> Value {
        if self.animation.is_some() {
            self.compute_animation(arg, false);
        }
        if let Some(v) = &self.getter_value {
            return v.clone();
        }
        self.anchor().clone()
    }

    /// Target of the in-flight animation, or [`Self::last`] when idle.
    ///
    /// `Null` when animating toward a target that is not known up front.
    pub fn future(&mut self, arg: &C) -> Value {
        match &self.animation {
            Some(animation) => {
                animation.animator.final_value().cloned().unwrap_or_default()
            }
            None => self.last(arg),
        }
    }

    /// Drop the memoized transform result.
    pub fn update_transform(&mut self) {
        self.transform_cache = None;
    }

    /// Start `animator` from the current effective value.
    pub fn animate(&mut self, animator: Animator, arg: &C) {
        self.sync_clock();

        if self.animation.is_some() {
            let current = self.last(arg);
            match &mut self.source {
                Source::Literal(v) => *v = current,
                Source::Computed(_) => self.computed_last = current,
            }
        }

        self.animation = Some(Animation {
            animator,
            start: self.current_time,
        });
        self.compute_animation(arg, true);
    }

    /// Advance time by `dt` milliseconds (or to the clock's time) and
    /// report whether a redraw is warranted.
    pub fn advance(&mut self, dt: f64, arg: &C) -> bool {
        if self.animation.is_some() || self.needs_update || self.is_computed() {
            match &self.clock {
                Some(clock) => self.current_time = clock.now(),
                None => self.current_time += dt,
            }
        }

        if self.animation_finished() {
            self.compute_animation(arg, true);
        }
        if self.animation.is_some() || self.needs_update {
            self.needs_update = false;
            return true;
        }
        if self.precompute {
            self.compute(arg);
        }
        false
    }

    fn sync_clock(&mut self) {
        if let Some(clock) = &self.clock {
            self.current_time = clock.now();
        }
    }

    fn anchor(&self) -> &Value {
        match &self.source {
            Source::Literal(v) => v,
            Source::Computed(_) => &self.computed_last,
        }
    }

    fn base_value(&mut self, arg: &C) -> Value {
        match &self.source {
            Source::Literal(v) => v.clone(),
            Source::Computed(_) => {
                if !self.lazy || !self.has_computed {
                    self.compute(arg);
                    self.has_computed = true;
                }
                self.computed_last.clone()
            }
        }
    }

    fn animation_finished(&self) -> bool {
        self.animation.as_ref().is_none_or(|a| {
            a.animator.duration() - COMPLETION_EPSILON_MS
                <= self.current_time - a.start
        })
    }

    fn compute_animation(&mut self, arg: &C, complete: bool) {
        self.sync_clock();
        let Some(animation) = &self.animation else {
            return;
        };
        let duration = animation.animator.duration();
        let finished = self.animation_finished();
        // A finished animation lands exactly on its end value.
        let elapsed = if finished {
            duration
        } else {
            (self.current_time - animation.start).min(duration)
        };
        let value = animation.animator.evaluate(self.anchor(), elapsed);

        if complete && finished {
            match &mut self.source {
                Source::Literal(v) => *v = value,
                Source::Computed(_) => self.compute(arg),
            }
            self.animation = None;
            self.getter_value = None;
        } else {
            self.getter_value = Some(value);
        }
    }

    fn apply_transform(&mut self, value: Value) -> Value {
        let Some(transform) = &self.transform else {
            return value;
        };
        if let Some((raw, result)) = &self.transform_cache {
            if approx_equals(raw, &value) {
                return result.clone();
            }
        }
        let result = transform(&value);
        if self.cached {
            self.transform_cache = Some((value, result.clone()));
        }
        result
    }
}

impl<C: ?Sized> fmt::Debug for Attribute<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Literal(v) => format!("Literal({v:?})"),
            Source::Computed(_) => "Computed(..)".to_owned(),
        };
        f.debug_struct("Attribute")
            .field("source", &source)
            .field("animation", &self.animation)
            .field("current_time", &self.current_time)
            .finish_non_exhaustive()
    }
}

impl<C: ?Sized> From<Value> for Attribute<C> {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl<C: ?Sized> From<f64> for Attribute<C> {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl<C: ?Sized> From<&str> for Attribute<C> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<C: ?Sized> From<bool> for Attribute<C> {
    fn from(value: bool) -> Self {
        Self::new(value)
    }
}
