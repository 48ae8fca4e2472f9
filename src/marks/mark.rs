//! One visual point and its named attributes.

use rustc_hash::FxHashMap;

use super::attribute::Attribute;
use crate::animation::{Animator, Clock};
use crate::value::Value;

/// Stable identity of a data point across frames.
pub type PointId = i64;

/// Attribute owned by a mark. Compute functions receive the mark's ID.
pub type MarkAttribute = Attribute<PointId>;

/// Consecutive updating frames after which a mark is reported as runaway.
pub const EXCESSIVE_UPDATE_THRESHOLD: u32 = 5000;

/// A scatterplot point: a fixed set of named attributes.
#[derive(Debug)]
pub struct Mark {
    id: PointId,
    attributes: FxHashMap<String, MarkAttribute>,
    frames_with_update: u32,
    runaway_reports: u32,
}

impl Mark {
    /// Mark with the given attributes. Names are fixed from here on.
    pub fn new<N, I>(id: PointId, attributes: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, MarkAttribute)>,
    {
        Self {
            id,
            attributes: attributes
                .into_iter()
                .map(|(name, attr)| (name.into(), attr))
                .collect(),
            frames_with_update: 0,
            runaway_reports: 0,
        }
    }

    /// Point ID.
    #[must_use]
    pub fn id(&self) -> PointId {
        self.id
    }

    /// Whether the mark has an attribute called `name`.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Attribute names, in no particular order.
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Borrow an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&MarkAttribute> {
        self.attributes.get(name)
    }

    /// Mutably borrow an attribute.
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut MarkAttribute> {
        self.attributes.get_mut(name)
    }

    /// Share `clock` with every attribute.
    pub fn set_clock(&mut self, clock: &Clock) {
        for attr in self.attributes.values_mut() {
            attr.set_clock(clock.clone());
        }
    }

    /// Evaluate every computed attribute once.
    pub fn compute_all(&mut self) {
        let id = self.id;
        for attr in self.attributes.values_mut() {
            attr.compute(&id);
        }
    }

    /// Advance every attribute; `true` if any of them needs a redraw.
    pub fn advance(&mut self, dt: f64) -> bool {
        let id = self.id;
        let mut updated = false;
        for attr in self.attributes.values_mut() {
            updated |= attr.advance(dt, &id);
        }
        if updated {
            self.frames_with_update = self.frames_with_update.saturating_add(1);
            if self.frames_with_update == EXCESSIVE_UPDATE_THRESHOLD + 1 {
                self.runaway_reports += 1;
                log::warn!(
                    "mark {} has updated for {} consecutive frames",
                    self.id,
                    EXCESSIVE_UPDATE_THRESHOLD
                );
            }
            return true;
        }
        self.frames_with_update = 0;
        false
    }

    /// Consecutive advances that reported an update.
    #[must_use]
    pub fn updating_frames(&self) -> u32 {
        self.frames_with_update
    }

    /// Whether the current update streak is past
    /// [`EXCESSIVE_UPDATE_THRESHOLD`].
    #[must_use]
    pub fn is_runaway(&self) -> bool {
        self.frames_with_update > EXCESSIVE_UPDATE_THRESHOLD
    }

    /// How many update streaks crossed the threshold and were logged.
    #[must_use]
    pub fn runaway_reports(&self) -> u32 {
        self.runaway_reports
    }

    /// Transformed value of `name`, or `None` for unknown attributes.
    pub fn attr(&mut self, name: &str) -> Option<Value> {
        self.attr_with(name, true)
    }

    /// Value of `name`, transformed or raw.
    pub fn attr_with(&mut self, name: &str, transform: bool) -> Option<Value> {
        let id = self.id;
        self.attributes
            .get_mut(name)
            .map(|attr| attr.get(&id, transform))
    }

    /// Side-effect-free transformed read of `name`.
    #[must_use]
    pub fn peek(&self, name: &str) -> Option<Value> {
        self.attributes
            .get(name)
            .map(|attr| attr.peek(&self.id, true))
    }

    /// Un-animated source value of `name`.
    #[must_use]
    pub fn data(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).map(|attr| attr.data(&self.id))
    }

    /// Last rendered value of `name`.
    pub fn last(&mut self, name: &str) -> Option<Value> {
        let id = self.id;
        self.attributes.get_mut(name).map(|attr| attr.last(&id))
    }

    /// Animation target of `name`, or its last value when idle.
    pub fn future(&mut self, name: &str) -> Option<Value> {
        let id = self.id;
        self.attributes.get_mut(name).map(|attr| attr.future(&id))
    }

    /// Set a literal value. Returns `false` (and logs) for unknown names.
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.attributes.get_mut(name) {
            Some(attr) => {
                attr.set(value);
                true
            }
            None => {
                log::error!("mark {}: cannot set unknown attribute {name}", self.id);
                false
            }
        }
    }

    /// Switch `name` to a computed source.
    pub fn set_attr_fn(
        &mut self,
        name: &str,
        f: impl Fn(&PointId) -> Value + 'static,
    ) -> bool {
        match self.attributes.get_mut(name) {
            Some(attr) => {
                attr.set_fn(f);
                true
            }
            None => {
                log::error!("mark {}: cannot set unknown attribute {name}", self.id);
                false
            }
        }
    }

    /// Start an animation. Returns `false` (and logs) for unknown names.
    pub fn animate(&mut self, name: &str, animator: Animator) -> bool {
        let id = self.id;
        match self.attributes.get_mut(name) {
            Some(attr) => {
                attr.animate(animator, &id);
                true
            }
            None => {
                log::error!(
                    "mark {id}: attempting to animate undefined attribute {name}"
                );
                false
            }
        }
    }

    /// Re-evaluate one computed attribute.
    pub fn compute(&mut self, name: &str) {
        let id = self.id;
        if let Some(attr) = self.attributes.get_mut(name) {
            attr.compute(&id);
        }
    }

    /// Drop the memoized transform of `name`.
    pub fn update_transform(&mut self, name: &str) {
        if let Some(attr) = self.attributes.get_mut(name) {
            attr.update_transform();
        }
    }

    /// Whether any attribute has an animation in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.attributes.values().any(Attribute::is_animating)
    }
}
