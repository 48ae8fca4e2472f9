//! Annotations drawn on top of one or two marks.
//!
//! A decoration refers to its marks by [`PointId`] only. Reads go through a
//! [`MarkLookup`], normally the owning [`MarkSet`](super::MarkSet)'s mark
//! table, so positional defaults follow the marks without any explicit
//! propagation and a removed mark reads as `Null`.

use rustc_hash::FxHashMap;

use super::attribute::Attribute;
use super::mark::PointId;
use crate::animation::{Animator, Clock};
use crate::value::Value;

/// Read access to mark attributes for decoration compute functions.
pub trait MarkLookup {
    /// Transformed value of attribute `name` on mark `id`, or `Null`.
    fn mark_attr(&self, id: PointId, name: &str) -> Value;
}

/// The mark table as seen by decoration compute functions.
pub type Lookup = dyn MarkLookup;

/// Attribute owned by a decoration.
pub type DecorationAttribute = Attribute<Lookup>;

/// What a decoration draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationKind {
    /// Ring around one mark (`x, y, r, lineWidth, color, alpha`).
    Outline,
    /// Segment between two marks (`x, y, x2, y2, lineWidth, color, alpha`).
    Line,
    /// Label next to one mark (`x, y, text, font, alpha`).
    Text,
    /// Image anchored at one mark.
    Image,
}

/// A visual element bound to one or two marks.
#[derive(Debug)]
pub struct Decoration {
    kind: DecorationKind,
    marks: Vec<PointId>,
    attributes: FxHashMap<String, DecorationAttribute>,
}

impl Decoration {
    /// New decoration over `marks`.
    ///
    /// `x`/`y` (and `x2`/`y2` with two marks) default to the bound marks'
    /// positions and `alpha` to 1.0; entries in `attributes` win.
    pub fn new<N, I>(
        kind: DecorationKind,
        marks: Vec<PointId>,
        attributes: I,
    ) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, DecorationAttribute)>,
    {
        let mut attributes: FxHashMap<String, DecorationAttribute> = attributes
            .into_iter()
            .map(|(name, attr)| (name.into(), attr))
            .collect();

        if let Some(&first) = marks.first() {
            insert_default(&mut attributes, "x", follow(first, "x"));
            insert_default(&mut attributes, "y", follow(first, "y"));
        }
        if let Some(&second) = marks.get(1) {
            insert_default(&mut attributes, "x2", follow(second, "x"));
            insert_default(&mut attributes, "y2", follow(second, "y"));
        }
        insert_default(&mut attributes, "alpha", DecorationAttribute::new(1.0));

        Self {
            kind,
            marks,
            attributes,
        }
    }

    /// Decoration kind.
    #[must_use]
    pub fn kind(&self) -> DecorationKind {
        self.kind
    }

    /// Bound marks, in order.
    #[must_use]
    pub fn marks(&self) -> &[PointId] {
        &self.marks
    }

    /// Whether the decoration has an attribute called `name`.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Borrow an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&DecorationAttribute> {
        self.attributes.get(name)
    }

    /// Share `clock` with every attribute.
    pub fn set_clock(&mut self, clock: &Clock) {
        for attr in self.attributes.values_mut() {
            attr.set_clock(clock.clone());
        }
    }

    /// Evaluate every computed attribute once.
    pub fn compute_all(&mut self, lookup: &Lookup) {
        for attr in self.attributes.values_mut() {
            attr.compute(lookup);
        }
    }

    /// Advance every attribute; `true` if any of them needs a redraw.
    pub fn advance(&mut self, dt: f64, lookup: &Lookup) -> bool {
        let mut updated = false;
        for attr in self.attributes.values_mut() {
            updated |= attr.advance(dt, lookup);
        }
        updated
    }

    /// Current value of `name`, or `None` for unknown attributes.
    pub fn attr(&mut self, name: &str, lookup: &Lookup) -> Option<Value> {
        self.attributes
            .get_mut(name)
            .map(|attr| attr.get(lookup, true))
    }

    /// Un-animated source value of `name`.
    #[must_use]
    pub fn data(&self, name: &str, lookup: &Lookup) -> Option<Value> {
        self.attributes.get(name).map(|attr| attr.data(lookup))
    }

    /// Last rendered value of `name`.
    pub fn last(&mut self, name: &str, lookup: &Lookup) -> Option<Value> {
        self.attributes.get_mut(name).map(|attr| attr.last(lookup))
    }

    /// Animation target of `name`, or its last value when idle.
    pub fn future(&mut self, name: &str, lookup: &Lookup) -> Option<Value> {
        self.attributes.get_mut(name).map(|attr| attr.future(lookup))
    }

    /// Set a literal value.
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.attributes.get_mut(name) {
            Some(attr) => {
                attr.set(value);
                true
            }
            None => {
                log::error!("{:?} decoration: unknown attribute {name}", self.kind);
                false
            }
        }
    }

    /// Switch `name` to a computed source.
    pub fn set_attr_fn(
        &mut self,
        name: &str,
        f: impl Fn(&Lookup) -> Value + 'static,
    ) -> bool {
        match self.attributes.get_mut(name) {
            Some(attr) => {
                attr.set_fn(f);
                true
            }
            None => {
                log::error!("{:?} decoration: unknown attribute {name}", self.kind);
                false
            }
        }
    }

    /// Start an animation. Returns `false` (and logs) for unknown names.
    pub fn animate(
        &mut self,
        name: &str,
        animator: Animator,
        lookup: &Lookup,
    ) -> bool {
        match self.attributes.get_mut(name) {
            Some(attr) => {
                attr.animate(animator, lookup);
                true
            }
            None => {
                log::error!(
                    "{:?} decoration: attempting to animate undefined attribute {name}",
                    self.kind
                );
                false
            }
        }
    }

    /// Whether any attribute has an animation in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.attributes.values().any(Attribute::is_animating)
    }
}

/// Computed attribute reading `name` from mark `id`.
#[must_use]
pub fn follow(id: PointId, name: &'static str) -> DecorationAttribute {
    DecorationAttribute::computed(move |lookup: &Lookup| {
        lookup.mark_attr(id, name)
    })
}

fn insert_default(
    attributes: &mut FxHashMap<String, DecorationAttribute>,
    name: &str,
    attr: DecorationAttribute,
) {
    if !attributes.contains_key(name) {
        let _ = attributes.insert(name.to_owned(), attr);
    }
}
