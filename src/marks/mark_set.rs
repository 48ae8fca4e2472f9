//! Orchestration over a collection of marks and decorations.
//!
//! [`MarkSet`] keeps two pieces of dirty state that a render loop polls:
//! which marks changed since the last tick (buffers need re-upload) and
//! which marks or decorations are still animating (keep ticking at full
//! rate). Bulk operations respect an optional visible-subset filter so
//! off-screen points cost nothing.

use rustc_hash::{FxHashMap, FxHashSet};

use super::decoration::{Decoration, Lookup, MarkLookup};
use super::mark::{Mark, PointId};
use crate::animation::{Animator, Clock, EasingFunction, Interpolator};
use crate::value::{approx_equals, Value};

/// Handle to a decoration registered with a [`MarkSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorationId(u64);

/// Marks indexed by point ID.
#[derive(Debug, Default)]
pub struct MarkTable {
    marks: Vec<Mark>,
    by_id: FxHashMap<PointId, usize>,
}

impl MarkTable {
    fn new(marks: Vec<Mark>) -> Self {
        let by_id = marks
            .iter()
            .enumerate()
            .map(|(row, mark)| (mark.id(), row))
            .collect();
        Self { marks, by_id }
    }

    /// Row of the mark with `id`.
    #[must_use]
    pub fn row(&self, id: PointId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Mark with `id`.
    #[must_use]
    pub fn get(&self, id: PointId) -> Option<&Mark> {
        self.row(id).map(|row| &self.marks[row])
    }

    /// All marks in construction order.
    #[must_use]
    pub fn as_slice(&self) -> &[Mark] {
        &self.marks
    }
}

impl MarkLookup for MarkTable {
    fn mark_attr(&self, id: PointId, name: &str) -> Value {
        self.get(id)
            .and_then(|mark| mark.peek(name))
            .unwrap_or_default()
    }
}

/// A set of marks, their decorations, and animation bookkeeping.
#[derive(Debug)]
pub struct MarkSet {
    table: MarkTable,
    decorations: FxHashMap<DecorationId, Decoration>,
    decoration_order: Vec<DecorationId>,
    decorations_by_mark: FxHashMap<PointId, FxHashSet<DecorationId>>,
    next_decoration: u64,
    animating_marks: FxHashSet<usize>,
    animating_decorations: FxHashSet<DecorationId>,
    updated_marks: FxHashSet<usize>,
    preloadable: FxHashSet<String>,
    visible: Option<Vec<usize>>,
    visible_changed: bool,
    clock: Clock,
}

impl MarkSet {
    /// Take ownership of `marks`, attach a shared clock, and evaluate every
    /// computed attribute once so animations have a starting point.
    #[must_use]
    pub fn new(mut marks: Vec<Mark>) -> Self {
        let clock = Clock::new();
        for mark in &mut marks {
            mark.set_clock(&clock);
            mark.compute_all();
        }
        Self {
            table: MarkTable::new(marks),
            decorations: FxHashMap::default(),
            decoration_order: Vec::new(),
            decorations_by_mark: FxHashMap::default(),
            next_decoration: 0,
            animating_marks: FxHashSet::default(),
            animating_decorations: FxHashSet::default(),
            updated_marks: FxHashSet::default(),
            preloadable: FxHashSet::default(),
            visible: None,
            visible_changed: false,
            clock,
        }
    }

    /// Shared clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Number of marks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.marks.len()
    }

    /// Whether the set holds no marks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.marks.is_empty()
    }

    /// All marks in construction order.
    #[must_use]
    pub fn marks(&self) -> &[Mark] {
        &self.table.marks
    }

    /// The mark table decorations read from.
    #[must_use]
    pub fn table(&self) -> &MarkTable {
        &self.table
    }

    /// Mark with `id`.
    #[must_use]
    pub fn mark_by_id(&self, id: PointId) -> Option<&Mark> {
        self.table.get(id)
    }

    /// Mutable mark with `id`. Changes made through this handle are not
    /// tracked; prefer the bulk operations.
    pub fn mark_by_id_mut(&mut self, id: PointId) -> Option<&mut Mark> {
        let row = self.table.row(id)?;
        Some(&mut self.table.marks[row])
    }

    /// Row index of the mark with `id`.
    #[must_use]
    pub fn index_of(&self, id: PointId) -> Option<usize> {
        self.table.row(id)
    }

    /// Current transformed value of `name` on mark `id`.
    pub fn mark_attr(&mut self, id: PointId, name: &str) -> Option<Value> {
        let row = self.table.row(id)?;
        self.table.marks[row].attr(name)
    }

    // -- Preloadable properties --

    /// Declare that `name` is only ever animated on the GPU.
    ///
    /// Preloadable attributes never enter the CPU animating set, so they do
    /// not keep the render loop at full rate.
    pub fn register_preloadable_property(&mut self, name: impl Into<String>) {
        let _ = self.preloadable.insert(name.into());
    }

    /// Whether `name` was registered as preloadable.
    #[must_use]
    pub fn is_preloadable(&self, name: &str) -> bool {
        self.preloadable.contains(name)
    }

    // -- Visibility filter --

    /// Restrict bulk operations to `ids`. An empty set clears the filter.
    /// Unknown IDs are ignored.
    pub fn set_visible_marks<I: IntoIterator<Item = PointId>>(&mut self, ids: I) {
        let rows: Vec<usize> =
            ids.into_iter().filter_map(|id| self.table.row(id)).collect();
        self.visible = if rows.is_empty() { None } else { Some(rows) };
        self.visible_changed = true;
    }

    /// Marks bulk operations apply to.
    pub fn visible_marks(&self) -> impl Iterator<Item = &Mark> + '_ {
        self.visible_rows().into_iter().map(|row| &self.table.marks[row])
    }

    fn visible_rows(&self) -> Vec<usize> {
        match &self.visible {
            Some(rows) => rows.clone(),
            None => (0..self.table.marks.len()).collect(),
        }
    }

    // -- Dirty state --

    /// Whether any mark changed since the last [`Self::advance`]. Must be
    /// queried before `advance`, which resets it.
    #[must_use]
    pub fn marks_changed(&self) -> bool {
        !self.updated_marks.is_empty() || self.visible_changed
    }

    /// Whether any mark is animating on the CPU.
    #[must_use]
    pub fn marks_animating(&self) -> bool {
        !self.animating_marks.is_empty()
    }

    /// Number of marks animating on the CPU.
    #[must_use]
    pub fn animating_mark_count(&self) -> usize {
        self.animating_marks.len()
    }

    /// Whether any directly animated decoration is still moving.
    #[must_use]
    pub fn decorations_animating(&self) -> bool {
        !self.animating_decorations.is_empty()
    }

    /// Advance the clock and every animating mark and decoration by `dt`
    /// milliseconds.
    ///
    /// Marks advance first; decorations bound to a still-animating mark are
    /// then advanced once each, followed by directly animated decorations
    /// not yet touched this tick. Returns whether any work remains.
    pub fn advance(&mut self, dt: f64) -> bool {
        self.clock.advance(dt);
        self.updated_marks.clear();

        if self.animating_marks.is_empty()
            && self.animating_decorations.is_empty()
            && !self.visible_changed
        {
            return false;
        }

        let mut dependents: FxHashSet<DecorationId> = FxHashSet::default();
        let table = &mut self.table;
        let by_mark = &self.decorations_by_mark;
        self.animating_marks.retain(|&row| {
            let mark = &mut table.marks[row];
            if !mark.advance(dt) {
                return false;
            }
            if let Some(bound) = by_mark.get(&mark.id()) {
                dependents.extend(bound.iter().copied());
            }
            true
        });

        let mut order: Vec<DecorationId> = dependents.iter().copied().collect();
        order.sort_unstable();
        for id in order {
            if let Some(decoration) = self.decorations.get_mut(&id) {
                let _ = decoration.advance(dt, &self.table);
            }
        }

        let decorations = &mut self.decorations;
        let table = &self.table;
        self.animating_decorations.retain(|id| {
            if dependents.contains(id) {
                return true;
            }
            decorations
                .get_mut(id)
                .is_some_and(|decoration| decoration.advance(dt, table))
        });
        // Decorations advanced as dependents stay registered only while
        // they still animate.
        let decorations = &self.decorations;
        self.animating_decorations.retain(|id| {
            !dependents.contains(id)
                || decorations.get(id).is_some_and(Decoration::is_animating)
        });

        self.visible_changed = false;
        self.marks_animating() || self.decorations_animating()
    }

    // -- Bulk animation --

    /// Animate `name` on every visible mark with a per-mark interpolator.
    ///
    /// Refused (with a warning) for preloadable properties.
    pub fn animate_all<F>(
        &mut self,
        name: &str,
        mut interpolator: F,
        duration: f64,
        curve: EasingFunction,
    ) where
        F: FnMut(&Mark, usize) -> Interpolator,
    {
        if self.is_preloadable(name) {
            log::warn!(
                "animate_all called on preloadable property {name}; \
                 use animate_preload or animate_one with a preloadable animator"
            );
            return;
        }
        let rows = self.visible_rows();
        self.animating_marks = rows.iter().copied().collect();
        self.updated_marks = rows.iter().copied().collect();
        for (i, row) in rows.into_iter().enumerate() {
            let interp = interpolator(&self.table.marks[row], i);
            let _ = self.table.marks[row]
                .animate(name, Animator::new(interp, duration).with_curve(curve));
        }
    }

    /// Shader-delegated animation of `name` toward per-mark final values.
    ///
    /// Marks are flagged changed for one tick but never enter the CPU
    /// animating set.
    pub fn animate_preload<F>(
        &mut self,
        name: &str,
        mut final_value: F,
        duration: f64,
    )
    where
        F: FnMut(&Mark, usize) -> Value,
    {
        if !self.is_preloadable(name) {
            log::warn!("animate_preload called on non-preloadable property {name}");
            return;
        }
        let rows = self.visible_rows();
        self.updated_marks = rows.iter().copied().collect();
        for (i, row) in rows.into_iter().enumerate() {
            let target = final_value(&self.table.marks[row], i);
            let _ = self.table.marks[row]
                .animate(name, Animator::preloadable(target, duration));
        }
    }

    /// Animate `name` toward its data-source value on every visible mark
    /// whose last or target value differs from it.
    ///
    /// Repeated calls with unchanged data start no new animations.
    pub fn animate_computed<F>(
        &mut self,
        name: &str,
        interpolator: F,
        duration: f64,
        curve: EasingFunction,
    ) where
        F: Fn(Value) -> Interpolator,
    {
        let preloadable = self.is_preloadable(name);
        for row in self.visible_rows() {
            let mark = &mut self.table.marks[row];
            let Some(new_value) = mark.data(name) else {
                continue;
            };
            let last = mark.last(name).unwrap_or_default();
            let future = mark.future(name).unwrap_or_default();
            if approx_equals(&new_value, &last) && approx_equals(&new_value, &future) {
                continue;
            }
            let animator = if preloadable {
                Animator::preloadable(new_value, duration)
            } else {
                Animator::new(interpolator(new_value), duration).with_curve(curve)
            };
            let _ = mark.animate(name, animator);
            if !preloadable {
                let _ = self.animating_marks.insert(row);
            }
            let _ = self.updated_marks.insert(row);
        }
    }

    /// Re-evaluate computed `name` on every visible mark, flagging marks
    /// whose value moved.
    pub fn update_computed(&mut self, name: &str) {
        for row in self.visible_rows() {
            let mark = &mut self.table.marks[row];
            let old = mark.last(name).unwrap_or_default();
            mark.compute(name);
            let new = mark.data(name).unwrap_or_default();
            if !approx_equals(&old, &new) {
                let _ = self.animating_marks.insert(row);
                let _ = self.updated_marks.insert(row);
            }
        }
    }

    /// Animate `name` on visible marks matching `predicate`.
    pub fn animate_if<P, F>(
        &mut self,
        name: &str,
        mut predicate: P,
        mut interpolator: F,
        duration: f64,
        curve: EasingFunction,
    ) where
        P: FnMut(&Mark, usize) -> bool,
        F: FnMut(&Mark, usize) -> Interpolator,
    {
        for (i, row) in self.visible_rows().into_iter().enumerate() {
            if !predicate(&self.table.marks[row], i) {
                continue;
            }
            let interp = interpolator(&self.table.marks[row], i);
            let _ = self.animating_marks.insert(row);
            let _ = self.updated_marks.insert(row);
            let _ = self.table.marks[row]
                .animate(name, Animator::new(interp, duration).with_curve(curve));
        }
    }

    /// Animate `name` on the mark at row `index`.
    pub fn animate_one(&mut self, index: usize, name: &str, animator: Animator) {
        let Some(mark) = self.table.marks.get_mut(index) else {
            log::warn!("animate_one: no mark at index {index}");
            return;
        };
        let preloadable = animator.is_preloadable();
        if mark.animate(name, animator) {
            if !preloadable {
                let _ = self.animating_marks.insert(index);
            }
            let _ = self.updated_marks.insert(index);
        }
    }

    // -- Immediate writes --

    /// Set `name` on every visible mark.
    pub fn set_all<F>(&mut self, name: &str, mut value: F)
    where
        F: FnMut(&Mark, usize) -> Value,
    {
        let rows = self.visible_rows();
        self.animating_marks = rows.iter().copied().collect();
        self.updated_marks = rows.iter().copied().collect();
        for (i, row) in rows.into_iter().enumerate() {
            let v = value(&self.table.marks[row], i);
            let _ = self.table.marks[row].set_attr(name, v);
        }
    }

    /// Set `name` on visible marks matching `predicate`.
    pub fn set_if<P, F>(&mut self, name: &str, mut predicate: P, mut value: F)
    where
        P: FnMut(&Mark, usize) -> bool,
        F: FnMut(&Mark, usize) -> Value,
    {
        for (i, row) in self.visible_rows().into_iter().enumerate() {
            if !predicate(&self.table.marks[row], i) {
                continue;
            }
            let v = value(&self.table.marks[row], i);
            let _ = self.animating_marks.insert(row);
            let _ = self.updated_marks.insert(row);
            let _ = self.table.marks[row].set_attr(name, v);
        }
    }

    /// Set `name` on the mark at row `index`.
    pub fn set_one(&mut self, index: usize, name: &str, value: impl Into<Value>) {
        let Some(mark) = self.table.marks.get_mut(index) else {
            log::warn!("set_one: no mark at index {index}");
            return;
        };
        if mark.set_attr(name, value) {
            let _ = self.animating_marks.insert(index);
            let _ = self.updated_marks.insert(index);
        }
    }

    /// Drop the memoized transform of `name` on every mark.
    pub fn update_transform(&mut self, name: &str) {
        for mark in &mut self.table.marks {
            mark.update_transform(name);
        }
        self.updated_marks = (0..self.table.marks.len()).collect();
    }

    // -- Iteration over the visible subset --

    /// Call `f` on every visible mark.
    pub fn for_each<F: FnMut(&Mark, usize)>(&self, mut f: F) {
        for (i, mark) in self.visible_marks().enumerate() {
            f(mark, i);
        }
    }

    /// Map every visible mark.
    pub fn map<T, F: FnMut(&Mark, usize) -> T>(&self, mut f: F) -> Vec<T> {
        self.visible_marks()
            .enumerate()
            .map(|(i, mark)| f(mark, i))
            .collect()
    }

    /// Visible marks matching `predicate`.
    pub fn filter<P>(&self, mut predicate: P) -> Vec<&Mark>
    where
        P: FnMut(&Mark, usize) -> bool,
    {
        self.visible_marks()
            .enumerate()
            .filter(|(i, mark)| predicate(mark, *i))
            .map(|(_, mark)| mark)
            .collect()
    }

    /// Fold over the visible marks.
    pub fn reduce<T, F>(&self, init: T, mut f: F) -> T
    where
        F: FnMut(T, &Mark, usize) -> T,
    {
        self.visible_marks()
            .enumerate()
            .fold(init, |acc, (i, mark)| f(acc, mark, i))
    }

    // -- Decorations --

    /// Register a decoration, indexing it under each of its marks.
    pub fn add_decoration(&mut self, mut decoration: Decoration) -> DecorationId {
        let id = DecorationId(self.next_decoration);
        self.next_decoration += 1;

        decoration.set_clock(&self.clock);
        decoration.compute_all(&self.table);
        for &mark in decoration.marks() {
            let _ = self.decorations_by_mark.entry(mark).or_default().insert(id);
        }
        self.decoration_order.push(id);
        let _ = self.decorations.insert(id, decoration);
        id
    }

    /// Unregister a decoration. Unknown IDs are reported and ignored.
    pub fn remove_decoration(&mut self, id: DecorationId) -> Option<Decoration> {
        let Some(decoration) = self.decorations.remove(&id) else {
            log::warn!("attempted to remove decoration {id:?} that does not exist");
            return None;
        };
        self.decoration_order.retain(|d| *d != id);
        for mark in decoration.marks() {
            if let Some(bound) = self.decorations_by_mark.get_mut(mark) {
                let _ = bound.remove(&id);
                if bound.is_empty() {
                    let _ = self.decorations_by_mark.remove(mark);
                }
            }
        }
        let _ = self.animating_decorations.remove(&id);
        Some(decoration)
    }

    /// Decoration by handle.
    #[must_use]
    pub fn decoration(&self, id: DecorationId) -> Option<&Decoration> {
        self.decorations.get(&id)
    }

    /// Registered decorations in insertion order.
    pub fn decorations(
        &self,
    ) -> impl Iterator<Item = (DecorationId, &Decoration)> + '_ {
        self.decoration_order
            .iter()
            .filter_map(|id| self.decorations.get(id).map(|d| (*id, d)))
    }

    /// Number of registered decorations.
    #[must_use]
    pub fn decoration_count(&self) -> usize {
        self.decorations.len()
    }

    /// Decorations bound to mark `id`.
    #[must_use]
    pub fn decorations_for_mark(&self, id: PointId) -> Vec<DecorationId> {
        let mut ids: Vec<DecorationId> = self
            .decorations_by_mark
            .get(&id)
            .map(|bound| bound.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Current value of attribute `name` on decoration `id`.
    pub fn decoration_attr(
        &mut self,
        id: DecorationId,
        name: &str,
    ) -> Option<Value> {
        let decoration = self.decorations.get_mut(&id)?;
        decoration.attr(name, &self.table)
    }

    /// Un-animated value of attribute `name` on decoration `id`.
    #[must_use]
    pub fn decoration_data(&self, id: DecorationId, name: &str) -> Option<Value> {
        self.decorations.get(&id)?.data(name, &self.table)
    }

    /// Set a literal attribute on a decoration.
    pub fn set_decoration_attr(
        &mut self,
        id: DecorationId,
        name: &str,
        value: impl Into<Value>,
    ) -> bool {
        self.decorations
            .get_mut(&id)
            .is_some_and(|d| d.set_attr(name, value))
    }

    /// Switch a decoration attribute to a computed source.
    pub fn set_decoration_attr_fn(
        &mut self,
        id: DecorationId,
        name: &str,
        f: impl Fn(&Lookup) -> Value + 'static,
    ) -> bool {
        self.decorations
            .get_mut(&id)
            .is_some_and(|d| d.set_attr_fn(name, f))
    }

    /// Animate a decoration attribute and track the decoration until the
    /// animation ends.
    pub fn animate_decoration(
        &mut self,
        id: DecorationId,
        name: &str,
        animator: Animator,
    ) {
        let Some(decoration) = self.decorations.get_mut(&id) else {
            log::warn!("animate_decoration: unknown decoration {id:?}");
            return;
        };
        if decoration.animate(name, animator, &self.table) {
            let _ = self.animating_decorations.insert(id);
        }
    }

    /// Animate a decoration attribute toward its data-source value when it
    /// differs from the last or target value.
    pub fn animate_decoration_computed(
        &mut self,
        id: DecorationId,
        name: &str,
        duration: f64,
        curve: EasingFunction,
    ) {
        let Some(decoration) = self.decorations.get_mut(&id) else {
            log::warn!("animate_decoration_computed: unknown decoration {id:?}");
            return;
        };
        let Some(new_value) = decoration.data(name, &self.table) else {
            return;
        };
        let last = decoration.last(name, &self.table).unwrap_or_default();
        let future = decoration.future(name, &self.table).unwrap_or_default();
        if approx_equals(&new_value, &last) && approx_equals(&new_value, &future) {
            return;
        }
        let animator =
            Animator::new(Interpolator::To(new_value), duration).with_curve(curve);
        if decoration.animate(name, animator, &self.table) {
            let _ = self.animating_decorations.insert(id);
        }
    }
}
