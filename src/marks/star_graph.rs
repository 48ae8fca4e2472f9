//! Neighbor highlight: an outline on a center mark plus one line to each
//! neighbor.

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use super::decoration::{Decoration, DecorationAttribute, DecorationKind, Lookup};
use super::mark::PointId;
use super::mark_set::{DecorationId, MarkSet};
use crate::animation::{Animator, EasingFunction, Interpolator, PoolCallbacks};
use crate::options::AnimationOptions;
use crate::value::Value;

/// Gap between the center mark's radius and its outline.
const OUTLINE_PADDING: f64 = 3.0;
const LINE_COLOR: &str = "darkgrey";
const LINE_WIDTH: f64 = 1.0;

/// Outline and neighbor lines registered in a [`MarkSet`].
///
/// While off, the outline radius is zero and every line collapses onto the
/// center mark; [`enter`](Self::enter) and [`exit`](Self::exit) animate
/// between the two.
#[derive(Debug)]
pub struct StarGraph {
    center: PointId,
    neighbors: Vec<PointId>,
    outline: DecorationId,
    lines: Vec<DecorationId>,
    on: Rc<Cell<bool>>,
}

impl StarGraph {
    /// Register the graph's decorations. Neighbors missing from `set` and
    /// repeated neighbors are dropped.
    pub fn new(set: &mut MarkSet, center: PointId, neighbors: &[PointId]) -> Self {
        let on = Rc::new(Cell::new(false));

        let outline_on = Rc::clone(&on);
        let outline = set.add_decoration(Decoration::new(
            DecorationKind::Outline,
            vec![center],
            [
                (
                    "r",
                    DecorationAttribute::computed(move |marks: &Lookup| {
                        if outline_on.get() {
                            let r = marks.mark_attr(center, "r").number_or(0.0);
                            Value::from(r + OUTLINE_PADDING)
                        } else {
                            Value::from(0.0)
                        }
                    }),
                ),
                ("color", DecorationAttribute::new(LINE_COLOR)),
                ("lineWidth", DecorationAttribute::new(LINE_WIDTH)),
            ],
        ));

        let neighbors = known_neighbors(set, neighbors);
        let lines = neighbors
            .iter()
            .map(|&neighbor| add_line(set, &on, center, neighbor))
            .collect();

        Self {
            center,
            neighbors,
            outline,
            lines,
            on,
        }
    }

    /// Center mark.
    #[must_use]
    pub fn center(&self) -> PointId {
        self.center
    }

    /// Neighbor marks, in line order.
    #[must_use]
    pub fn neighbors(&self) -> &[PointId] {
        &self.neighbors
    }

    /// Whether the graph is shown (or showing).
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.on.get()
    }

    /// Outline decoration.
    #[must_use]
    pub fn outline(&self) -> DecorationId {
        self.outline
    }

    /// Outline first, then one line per neighbor.
    #[must_use]
    pub fn decorations(&self) -> Vec<DecorationId> {
        std::iter::once(self.outline)
            .chain(self.lines.iter().copied())
            .collect()
    }

    /// Grow the outline and extend the lines out to the neighbors.
    pub fn enter(&self, set: &mut MarkSet, duration: f64, curve: EasingFunction) {
        self.on.set(true);
        animate_to_data(set, self.outline, "r", duration, curve);
        for &line in &self.lines {
            animate_line(set, line, duration, curve);
        }
    }

    /// Shrink the outline and pull the lines back to the center.
    pub fn exit(&self, set: &mut MarkSet, duration: f64, curve: EasingFunction) {
        self.on.set(false);
        set.animate_decoration(
            self.outline,
            "r",
            Animator::new(Interpolator::to(0.0), duration).with_curve(curve),
        );
        for &line in &self.lines {
            animate_line(set, line, duration, curve);
        }
    }

    /// Replace the neighbor list, removing lines to dropped neighbors and
    /// animating in lines to new ones. Kept neighbors keep their line;
    /// repeats in `neighbors` get one line.
    pub fn update_neighbor_marks(
        &mut self,
        set: &mut MarkSet,
        neighbors: &[PointId],
        duration: f64,
        curve: EasingFunction,
    ) {
        let neighbors = known_neighbors(set, neighbors);

        for (old, &line) in self.neighbors.iter().zip(&self.lines) {
            if !neighbors.contains(old) {
                let _ = set.remove_decoration(line);
            }
        }

        let mut lines = Vec::with_capacity(neighbors.len());
        for &neighbor in &neighbors {
            match self.neighbors.iter().position(|n| *n == neighbor) {
                Some(idx) => lines.push(self.lines[idx]),
                None => {
                    let line = add_line(set, &self.on, self.center, neighbor);
                    animate_line(set, line, duration, curve);
                    lines.push(line);
                }
            }
        }

        self.neighbors = neighbors;
        self.lines = lines;
    }

    /// Unregister every decoration of the graph.
    pub fn remove(self, set: &mut MarkSet) {
        for id in self.decorations() {
            let _ = set.remove_decoration(id);
        }
    }
}

/// Neighbors present in `set`, first occurrence only.
fn known_neighbors(set: &MarkSet, neighbors: &[PointId]) -> Vec<PointId> {
    let mut seen = FxHashSet::default();
    neighbors
        .iter()
        .copied()
        .filter(|id| set.mark_by_id(*id).is_some() && seen.insert(*id))
        .collect()
}

fn add_line(
    set: &mut MarkSet,
    on: &Rc<Cell<bool>>,
    center: PointId,
    neighbor: PointId,
) -> DecorationId {
    let endpoint = |axis: &'static str| {
        let on = Rc::clone(on);
        DecorationAttribute::computed(move |marks: &Lookup| {
            let from = if on.get() { neighbor } else { center };
            marks.mark_attr(from, axis)
        })
    };
    set.add_decoration(Decoration::new(
        DecorationKind::Line,
        vec![center, neighbor],
        [
            ("color", DecorationAttribute::new(LINE_COLOR)),
            ("lineWidth", DecorationAttribute::new(LINE_WIDTH)),
            ("x2", endpoint("x")),
            ("y2", endpoint("y")),
        ],
    ))
}

fn animate_to_data(
    set: &mut MarkSet,
    id: DecorationId,
    name: &str,
    duration: f64,
    curve: EasingFunction,
) {
    let target = set.decoration_data(id, name).unwrap_or_default();
    set.animate_decoration(
        id,
        name,
        Animator::new(Interpolator::To(target), duration).with_curve(curve),
    );
}

fn animate_line(set: &mut MarkSet, id: DecorationId, duration: f64, curve: EasingFunction) {
    animate_to_data(set, id, "x2", duration, curve);
    animate_to_data(set, id, "y2", duration, curve);
}

/// Pool callbacks that show and hide star graphs keyed by center mark.
#[derive(Debug, Clone, Copy)]
pub struct StarGraphHighlighter {
    /// Enter/exit animation length in milliseconds.
    pub duration_ms: f64,
    /// Easing for enter/exit.
    pub curve: EasingFunction,
}

impl StarGraphHighlighter {
    /// Highlight timing from the options' highlight duration and easing.
    #[must_use]
    pub fn from_options(options: &AnimationOptions) -> Self {
        Self {
            duration_ms: options.highlight_duration_ms,
            curve: options.easing,
        }
    }
}

impl PoolCallbacks for StarGraphHighlighter {
    type Key = PointId;
    type Info = Vec<PointId>;
    type Element = StarGraph;
    type Context = MarkSet;

    fn create(
        &mut self,
        set: &mut MarkSet,
        center: &PointId,
        neighbors: Option<&Vec<PointId>>,
    ) -> StarGraph {
        StarGraph::new(set, *center, neighbors.map(Vec::as_slice).unwrap_or_default())
    }

    fn show(&mut self, set: &mut MarkSet, graph: &mut StarGraph) -> f64 {
        graph.enter(set, self.duration_ms, self.curve);
        self.duration_ms
    }

    fn hide(&mut self, set: &mut MarkSet, graph: &mut StarGraph) -> f64 {
        graph.exit(set, self.duration_ms, self.curve);
        self.duration_ms
    }

    fn destroy(&mut self, set: &mut MarkSet, graph: StarGraph) {
        graph.remove(set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationPool, PoolState};
    use crate::marks::{Mark, MarkAttribute};

    fn mark(id: PointId, x: f64, y: f64) -> Mark {
        Mark::new(
            id,
            [
                ("x", MarkAttribute::new(x)),
                ("y", MarkAttribute::new(y)),
                ("r", MarkAttribute::new(2.0)),
            ],
        )
    }

    fn set() -> MarkSet {
        MarkSet::new(vec![mark(0, 0.0, 0.0), mark(1, 10.0, 0.0), mark(2, 0.0, 10.0)])
    }

    fn num(v: Option<Value>) -> f64 {
        v.and_then(|v| v.as_f64()).unwrap_or(f64::NAN)
    }

    #[test]
    fn enter_and_exit_animate_outline_and_lines() {
        let mut set = set();
        let graph = StarGraph::new(&mut set, 0, &[1, 2, 99]);
        assert_eq!(graph.neighbors(), &[1, 2]);
        assert_eq!(set.decoration_count(), 3);

        let line = graph.decorations()[1];
        assert_eq!(num(set.decoration_attr(line, "x2")), 0.0);

        graph.enter(&mut set, 100.0, EasingFunction::Linear);
        let _ = set.advance(50.0);
        assert!((num(set.decoration_attr(graph.outline(), "r")) - 2.5).abs() < 1e-6);
        assert!((num(set.decoration_attr(line, "x2")) - 5.0).abs() < 1e-6);

        let _ = set.advance(60.0);
        assert_eq!(num(set.decoration_attr(graph.outline(), "r")), 5.0);
        assert_eq!(num(set.decoration_attr(line, "x2")), 10.0);

        graph.exit(&mut set, 100.0, EasingFunction::Linear);
        let _ = set.advance(200.0);
        assert_eq!(num(set.decoration_attr(graph.outline(), "r")), 0.0);
        assert_eq!(num(set.decoration_attr(line, "x2")), 0.0);
    }

    #[test]
    fn update_neighbors_diffs_lines() {
        let mut set = set();
        let mut graph = StarGraph::new(&mut set, 0, &[1, 2]);
        let kept = graph.decorations()[2];

        graph.update_neighbor_marks(&mut set, &[2], 0.0, EasingFunction::Linear);
        assert_eq!(graph.neighbors(), &[2]);
        assert_eq!(graph.decorations(), vec![graph.outline(), kept]);
        assert_eq!(set.decoration_count(), 2);
        assert!(set.decorations_for_mark(1).is_empty());

        graph.remove(&mut set);
        assert_eq!(set.decoration_count(), 0);
    }

    #[test]
    fn repeated_neighbors_get_one_line() {
        let mut set = set();
        let mut graph = StarGraph::new(&mut set, 0, &[1, 1, 2]);
        assert_eq!(graph.neighbors(), &[1, 2]);
        assert_eq!(set.decoration_count(), 3);

        graph.update_neighbor_marks(&mut set, &[2, 2, 1, 2], 0.0, EasingFunction::Linear);
        assert_eq!(graph.neighbors(), &[2, 1]);
        assert_eq!(set.decoration_count(), 3);
        assert_eq!(set.decorations_for_mark(2).len(), 1);

        graph.update_neighbor_marks(&mut set, &[1, 1], 0.0, EasingFunction::Linear);
        assert_eq!(graph.neighbors(), &[1]);
        assert_eq!(set.decoration_count(), 2);
        graph.remove(&mut set);
        assert_eq!(set.decoration_count(), 0);
    }

    #[test]
    fn highlighter_takes_timing_from_options() {
        let options = AnimationOptions {
            highlight_duration_ms: 120.0,
            easing: EasingFunction::Linear,
            ..AnimationOptions::default()
        };
        let mut set = set();
        let mut pool =
            AnimationPool::new(StarGraphHighlighter::from_options(&options));
        assert!(pool.show(&mut set, 0, Some(vec![1])).is_some());

        let outline = pool.element(&0).unwrap().outline();
        let _ = set.advance(60.0);
        let _ = pool.advance(&mut set, 60.0);
        assert!((num(set.decoration_attr(outline, "r")) - 2.5).abs() < 1e-6);
        assert_eq!(pool.state(&0), Some(PoolState::Entering));

        let _ = set.advance(60.0);
        let _ = pool.advance(&mut set, 60.0);
        assert_eq!(num(set.decoration_attr(outline, "r")), 5.0);
        assert_eq!(pool.state(&0), Some(PoolState::Visible));
    }

    #[test]
    fn highlighter_pool_creates_and_destroys_graphs() {
        let mut set = set();
        let mut pool = AnimationPool::new(StarGraphHighlighter {
            duration_ms: 300.0,
            curve: EasingFunction::EaseInOut,
        });

        assert!(pool.show(&mut set, 0, Some(vec![1, 2])).is_some());
        assert_eq!(set.decoration_count(), 3);
        let _ = pool.advance(&mut set, 300.0);
        assert_eq!(pool.state(&0), Some(PoolState::Visible));

        let _ = pool.hide(&mut set, 0);
        let _ = pool.advance(&mut set, 300.0);
        assert!(pool.is_empty());
        assert_eq!(set.decoration_count(), 0);
    }
}
