use std::cell::OnceCell;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashSet;

use super::{Intensity, PreviewIntensity};
use crate::data::{ColumnarData, ColumnarFrame, FieldSpec, NumericType, Schema};
use crate::marks::PointId;
use crate::value::Value;

/// Columns of [`FramePreview::line_data`].
pub const PREVIEW_LINE_FIELDS: [&str; 2] = ["lineAlpha", "lineWidth"];

fn line_schema() -> Schema {
    Schema::new(
        PREVIEW_LINE_FIELDS
            .iter()
            .map(|name| FieldSpec::numeric(name, NumericType::F32))
            .collect(),
    )
}

/// Preview intensities of every point of a base frame toward a candidate
/// frame, computed once at construction.
#[derive(Debug)]
pub struct FramePreview {
    line_data: ColumnarData,
    shuffle_seed: Option<u64>,
    by_alpha: OnceCell<Vec<PointId>>,
}

impl FramePreview {
    /// Score every point of `frame` with `strategy`.
    #[must_use]
    pub fn compute(
        frame: &ColumnarFrame,
        preview: &ColumnarFrame,
        strategy: &dyn PreviewIntensity,
    ) -> Self {
        let records = frame.data().ids().iter().map(|&id| {
            let Intensity {
                line_alpha,
                line_width,
            } = strategy.intensity(id, frame, preview);
            let record = [
                ("lineAlpha".to_owned(), Value::from(line_alpha)),
                ("lineWidth".to_owned(), Value::from(line_width)),
            ];
            (id, Value::Record(record.into_iter().collect()))
        });
        let line_data = ColumnarData::from_records(line_schema(), records)
            .unwrap_or_else(|_| ColumnarData::empty(line_schema()));
        Self {
            line_data,
            shuffle_seed: None,
            by_alpha: OnceCell::new(),
        }
    }

    /// Make the tie-break shuffle of [`top_k`](Self::top_k) reproducible.
    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self.by_alpha = OnceCell::new();
        self
    }

    /// Cached `lineAlpha` / `lineWidth` table.
    #[must_use]
    pub fn line_data(&self) -> &ColumnarData {
        &self.line_data
    }

    /// Intensity for `id`; zero for points not in the base frame.
    #[must_use]
    pub fn get(&self, id: PointId) -> Intensity {
        match (
            self.line_data.number(id, "lineAlpha"),
            self.line_data.number(id, "lineWidth"),
        ) {
            (Some(line_alpha), Some(line_width)) => Intensity {
                line_alpha,
                line_width,
            },
            _ => Intensity::ZERO,
        }
    }

    /// Up to `k` point IDs by descending alpha, optionally restricted to
    /// `in_set`. Ties keep a shuffled order fixed at the first call.
    #[must_use]
    pub fn top_k(&self, k: usize, in_set: Option<&FxHashSet<PointId>>) -> Vec<PointId> {
        self.by_alpha
            .get_or_init(|| self.sort_by_alpha())
            .iter()
            .copied()
            .filter(|id| in_set.is_none_or(|set| set.contains(id)))
            .take(k)
            .collect()
    }

    fn sort_by_alpha(&self) -> Vec<PointId> {
        let mut order: Vec<(PointId, f64)> = self
            .line_data
            .ids()
            .iter()
            .map(|&id| (id, self.get(id).line_alpha))
            .collect();
        match self.shuffle_seed {
            Some(seed) => order.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => order.shuffle(&mut rand::rng()),
        }
        order.sort_by(|a, b| b.1.total_cmp(&a.1));
        order.into_iter().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame_schema;
    use crate::preview::{
        NeighborPreview, NoPreview, PrecomputedPreview, PreviewComponent, ProjectionPreview,
    };

    fn frame(points: &[(PointId, f64, f64, &[PointId])]) -> ColumnarFrame {
        let records = points.iter().map(|&(id, x, y, highlight)| {
            let json = serde_json::json!({
                "x": x, "y": y, "alpha": 1.0, "r": 1.0, "color": 0.0,
                "highlight": highlight, "visible": true,
            });
            (id, serde_json::from_value(json).unwrap())
        });
        ColumnarFrame::new(
            ColumnarData::from_records(frame_schema(), records).unwrap(),
            "f",
        )
    }

    fn grid() -> ColumnarFrame {
        frame(&[
            (1, 0.0, 0.0, &[2, 3]),
            (2, 1.0, 0.0, &[1, 3]),
            (3, 0.0, 1.0, &[1, 2]),
            (4, 10.0, 10.0, &[5]),
            (5, 11.0, 10.0, &[4]),
        ])
    }

    #[test]
    fn identical_projections_have_no_preview() {
        let base = grid();
        let same = grid();
        let preview = FramePreview::compute(&base, &same, &ProjectionPreview::default());
        for &id in base.data().ids() {
            assert_eq!(preview.get(id), Intensity::ZERO);
        }
        assert_eq!(preview.get(99), Intensity::ZERO);
    }

    #[test]
    fn projection_preview_flags_points_that_change_neighbors() {
        let base = grid();
        // Point 1 jumps into the far cluster.
        let moved = frame(&[
            (1, 10.5, 10.5, &[]),
            (2, 1.0, 0.0, &[]),
            (3, 0.0, 1.0, &[]),
            (4, 10.0, 10.0, &[]),
            (5, 11.0, 10.0, &[]),
        ]);
        let strategy = ProjectionPreview {
            k: 3,
            similarity_threshold: 0.7,
        };
        let preview = FramePreview::compute(&base, &moved, &strategy);
        let hit = preview.get(1);
        // Only itself is shared: fraction 1/3.
        let expected = 1.0 - (1.0 / 3.0) / 0.7;
        assert!((hit.line_alpha - expected).abs() < 1e-6);
        assert!((hit.line_width - expected * 10.0).abs() < 1e-5);
        assert_eq!(preview.top_k(1, None), vec![1]);
    }

    #[test]
    fn neighbor_preview_uses_attached_neighbors() {
        let base = grid();
        let changed = frame(&[
            (1, 0.0, 0.0, &[4, 5]),
            (2, 1.0, 0.0, &[1, 3]),
            (3, 0.0, 1.0, &[1, 2]),
            (4, 10.0, 10.0, &[5]),
            (5, 11.0, 10.0, &[4]),
        ]);
        let preview = FramePreview::compute(&base, &changed, &NeighborPreview::default());
        let hit = preview.get(1);
        assert!((hit.line_alpha - 1.0).abs() < 1e-6);
        assert!((hit.line_width - 5.0).abs() < 1e-6);
        assert_eq!(preview.get(2), Intensity::ZERO);
    }

    #[test]
    fn precomputed_preview_reads_component_distance() {
        let base = grid();
        let moved = frame(&[(1, 3.0, 4.0, &[]), (2, 1.0, 0.0, &[])]);
        let strategy = PrecomputedPreview::new(
            vec![
                PreviewComponent {
                    component: vec![1, 4],
                    distance: 0.5,
                },
                PreviewComponent {
                    component: vec![2],
                    distance: 0.0,
                },
            ],
            10.0,
        );
        let preview = FramePreview::compute(&base, &moved, &strategy);
        let hit = preview.get(1);
        assert!((hit.line_alpha - 0.5).abs() < 1e-6);
        assert!((hit.line_width - 10.0 * (0.5 + 0.2)).abs() < 1e-5);
        assert_eq!(preview.get(2), Intensity::ZERO);
        assert_eq!(preview.get(3), Intensity::ZERO);
        // Point 4 is missing from the preview frame.
        assert_eq!(preview.get(4), Intensity::ZERO);
    }

    #[test]
    fn top_k_is_sorted_filtered_and_stable_per_seed() {
        let base = grid();
        let strategy = PrecomputedPreview::new(
            vec![
                PreviewComponent {
                    component: vec![2],
                    distance: 0.9,
                },
                PreviewComponent {
                    component: vec![4, 5],
                    distance: 0.4,
                },
            ],
            1.0,
        );
        let preview = FramePreview::compute(&base, &grid(), &strategy).with_shuffle_seed(7);
        let top = preview.top_k(3, None);
        assert_eq!(top[0], 2);
        let mut tail = top[1..].to_vec();
        tail.sort_unstable();
        assert_eq!(tail, vec![4, 5]);
        assert_eq!(preview.top_k(3, None), top);

        let only: FxHashSet<PointId> = [5, 1].into_iter().collect();
        assert_eq!(preview.top_k(1, Some(&only)), vec![5]);
        assert_eq!(preview.top_k(0, None), Vec::<PointId>::new());
    }

    #[test]
    fn no_preview_scores_every_point_zero() {
        let base = grid();
        let preview = FramePreview::compute(&base, &grid(), &NoPreview);
        assert_eq!(preview.line_data().len(), 5);
        assert_eq!(preview.get(3), Intensity::ZERO);
        assert_eq!(preview.top_k(10, None).len(), 5);
    }
}
