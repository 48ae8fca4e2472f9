//! One 2D projection of the point set.

use std::cell::OnceCell;
use std::fmt;

use kiddo::{ImmutableKdTree, SquaredEuclidean};

use super::affine::AffineMatrix;
use super::columnar::ColumnarData;
use super::schema::{FieldSpec, NumericType, Schema};
use crate::marks::PointId;

/// Layout of every frame: position, style, and high-dimensional neighbor
/// IDs (read from the `highlight` key of input records).
#[must_use]
pub fn frame_schema() -> Schema {
    Schema::new(vec![
        FieldSpec::numeric("x", NumericType::F32),
        FieldSpec::numeric("y", NumericType::F32),
        FieldSpec::numeric("alpha", NumericType::F32),
        FieldSpec::numeric("r", NumericType::F32),
        FieldSpec::values("color"),
        FieldSpec::numeric("highlightIndexes", NumericType::I32)
            .nested()
            .from_field("highlight"),
        FieldSpec::values("visible"),
    ])
}

/// Balanced k-d tree over the finite positions of a frame. Tree items
/// index `rows`.
struct SpatialIndex {
    tree: ImmutableKdTree<f32, 2>,
    rows: Vec<usize>,
}

/// A titled [`ColumnarData`] in the frame layout, with a lazily built
/// spatial index over `(x, y)`.
pub struct ColumnarFrame {
    data: ColumnarData,
    title: String,
    tree: OnceCell<Option<SpatialIndex>>,
}

impl ColumnarFrame {
    /// Wrap data already in [`frame_schema`] layout.
    #[must_use]
    pub fn new(data: ColumnarData, title: impl Into<String>) -> Self {
        Self {
            data,
            title: title.into(),
            tree: OnceCell::new(),
        }
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Underlying table.
    #[must_use]
    pub fn data(&self) -> &ColumnarData {
        &self.data
    }

    /// Mutable table, for computed and linked fields.
    pub fn data_mut(&mut self) -> &mut ColumnarData {
        &mut self.data
    }

    /// Position of a point.
    #[must_use]
    pub fn position(&self, id: PointId) -> Option<(f64, f64)> {
        Some((self.data.number(id, "x")?, self.data.number(id, "y")?))
    }

    /// Map every `(x, y)` through `matrix` in place.
    pub fn transform(&mut self, matrix: &AffineMatrix) {
        let len = self.data.len();
        let mut xs = Vec::with_capacity(len);
        let mut ys = Vec::with_capacity(len);
        for &id in self.data.ids() {
            let (x, y) = self.position(id).unwrap_or((f64::NAN, f64::NAN));
            let (tx, ty) = matrix.transform_point(x, y);
            xs.push(tx);
            ys.push(ty);
        }
        for (field, values) in [("x", xs), ("y", ys)] {
            if let Some(column) = self.data.numeric_column_mut(field) {
                for (row, v) in values.into_iter().enumerate() {
                    column.set_f64(row, v);
                }
            }
        }
        let _ = self.tree.take();
    }

    /// Up to `k` nearest points to `id` in this frame's plane. The point
    /// itself comes first; the rest follow by ascending distance, ties by
    /// row. Unknown IDs yield an empty list.
    ///
    /// Coincident points and collapsed axes are fine.
    #[must_use]
    pub fn neighbors(&self, id: PointId, k: usize) -> Vec<PointId> {
        let (Some(row), Some((x, y))) = (self.data.row(id), self.position(id))
        else {
            return Vec::new();
        };
        if k == 0 || !(x.is_finite() && y.is_finite()) {
            return Vec::new();
        }
        let Some(index) = self.tree.get_or_init(|| self.build_index()) else {
            return Vec::new();
        };
        let query = [x as f32, y as f32];

        // The k-th distance bounds the answer; collect every point up to it
        // so ties resolve by row rather than by tree layout.
        let Some(reach) = index
            .tree
            .nearest_n::<SquaredEuclidean>(&query, k)
            .iter()
            .map(|n| n.distance)
            .reduce(f32::max)
        else {
            return Vec::new();
        };
        let radius = reach.mul_add(1.0e-5, reach) + f32::MIN_POSITIVE;
        let mut hits: Vec<(bool, f32, usize)> = index
            .tree
            .within_unsorted::<SquaredEuclidean>(&query, radius)
            .into_iter()
            .filter_map(|n| {
                let hit = *index.rows.get(n.item as usize)?;
                Some((hit != row, n.distance, hit))
            })
            .collect();
        hits.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.total_cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        let ids = self.data.ids();
        hits.into_iter()
            .take(k)
            .filter_map(|(_, _, hit)| ids.get(hit).copied())
            .collect()
    }

    fn build_index(&self) -> Option<SpatialIndex> {
        let mut points = Vec::with_capacity(self.data.len());
        let mut rows = Vec::with_capacity(self.data.len());
        for (row, &id) in self.data.ids().iter().enumerate() {
            let finite = self
                .position(id)
                .filter(|(x, y)| x.is_finite() && y.is_finite());
            if let Some((x, y)) = finite {
                points.push([x as f32, y as f32]);
                rows.push(row);
            }
        }
        if points.is_empty() {
            return None;
        }
        log::debug!(
            "frame '{}': spatial index over {} points",
            self.title,
            points.len()
        );
        Some(SpatialIndex {
            tree: ImmutableKdTree::new_from_slice(&points),
            rows,
        })
    }
}

impl fmt::Debug for ColumnarFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnarFrame")
            .field("title", &self.title)
            .field("data", &self.data)
            .field("indexed", &self.tree.get().is_some_and(Option::is_some))
            .finish()
    }
}
