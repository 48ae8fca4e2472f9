use super::{falloff, overlap_fraction, Intensity, PreviewIntensity};
use crate::data::ColumnarFrame;
use crate::marks::PointId;

/// Compares the precomputed high-dimensional neighbors attached to each
/// frame (`highlightIndexes`), truncated to `k`. Falls off cubically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborPreview {
    /// Neighbors per point.
    pub k: usize,
    /// Overlap fraction at or above which nothing is previewed.
    pub similarity_threshold: f64,
}

impl NeighborPreview {
    /// Line width at zero overlap.
    pub const MAX_WIDTH: f64 = 5.0;
}

impl Default for NeighborPreview {
    fn default() -> Self {
        Self {
            k: 10,
            similarity_threshold: 0.3,
        }
    }
}

fn truncated(frame: &ColumnarFrame, id: PointId, k: usize) -> Vec<PointId> {
    let mut ids = frame.data().nested_ids(id, "highlightIndexes");
    ids.truncate(k);
    ids
}

impl PreviewIntensity for NeighborPreview {
    fn intensity(&self, id: PointId, frame: &ColumnarFrame, preview: &ColumnarFrame) -> Intensity {
        let fraction = overlap_fraction(
            &truncated(frame, id, self.k),
            &truncated(preview, id, self.k),
        );
        falloff(fraction, self.similarity_threshold, 3, Self::MAX_WIDTH)
    }
}
