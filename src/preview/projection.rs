use super::{falloff, overlap_fraction, Intensity, PreviewIntensity};
use crate::data::ColumnarFrame;
use crate::marks::PointId;

/// Compares each point's 2D nearest neighbors in the two frames. Suited
/// to different projections of one embedding, whose high-dimensional
/// neighbors do not change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionPreview {
    /// Neighbors per point.
    pub k: usize,
    /// Overlap fraction at or above which nothing is previewed.
    pub similarity_threshold: f64,
}

impl ProjectionPreview {
    /// Line width at zero overlap.
    pub const MAX_WIDTH: f64 = 10.0;
}

impl Default for ProjectionPreview {
    fn default() -> Self {
        Self {
            k: 10,
            similarity_threshold: 0.7,
        }
    }
}

impl PreviewIntensity for ProjectionPreview {
    fn intensity(&self, id: PointId, frame: &ColumnarFrame, preview: &ColumnarFrame) -> Intensity {
        let fraction = overlap_fraction(
            &frame.neighbors(id, self.k),
            &preview.neighbors(id, self.k),
        );
        falloff(fraction, self.similarity_threshold, 1, Self::MAX_WIDTH)
    }
}
