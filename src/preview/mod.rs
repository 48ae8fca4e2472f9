//! Per-point previews of how much a point's neighborhood changes between
//! the current frame and a candidate frame.
//!
//! A [`PreviewIntensity`] strategy scores one point; [`FramePreview`]
//! scores every point of the base frame once and answers lookups and
//! top-k queries from the cached table.

mod frame_preview;
mod neighbor;
mod precomputed;
mod projection;

pub use frame_preview::{FramePreview, PREVIEW_LINE_FIELDS};
pub use neighbor::NeighborPreview;
pub use precomputed::{PrecomputedPreview, PreviewComponent};
pub use projection::ProjectionPreview;

use crate::data::ColumnarFrame;
use crate::marks::PointId;
use rustc_hash::FxHashSet;

/// Line style of one point's preview.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Intensity {
    /// Opacity of the preview line, `0..=1`.
    pub line_alpha: f64,
    /// Width of the preview line in pixels.
    pub line_width: f64,
}

impl Intensity {
    /// No preview.
    pub const ZERO: Self = Self {
        line_alpha: 0.0,
        line_width: 0.0,
    };
}

/// Scores how strongly a point's move to `preview` should be shown.
pub trait PreviewIntensity {
    /// Intensity for `id` moving from `frame` to `preview`.
    fn intensity(&self, id: PointId, frame: &ColumnarFrame, preview: &ColumnarFrame) -> Intensity;
}

/// Strategy that never previews anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreview;

impl PreviewIntensity for NoPreview {
    fn intensity(&self, _: PointId, _: &ColumnarFrame, _: &ColumnarFrame) -> Intensity {
        Intensity::ZERO
    }
}

/// Fraction of `current` also present in `preview`. An empty `current`
/// counts as full overlap.
fn overlap_fraction(current: &[PointId], preview: &[PointId]) -> f64 {
    let current: FxHashSet<PointId> = current.iter().copied().collect();
    if current.is_empty() {
        return 1.0;
    }
    let preview: FxHashSet<PointId> = preview.iter().copied().collect();
    let shared = current.intersection(&preview).count();
    shared as f64 / current.len() as f64
}

/// Zero at or above `threshold`; otherwise `(1 - f / t)^power` for alpha
/// and that times `max_width` for width.
fn falloff(fraction: f64, threshold: f64, power: i32, max_width: f64) -> Intensity {
    if fraction >= threshold {
        return Intensity::ZERO;
    }
    let alpha = (1.0 - fraction / threshold).powi(power);
    Intensity {
        line_alpha: alpha,
        line_width: alpha * max_width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_counts_against_current_set() {
        assert_eq!(overlap_fraction(&[1, 2, 3, 4], &[3, 4, 9]), 0.5);
        assert_eq!(overlap_fraction(&[], &[1]), 1.0);
        assert_eq!(overlap_fraction(&[1, 1, 2], &[1]), 0.5);
    }

    #[test]
    fn falloff_is_zero_past_threshold() {
        assert_eq!(falloff(0.7, 0.7, 1, 10.0), Intensity::ZERO);
        let half = falloff(0.35, 0.7, 1, 10.0);
        assert!((half.line_alpha - 0.5).abs() < 1e-12);
        assert!((half.line_width - 5.0).abs() < 1e-12);
        let cubic = falloff(0.15, 0.3, 3, 5.0);
        assert!((cubic.line_alpha - 0.125).abs() < 1e-12);
        assert!((cubic.line_width - 0.625).abs() < 1e-12);
    }
}
