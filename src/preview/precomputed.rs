use serde::{Deserialize, Serialize};

use super::{Intensity, PreviewIntensity};
use crate::data::ColumnarFrame;
use crate::marks::PointId;

/// A group of points sharing a precomputed preview strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewComponent {
    /// Member points.
    pub component: Vec<PointId>,
    /// Line alpha for every member.
    pub distance: f64,
}

/// Reads alpha from externally computed components; width grows with
/// how far the point moves, relative to `scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedPreview {
    components: Vec<PreviewComponent>,
    scale: f64,
}

impl PrecomputedPreview {
    /// Width added regardless of distance.
    pub const BASE_WIDTH: f64 = 0.2;
    /// Multiplier on the width term.
    pub const WIDTH_SCALE: f64 = 10.0;

    /// Strategy over `components`; distances are divided by `scale`.
    #[must_use]
    pub fn new(components: Vec<PreviewComponent>, scale: f64) -> Self {
        Self { components, scale }
    }

    /// The components, in lookup order.
    #[must_use]
    pub fn components(&self) -> &[PreviewComponent] {
        &self.components
    }
}

impl PreviewIntensity for PrecomputedPreview {
    fn intensity(&self, id: PointId, frame: &ColumnarFrame, preview: &ColumnarFrame) -> Intensity {
        let alpha = self
            .components
            .iter()
            .find(|c| c.component.contains(&id))
            .map_or(0.0, |c| c.distance);
        if alpha == 0.0 || !alpha.is_finite() {
            return Intensity::ZERO;
        }
        let (Some((x0, y0)), Some((x1, y1))) = (frame.position(id), preview.position(id)) else {
            return Intensity::ZERO;
        };
        let moved = (x1 - x0).hypot(y1 - y0);
        Intensity {
            line_alpha: alpha,
            line_width: Self::WIDTH_SCALE * (moved / self.scale + Self::BASE_WIDTH),
        }
    }
}
