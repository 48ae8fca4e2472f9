use std::collections::BTreeMap;

use super::instance::PointInstance;
use crate::marks::{DecorationId, DecorationKind};
use crate::value::Value;

/// Attribute values of one decoration for the current tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationDraw {
    /// Handle in the owning mark set.
    pub id: DecorationId,
    /// What to draw.
    pub kind: DecorationKind,
    /// Values of the kind's drawn attributes that the decoration has.
    pub attrs: BTreeMap<String, Value>,
}

impl DecorationDraw {
    /// Numeric attribute, or `fallback`.
    #[must_use]
    pub fn number(&self, name: &str, fallback: f64) -> f64 {
        self.attrs.get(name).map_or(fallback, |v| v.number_or(fallback))
    }
}

/// Attributes read for each decoration kind.
#[must_use]
pub fn drawn_attributes(kind: DecorationKind) -> &'static [&'static str] {
    match kind {
        DecorationKind::Outline => &["x", "y", "r", "lineWidth", "color", "alpha"],
        DecorationKind::Line => &["x", "y", "x2", "y2", "lineWidth", "color", "alpha"],
        DecorationKind::Text => &["x", "y", "text", "font", "color", "alpha"],
        DecorationKind::Image => &["x", "y", "width", "height", "image", "alpha"],
    }
}

/// A drawing surface driven by [`Scatterplot`](super::Scatterplot).
pub trait RenderBackend {
    /// Backend handle of the shared point sprite.
    type Texture;

    /// Replace the point instance buffer.
    fn upload_points(&mut self, instances: &[PointInstance], texture: &Self::Texture);

    /// Draw the uploaded points at `current_time` (ms on the mark set
    /// clock), interpolating their segments.
    fn draw(&mut self, current_time: f64);

    /// Draw one decoration on top of the points.
    fn draw_decoration(&mut self, decoration: &DecorationDraw);
}
