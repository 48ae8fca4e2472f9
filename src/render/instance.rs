//! Per-mark GPU instance records.

use crate::marks::Mark;
use crate::value::Value;

/// One animated channel: `[start, end, start_time, end_time]`.
///
/// The shader evaluates `t = clamp((now - start_time) / (end_time -
/// start_time), 0, 1)`, eases it with `t * t * (3 - 2t)` and mixes
/// `start..end`. A settled channel has `start == end`.
pub type Segment = [f32; 4];

/// GPU instance data for a single point (80 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointInstance {
    /// Horizontal position segment.
    pub x: Segment,
    /// Vertical position segment.
    pub y: Segment,
    /// Radius segment, already multiplied by the radius scale.
    pub r: Segment,
    /// Opacity segment.
    pub alpha: Segment,
    /// Fill color: rgb in [0, 1], w unused (1.0).
    pub color: [f32; 4],
}

/// Which point channels are animated by the shader rather than the CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadChannels {
    /// `x` is preloadable.
    pub x: bool,
    /// `y` is preloadable.
    pub y: bool,
    /// `r` is preloadable.
    pub r: bool,
    /// `alpha` is preloadable.
    pub alpha: bool,
}

impl PointInstance {
    /// Build the instance for `mark` at `now` (ms on the mark set clock).
    ///
    /// Preloadable channels carry the in-flight segment; the rest are
    /// settled at their current CPU value. Missing `r` defaults to 1 and
    /// missing `alpha` to 1.
    pub fn from_mark(
        mark: &mut Mark,
        channels: PreloadChannels,
        now: f64,
        radius_scale: f32,
    ) -> Self {
        let mut r = channel(mark, "r", channels.r, now, 1.0);
        r[0] *= radius_scale;
        r[1] *= radius_scale;
        Self {
            x: channel(mark, "x", channels.x, now, 0.0),
            y: channel(mark, "y", channels.y, now, 0.0),
            r,
            alpha: channel(mark, "alpha", channels.alpha, now, 1.0),
            color: mark.attr("color").map_or([0.0, 0.0, 0.0, 1.0], |c| rgb(&c)),
        }
    }

    /// Channel value at `now`, as the shader would compute it.
    #[must_use]
    pub fn evaluate(segment: Segment, now: f32) -> f32 {
        let [start, end, start_time, end_time] = segment;
        if end_time <= start_time {
            return end;
        }
        let t = ((now - start_time) / (end_time - start_time)).clamp(0.0, 1.0);
        let t = t * t * (3.0 - 2.0 * t);
        start + (end - start) * t
    }
}

fn settled(value: f64, now: f64) -> Segment {
    [value as f32, value as f32, now as f32, now as f32]
}

fn channel(mark: &mut Mark, name: &str, preload: bool, now: f64, fallback: f64) -> Segment {
    let id = mark.id();
    if preload {
        let segment = mark
            .attribute_mut(name)
            .and_then(|attr| attr.get_preload(&id, true, Some(now)));
        if let Some(segment) = segment {
            let start = segment.start.number_or(fallback);
            let end = segment.end.number_or(fallback);
            return [
                start as f32,
                end as f32,
                segment.start_time as f32,
                segment.end_time as f32,
            ];
        }
    }
    let value = mark.attr(name).map_or(fallback, |v| v.number_or(fallback));
    settled(value, now)
}

/// Parse a color value into normalized rgb.
///
/// Accepts `#rgb`/`#rrggbb` text, a packed `0xRRGGBB` number, or a list of
/// normalized channels. Anything else is black.
#[must_use]
pub fn rgb(value: &Value) -> [f32; 4] {
    let packed = match value {
        Value::Number(n) if n.is_finite() && *n >= 0.0 => Some(*n as u32),
        Value::Text(s) => parse_hex(s),
        Value::List(items) => {
            let mut out = [0.0, 0.0, 0.0, 1.0];
            for (slot, item) in out.iter_mut().zip(items.iter().take(3)) {
                *slot = item.number_or(0.0).clamp(0.0, 1.0) as f32;
            }
            return out;
        }
        _ => None,
    };
    packed.map_or([0.0, 0.0, 0.0, 1.0], |p| {
        [
            ((p >> 16) & 0xff) as f32 / 255.0,
            ((p >> 8) & 0xff) as f32 / 255.0,
            (p & 0xff) as f32 / 255.0,
            1.0,
        ]
    })
}

fn parse_hex(text: &str) -> Option<u32> {
    let hex = text.trim().strip_prefix('#')?;
    match hex.len() {
        6 => u32::from_str_radix(hex, 16).ok(),
        3 => {
            let short = u32::from_str_radix(hex, 16).ok()?;
            let (r, g, b) = ((short >> 8) & 0xf, (short >> 4) & 0xf, short & 0xf);
            Some(((r * 0x11) << 16) | ((g * 0x11) << 8) | (b * 0x11))
        }
        _ => None,
    }
}
