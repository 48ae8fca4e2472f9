//! Stock frame and preview moves, timed by [`AnimationOptions`].
//!
//! A frame move sends every visible mark to its row in the target frame.
//! A preview stretches each mark's `x2`/`y2` pair toward its position in a
//! candidate frame, so a renderer can draw a line from where the point is
//! to where it would go.

use super::mark::Mark;
use super::mark_set::MarkSet;
use crate::animation::Interpolator;
use crate::data::ColumnarFrame;
use crate::options::AnimationOptions;
use crate::value::Value;

/// Numeric channels a frame move carries over.
const FRAME_CHANNELS: [&str; 4] = ["x", "y", "r", "alpha"];

/// Move visible marks to their `x`, `y`, `r` and `alpha` in `frame`.
///
/// Marks missing from the frame, and non-finite frame values, fall back to
/// the mark's own data value. With `animated` false the move is immediate.
pub fn move_to_frame(
    set: &mut MarkSet,
    frame: &ColumnarFrame,
    options: &AnimationOptions,
    animated: bool,
) {
    let duration = if animated { options.frame_duration_ms } else { 0.0 };
    for channel in FRAME_CHANNELS {
        let target = |mark: &Mark| {
            frame
                .data()
                .number(mark.id(), channel)
                .filter(|n| n.is_finite())
                .map_or_else(|| mark.data(channel).unwrap_or_default(), Value::from)
        };
        retarget(set, channel, target, duration, options);
    }
    log::debug!("moving marks to frame '{}' over {duration} ms", frame.title());
}

/// Stretch `x2`/`y2` toward each mark's position in `preview`, or pull them
/// back to `frame` when there is no preview.
pub fn show_preview(
    set: &mut MarkSet,
    frame: &ColumnarFrame,
    preview: Option<&ColumnarFrame>,
    options: &AnimationOptions,
    animated: bool,
) {
    let duration = if animated { options.preview_duration_ms } else { 0.0 };
    let destination = preview.unwrap_or(frame);
    let channels: [(&str, fn((f64, f64)) -> f64); 2] = [("x2", pick_x), ("y2", pick_y)];
    for (channel, pick) in channels {
        let target = |mark: &Mark| {
            destination
                .position(mark.id())
                .or_else(|| frame.position(mark.id()))
                .map(pick)
                .filter(|n| n.is_finite())
                .map_or_else(|| mark.data(channel).unwrap_or_default(), Value::from)
        };
        retarget(set, channel, target, duration, options);
    }
}

fn pick_x(position: (f64, f64)) -> f64 {
    position.0
}

fn pick_y(position: (f64, f64)) -> f64 {
    position.1
}

fn retarget<F>(
    set: &mut MarkSet,
    channel: &str,
    target: F,
    duration: f64,
    options: &AnimationOptions,
) where
    F: Fn(&Mark) -> Value,
{
    if !set.visible_marks().any(|mark| mark.has_attr(channel)) {
        return;
    }
    if duration <= 0.0 {
        set.set_all(channel, |mark, _| target(mark));
    } else if set.is_preloadable(channel) {
        set.animate_preload(channel, |mark, _| target(mark), duration);
    } else {
        set.animate_all(
            channel,
            |mark, _| Interpolator::To(target(mark)),
            duration,
            options.easing,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::EasingFunction;
    use crate::data::{frame_schema, ColumnarData};
    use crate::marks::{MarkAttribute, PointId};

    fn frame(points: &[(PointId, f64, f64)]) -> ColumnarFrame {
        let records = points.iter().map(|&(id, x, y)| {
            let json = serde_json::json!({ "x": x, "y": y, "alpha": 0.5 });
            (id, serde_json::from_value(json).unwrap())
        });
        let data = ColumnarData::from_records(frame_schema(), records).unwrap();
        ColumnarFrame::new(data, "t")
    }

    fn set() -> MarkSet {
        let mark = |id: PointId| {
            Mark::new(
                id,
                [
                    ("x", MarkAttribute::new(0.0)),
                    ("y", MarkAttribute::new(0.0)),
                    ("r", MarkAttribute::new(3.0)),
                    ("alpha", MarkAttribute::new(1.0)),
                    ("x2", MarkAttribute::new(0.0)),
                    ("y2", MarkAttribute::new(0.0)),
                ],
            )
        };
        MarkSet::new(vec![mark(1), mark(2), mark(3)])
    }

    fn num(set: &mut MarkSet, id: PointId, name: &str) -> f64 {
        set.mark_attr(id, name)
            .and_then(|v| v.as_f64())
            .unwrap_or(f64::NAN)
    }

    fn linear(frame_ms: f64, preview_ms: f64) -> AnimationOptions {
        AnimationOptions {
            frame_duration_ms: frame_ms,
            preview_duration_ms: preview_ms,
            easing: EasingFunction::Linear,
            ..AnimationOptions::default()
        }
    }

    #[test]
    fn frame_move_uses_frame_duration_and_easing() {
        let mut set = set();
        let target = frame(&[(1, 10.0, -4.0), (2, 2.0, 8.0)]);
        move_to_frame(&mut set, &target, &linear(200.0, 50.0), true);
        assert!(set.marks_animating());

        let _ = set.advance(100.0);
        assert!((num(&mut set, 1, "x") - 5.0).abs() < 1e-9);
        assert!((num(&mut set, 2, "y") - 4.0).abs() < 1e-9);
        assert!((num(&mut set, 1, "alpha") - 0.75).abs() < 1e-9);

        let _ = set.advance(110.0);
        assert!(!set.marks_animating());
        assert_eq!(num(&mut set, 1, "x"), 10.0);
        assert_eq!(num(&mut set, 1, "y"), -4.0);
        // No r column value and no row for mark 3: both keep their data.
        assert_eq!(num(&mut set, 1, "r"), 3.0);
        assert_eq!(num(&mut set, 3, "x"), 0.0);
    }

    #[test]
    fn unanimated_frame_move_is_immediate() {
        let mut set = set();
        let target = frame(&[(1, 7.0, 1.0)]);
        move_to_frame(&mut set, &target, &linear(200.0, 50.0), false);
        assert!(set.marks_changed());
        assert_eq!(num(&mut set, 1, "x"), 7.0);
        assert_eq!(num(&mut set, 1, "alpha"), 0.5);
    }

    #[test]
    fn preloadable_channels_hand_off_to_the_shader() {
        let mut set = set();
        set.register_preloadable_property("x");
        let target = frame(&[(1, 7.0, 1.0)]);
        move_to_frame(&mut set, &target, &linear(200.0, 50.0), true);
        let segment = set
            .mark_by_id_mut(1)
            .and_then(|m| m.attribute_mut("x"))
            .and_then(|a| a.get_preload(&1, true, Some(0.0)))
            .unwrap();
        assert_eq!(segment.end.as_f64(), Some(7.0));
        assert_eq!(segment.end_time - segment.start_time, 200.0);
    }

    #[test]
    fn preview_lines_extend_and_retract() {
        let mut set = set();
        let current = frame(&[(1, 1.0, 1.0), (2, 2.0, 2.0)]);
        let candidate = frame(&[(1, 9.0, 5.0)]);
        let options = linear(1000.0, 100.0);

        show_preview(&mut set, &current, Some(&candidate), &options, true);
        let _ = set.advance(50.0);
        assert!((num(&mut set, 1, "x2") - 4.5).abs() < 1e-9);
        let _ = set.advance(60.0);
        assert_eq!(num(&mut set, 1, "x2"), 9.0);
        assert_eq!(num(&mut set, 1, "y2"), 5.0);
        // Missing from the candidate: the line stays on the current frame.
        assert_eq!(num(&mut set, 2, "x2"), 2.0);

        show_preview(&mut set, &current, None, &options, false);
        assert_eq!(num(&mut set, 1, "x2"), 1.0);
        assert_eq!(num(&mut set, 1, "y2"), 1.0);
    }
}
