//! Criterion benchmarks for framescope.
#![allow(unused_results, missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use framescope::animation::{EasingFunction, Interpolator};
use framescope::data::{frame_schema, ColumnarData, ColumnarFrame};
use framescope::marks::{Mark, MarkAttribute, MarkSet};
use framescope::preview::{FramePreview, ProjectionPreview};
use framescope::Value;

fn easing_benchmark(c: &mut Criterion) {
    let f = EasingFunction::CubicHermite { c1: 0.33, c2: 1.0 };
    c.bench_function("cubic_hermite_easing", |b| {
        b.iter(|| black_box(f.evaluate(black_box(0.5))))
    });
}

fn mark_set(count: i64) -> MarkSet {
    MarkSet::new(
        (0..count)
            .map(|id| {
                Mark::new(
                    id,
                    [
                        ("x", MarkAttribute::new(id as f64)),
                        ("y", MarkAttribute::new(0.0)),
                        ("alpha", MarkAttribute::new(1.0)),
                    ],
                )
            })
            .collect(),
    )
}

fn mark_set_tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mark_set_tick");

    for count in [100_i64, 1_000, 10_000] {
        group.bench_function(format!("{count}_marks"), |b| {
            b.iter_batched(
                || {
                    let mut set = mark_set(count);
                    set.animate_all(
                        "y",
                        |mark, _| Interpolator::to(mark.id() as f64 * 0.5),
                        1000.0,
                        EasingFunction::EaseInOut,
                    );
                    set
                },
                |mut set| black_box(set.advance(16.0)),
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn frame(count: i64, skew: f64) -> ColumnarFrame {
    let records = (0..count).map(|id| {
        let angle = id as f64 * 0.37;
        let json = serde_json::json!({
            "x": angle.cos() * id as f64 + skew * (id % 7) as f64,
            "y": angle.sin() * id as f64,
            "alpha": 1.0, "r": 1.0, "color": 0.0,
            "highlight": [], "visible": true,
        });
        let value: Value = serde_json::from_value(json).unwrap_or_default();
        (id, value)
    });
    let data = ColumnarData::from_records(frame_schema(), records)
        .unwrap_or_else(|_| ColumnarData::empty(frame_schema()));
    ColumnarFrame::new(data, "bench")
}

fn preview_benchmark(c: &mut Criterion) {
    let base = frame(2_000, 0.0);
    let candidate = frame(2_000, 3.0);
    let strategy = ProjectionPreview::default();
    c.bench_function("projection_preview_2000_points", |b| {
        b.iter(|| {
            black_box(FramePreview::compute(&base, &candidate, &strategy))
        })
    });
}

criterion_group!(
    benches,
    easing_benchmark,
    mark_set_tick_benchmark,
    preview_benchmark
);
criterion_main!(benches);
