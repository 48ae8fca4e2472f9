use std::collections::BTreeMap;

use super::backend::{drawn_attributes, DecorationDraw, RenderBackend};
use super::instance::{PointInstance, PreloadChannels};
use super::texture_pool::{TextureLease, TexturePool};
use crate::marks::{DecorationId, Mark, MarkSet, PointId};
use crate::options::RenderOptions;
use crate::util::FrameTiming;

/// Drives a [`RenderBackend`] from a [`MarkSet`], one tick at a time.
///
/// Point instances are re-uploaded on ticks where marks changed or were
/// animating on the CPU; shader-delegated channels keep animating from
/// their uploaded segments in between.
pub struct Scatterplot<B: RenderBackend> {
    backend: B,
    point_texture: TextureLease<B::Texture>,
    timing: FrameTiming,
    instances: Vec<PointInstance>,
    radius_scale: f32,
    needs_upload: bool,
    working: bool,
}

impl<B: RenderBackend> Scatterplot<B> {
    /// Wrap `backend`, retaining the shared point texture from `textures`.
    #[must_use]
    pub fn new(
        backend: B,
        textures: &TexturePool<B::Texture>,
        options: &RenderOptions,
    ) -> Self {
        Self {
            backend,
            point_texture: textures.acquire(),
            timing: FrameTiming::from_options(options),
            instances: Vec::new(),
            radius_scale: 1.0,
            needs_upload: true,
            working: true,
        }
    }

    /// The wrapped backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the wrapped backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Instances from the most recent upload.
    #[must_use]
    pub fn instances(&self) -> &[PointInstance] {
        &self.instances
    }

    /// Multiply every point radius by `scale`. Forces a re-upload.
    pub fn set_radius_scale(&mut self, scale: f32) {
        self.radius_scale = scale;
        self.needs_upload = true;
    }

    /// Force a re-upload on the next tick.
    pub fn invalidate(&mut self) {
        self.needs_upload = true;
    }

    /// Whether the caller should schedule a tick now.
    #[must_use]
    pub fn should_tick(&self) -> bool {
        self.needs_upload || self.timing.should_render(self.working)
    }

    /// Smoothed tick rate.
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.timing.fps()
    }

    /// Run one frame: advance `set` by `dt` ms, re-upload moving points,
    /// draw points then decorations. Returns whether anything is still
    /// animating.
    pub fn tick(&mut self, set: &mut MarkSet, dt: f64) -> bool {
        let changed = set.marks_changed() || set.marks_animating();
        self.working = set.advance(dt);
        let now = set.clock().now();

        if changed || self.needs_upload {
            self.rebuild(set, now);
            self.backend
                .upload_points(&self.instances, &self.point_texture);
            self.needs_upload = false;
        }
        self.backend.draw(now);

        let ids: Vec<DecorationId> =
            set.decorations().map(|(id, _)| id).collect();
        for draw in ids.into_iter().filter_map(|id| read_decoration(set, id)) {
            self.backend.draw_decoration(&draw);
        }

        let _ = self.timing.end_frame();
        self.working
    }

    fn rebuild(&mut self, set: &mut MarkSet, now: f64) {
        let channels = PreloadChannels {
            x: set.is_preloadable("x"),
            y: set.is_preloadable("y"),
            r: set.is_preloadable("r"),
            alpha: set.is_preloadable("alpha"),
        };
        let ids: Vec<PointId> = set.visible_marks().map(Mark::id).collect();
        self.instances.clear();
        for id in ids {
            if let Some(mark) = set.mark_by_id_mut(id) {
                self.instances.push(PointInstance::from_mark(
                    mark,
                    channels,
                    now,
                    self.radius_scale,
                ));
            }
        }
        log::trace!("uploaded {} point instances", self.instances.len());
    }
}

fn read_decoration(
    set: &mut MarkSet,
    id: DecorationId,
) -> Option<DecorationDraw> {
    let kind = set.decoration(id)?.kind();
    let mut attrs = BTreeMap::new();
    for &name in drawn_attributes(kind) {
        if let Some(value) = set.decoration_attr(id, name) {
            let _ = attrs.insert(name.to_owned(), value);
        }
    }
    Some(DecorationDraw { id, kind, attrs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{EasingFunction, Interpolator};
    use crate::marks::{Decoration, DecorationKind, MarkAttribute};
    use crate::value::Value;

    #[derive(Default)]
    struct Recorder {
        uploads: Vec<Vec<PointInstance>>,
        draws: Vec<f64>,
        decorations: Vec<DecorationDraw>,
    }

    impl RenderBackend for Recorder {
        type Texture = &'static str;

        fn upload_points(&mut self, instances: &[PointInstance], texture: &&'static str) {
            assert_eq!(*texture, "dot");
            self.uploads.push(instances.to_vec());
        }

        fn draw(&mut self, current_time: f64) {
            self.draws.push(current_time);
        }

        fn draw_decoration(&mut self, decoration: &DecorationDraw) {
            self.decorations.push(decoration.clone());
        }
    }

    fn point(id: PointId, x: f64) -> Mark {
        Mark::new(
            id,
            [
                ("x", MarkAttribute::new(x)),
                ("y", MarkAttribute::new(0.0)),
                ("r", MarkAttribute::new(2.0)),
                ("alpha", MarkAttribute::new(1.0)),
            ],
        )
    }

    fn plot(pool: &TexturePool<&'static str>) -> Scatterplot<Recorder> {
        let _ = env_logger::builder().is_test(true).try_init();
        Scatterplot::new(Recorder::default(), pool, &RenderOptions::default())
    }

    #[test]
    fn uploads_once_until_marks_change() {
        let pool = TexturePool::new(|| "dot");
        let mut plot = plot(&pool);
        let mut set = MarkSet::new(vec![point(1, 0.0), point(2, 5.0)]);

        assert!(!plot.tick(&mut set, 16.0));
        assert!(!plot.tick(&mut set, 16.0));
        assert_eq!(plot.backend().uploads.len(), 1);
        assert_eq!(plot.backend().draws, vec![16.0, 32.0]);
        assert_eq!(plot.instances()[1].x[1], 5.0);

        set.animate_all("x", |_, _| Interpolator::to(10.0), 100.0, EasingFunction::Linear);
        assert!(set.marks_changed() || set.marks_animating());
        assert!(plot.tick(&mut set, 50.0));
        let last = plot.backend().uploads.last().unwrap();
        assert_eq!(last.len(), 2);
        assert!(last[0].x[0] > 0.0 && last[0].x[0] < 10.0);
    }

    #[test]
    fn preloaded_channels_upload_segments() {
        let pool = TexturePool::new(|| "dot");
        let mut plot = plot(&pool);
        let mut set = MarkSet::new(vec![point(1, 0.0), point(2, 5.0)]);
        set.register_preloadable_property("x");
        let _ = plot.tick(&mut set, 10.0);

        set.animate_preload("x", |_, _| Value::from(20.0), 400.0);
        assert!(!plot.tick(&mut set, 0.0));
        let uploaded = plot.backend().uploads.last().unwrap();
        assert_eq!(uploaded[0].x, [0.0, 20.0, 10.0, 410.0]);
        assert_eq!(uploaded[1].x, [5.0, 20.0, 10.0, 410.0]);
        // No further uploads while the shader animates.
        let _ = plot.tick(&mut set, 100.0);
        assert_eq!(plot.backend().uploads.len(), 2);
    }

    #[test]
    fn visible_subset_limits_instances() {
        let pool = TexturePool::new(|| "dot");
        let mut plot = plot(&pool);
        let mut set = MarkSet::new(vec![point(1, 0.0), point(2, 5.0), point(3, 9.0)]);
        set.set_visible_marks([3]);
        let _ = plot.tick(&mut set, 1.0);
        let uploaded = plot.backend().uploads.last().unwrap();
        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].x[0], 9.0);

        plot.set_radius_scale(3.0);
        let _ = plot.tick(&mut set, 1.0);
        assert_eq!(plot.instances()[0].r[0], 6.0);
    }

    #[test]
    fn decorations_follow_their_marks() {
        let pool = TexturePool::new(|| "dot");
        let mut plot = plot(&pool);
        let mut set = MarkSet::new(vec![point(1, 0.0), point(2, 5.0)]);
        let line = set.add_decoration(Decoration::new(
            DecorationKind::Line,
            vec![1, 2],
            [("lineWidth", crate::marks::DecorationAttribute::new(2.0))],
        ));
        let _ = plot.tick(&mut set, 1.0);

        let drawn = &plot.backend().decorations[0];
        assert_eq!(drawn.id, line);
        assert_eq!(drawn.kind, DecorationKind::Line);
        assert_eq!(drawn.number("x2", 0.0), 5.0);
        assert_eq!(drawn.number("lineWidth", 0.0), 2.0);
        assert_eq!(drawn.number("alpha", 0.0), 1.0);
        assert!(!drawn.attrs.contains_key("r"));
    }

    #[test]
    fn texture_is_released_with_the_plot() {
        let pool = TexturePool::new(|| "dot");
        let first = plot(&pool);
        let second = plot(&pool);
        assert_eq!(pool.retain_count(), 2);
        drop(first);
        assert!(pool.is_live());
        drop(second);
        assert!(!pool.is_live());
    }
}
