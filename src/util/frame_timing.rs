use web_time::{Duration, Instant};

use crate::options::RenderOptions;

fn interval(fps: u32) -> Duration {
    if fps > 0 {
        Duration::from_secs_f64(1.0 / f64::from(fps))
    } else {
        Duration::ZERO
    }
}

/// Tick cadence with FPS smoothing and separate animating/idle limits.
#[derive(Debug, Clone)]
pub struct FrameTiming {
    /// Target FPS while animating (0 = unlimited)
    target_fps: u32,
    /// Target FPS while idle (0 = no idle ticks)
    idle_fps: u32,
    /// Minimum tick duration while animating
    min_frame_duration: Duration,
    /// Minimum tick duration while idle
    idle_frame_duration: Duration,
    /// Last tick timestamp
    last_frame: Instant,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
}

impl FrameTiming {
    /// Timer with the given animating FPS (0 = unlimited) that stops
    /// ticking when idle.
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        Self::with_idle(target_fps, 0)
    }

    /// Timer with separate animating and idle rates.
    #[must_use]
    pub fn with_idle(target_fps: u32, idle_fps: u32) -> Self {
        Self {
            target_fps,
            idle_fps,
            min_frame_duration: interval(target_fps),
            idle_frame_duration: interval(idle_fps),
            last_frame: Instant::now(),
            smoothed_fps: 60.0,
            smoothing: 0.05,
        }
    }

    /// Timer configured from [`RenderOptions`].
    #[must_use]
    pub fn from_options(options: &RenderOptions) -> Self {
        Self::with_idle(options.target_fps, options.idle_fps)
    }

    /// Whether enough time has passed for the next tick. `animating`
    /// selects the full rate; otherwise the idle rate applies, and an idle
    /// rate of 0 never ticks.
    #[must_use]
    pub fn should_render(&self, animating: bool) -> bool {
        if animating {
            self.target_fps == 0
                || self.last_frame.elapsed() >= self.min_frame_duration
        } else {
            self.idle_fps > 0
                && self.last_frame.elapsed() >= self.idle_frame_duration
        }
    }

    /// Time between ticks at the current cadence; `None` when idle ticking
    /// is off.
    #[must_use]
    pub fn frame_interval(&self, animating: bool) -> Option<Duration> {
        match (animating, self.idle_fps) {
            (true, _) => Some(self.min_frame_duration),
            (false, 0) => None,
            (false, _) => Some(self.idle_frame_duration),
        }
    }

    /// Call after each tick. Returns the elapsed time since the previous
    /// tick in milliseconds.
    pub fn end_frame(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;

        let frame_time = elapsed.as_secs_f32();
        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                + instant_fps * self.smoothing;
        }
        elapsed.as_secs_f64() * 1000.0
    }

    /// Smoothed ticks per second.
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}
