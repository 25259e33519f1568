use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f64,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame pacing parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClockConfig {
    /// Lower delta-time clamp; keeps tight loops from reporting zero.
    pub dt_min: Duration,

    /// Upper delta-time clamp; bounds the step after a stall.
    pub dt_max: Duration,

    /// Frame-rate cap. `0` disables pacing.
    pub target_fps: u32,

    /// The last part of each wait is spent spinning instead of sleeping.
    pub spin_threshold: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            dt_min: Duration::from_micros(100),
            dt_max: Duration::from_millis(250),
            target_fps: 60,
            spin_threshold: Duration::from_millis(2),
        }
    }
}

impl ClockConfig {
    /// Same clamps, no frame-rate cap.
    pub fn unlimited() -> Self {
        Self {
            target_fps: 0,
            ..Self::default()
        }
    }

    /// Duration of one frame at `target_fps`, if capped.
    pub fn frame_budget(&self) -> Option<Duration> {
        (self.target_fps > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(self.target_fps)))
    }
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Delta time is clamped to avoid pathological values when the application is paused
/// by the debugger, minimized, or stalls.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt: f64,
    config: ClockConfig,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_config(ClockConfig::default())
    }

    pub fn with_config(config: ClockConfig) -> Self {
        debug_assert!(config.dt_min <= config.dt_max);
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            dt: config.dt_min.as_secs_f64(),
            config,
        }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn set_target_fps(&mut self, fps: u32) {
        self.config.target_fps = fps;
    }

    /// Resets the clock baseline.
    ///
    /// Useful after the window is shown again or when resuming from suspension.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Delta time reported by the last `tick`, in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of ticks so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.config.dt_min, self.config.dt_max);

        self.last = now;
        self.dt = dt.as_secs_f64();

        let ft = FrameTime {
            dt: self.dt,
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    /// Blocks until one frame budget has passed since the last tick.
    ///
    /// Sleeps for the bulk of the wait and spins for the final
    /// `spin_threshold`, since `sleep` overshoots on most platforms.
    pub fn wait_for_next_frame(&self) {
        let Some(budget) = self.config.frame_budget() else {
            return;
        };
        let deadline = self.last + budget;

        let now = Instant::now();
        if deadline <= now {
            return;
        }
        let remaining = deadline - now;
        if remaining > self.config.spin_threshold {
            std::thread::sleep(remaining - self.config.spin_threshold);
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_counts_frames_and_clamps() {
        let mut clock = FrameClock::with_config(ClockConfig::unlimited());
        let a = clock.tick();
        let b = clock.tick();
        assert_eq!((a.frame_index, b.frame_index), (0, 1));
        assert_eq!(clock.frame_index(), 2);

        let cfg = clock.config();
        assert!(b.dt >= cfg.dt_min.as_secs_f64());
        assert!(b.dt <= cfg.dt_max.as_secs_f64());
    }

    #[test]
    fn long_stall_is_clamped_to_max() {
        let cfg = ClockConfig {
            dt_max: Duration::from_millis(1),
            ..ClockConfig::unlimited()
        };
        let mut clock = FrameClock::with_config(cfg);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.tick().dt, 0.001);
    }

    #[test]
    fn frame_budget_follows_target() {
        assert_eq!(ClockConfig::unlimited().frame_budget(), None);
        let cfg = ClockConfig { target_fps: 50, ..ClockConfig::default() };
        assert_eq!(cfg.frame_budget(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn wait_reaches_the_frame_deadline() {
        let mut clock = FrameClock::with_config(ClockConfig {
            target_fps: 100,
            ..ClockConfig::default()
        });
        clock.tick();
        let before = Instant::now();
        clock.wait_for_next_frame();
        clock.tick();
        assert!(before.elapsed() <= Duration::from_millis(200));
        assert!(clock.dt() >= 0.009);
    }

    #[test]
    fn unlimited_wait_returns_immediately() {
        let clock = FrameClock::with_config(ClockConfig::unlimited());
        let before = Instant::now();
        clock.wait_for_next_frame();
        assert!(before.elapsed() < Duration::from_millis(50));
    }
}
