/// Frame-rate accumulator driven by the host's frame delta.
pub struct FpsCounter {
    interval: f32,
    frame_count: u32,
    accumulated_time: f32,
    pub current_fps: f32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_interval(1.0)
    }

    /// Reports once per `interval` seconds.
    #[must_use]
    pub fn with_interval(interval: f32) -> Self {
        Self {
            interval: interval.max(f32::EPSILON),
            frame_count: 0,
            accumulated_time: 0.0,
            current_fps: 0.0,
        }
    }

    /// Counts one frame of `dt` seconds. Returns the average FPS when an
    /// interval has elapsed.
    pub fn update(&mut self, dt: f32) -> Option<f32> {
        self.frame_count += 1;
        self.accumulated_time += dt.max(0.0);

        if self.accumulated_time >= self.interval {
            self.current_fps = self.frame_count as f32 / self.accumulated_time;

            // Reset counter
            self.accumulated_time = 0.0;
            self.frame_count = 0;

            return Some(self.current_fps);
        }

        None
    }
}
