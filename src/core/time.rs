//! Frame timing utilities

use std::time::{Duration, Instant};

/// Longest frame step handed to the simulation. A window drag or a long
/// synchronous chunk build would otherwise fling the camera across the map.
pub const MAX_FRAME_STEP: Duration = Duration::from_millis(250);

/// Tracks frame timing and calculates FPS
pub struct FrameTimer {
    start: Instant,
    last_frame: Instant,
    delta: Duration,
    frame_count: u64,
    fps_timer: Instant,
    fps: f32,
    fps_frame_count: u32,
    /// Slowest frame seen since the last FPS refresh
    worst_frame: Duration,
    worst_frame_reported: Duration,
}

impl FrameTimer {
    /// Create a new frame timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            delta: Duration::ZERO,
            frame_count: 0,
            fps_timer: now,
            fps: 0.0,
            fps_frame_count: 0,
            worst_frame: Duration::ZERO,
            worst_frame_reported: Duration::ZERO,
        }
    }

    /// Call once per frame to update timing
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.record(now);
    }

    fn record(&mut self, now: Instant) {
        let raw = now.saturating_duration_since(self.last_frame);
        self.delta = raw.min(MAX_FRAME_STEP);
        self.last_frame = now;
        self.frame_count += 1;
        self.fps_frame_count += 1;
        self.worst_frame = self.worst_frame.max(raw);

        // Update FPS every second
        let fps_elapsed = now.saturating_duration_since(self.fps_timer);
        if fps_elapsed >= Duration::from_secs(1) {
            self.fps = self.fps_frame_count as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = 0;
            self.fps_timer = now;
            self.worst_frame_reported = self.worst_frame;
            self.worst_frame = Duration::ZERO;
        }
    }

    /// Get delta time in seconds, clamped to [`MAX_FRAME_STEP`]
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Seconds since the timer was created
    pub fn elapsed_secs(&self) -> f32 {
        self.last_frame.saturating_duration_since(self.start).as_secs_f32()
    }

    /// Get current FPS (updated every second)
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Slowest unclamped frame of the last full second, in milliseconds.
    /// Synchronous chunk generation shows up here as stutter.
    pub fn worst_frame_ms(&self) -> f32 {
        self.worst_frame_reported.as_secs_f32() * 1000.0
    }

    /// Get total frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
