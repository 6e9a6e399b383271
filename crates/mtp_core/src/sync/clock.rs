//! Master clock abstraction (the video element's time base).

use std::time::Instant;

/// The playback clock every audio track is corrected against.
pub trait MasterClock {
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;
    /// Whether the clock is advancing.
    fn is_playing(&self) -> bool;
    /// Start or resume.
    fn play(&mut self);
    /// Pause, keeping position.
    fn pause(&mut self);
    /// Jump to a position (seconds, clamped at 0).
    fn seek(&mut self, secs: f64);
    /// Change the playback rate.
    fn set_rate(&mut self, rate: f32);
    /// Current playback rate.
    fn rate(&self) -> f32;
}

/// Software clock driven by `Instant`, for front-ends without a video surface.
///
/// Position is the time accumulated while paused plus the scaled time since
/// the last resume.
#[derive(Debug, Clone)]
pub struct WallClock {
    started_at: Option<Instant>,
    accumulated: f64,
    rate: f32,
}

impl WallClock {
    /// New paused clock at 0 with the given rate.
    pub fn new(rate: f32) -> Self {
        Self {
            started_at: None,
            accumulated: 0.0,
            rate,
        }
    }

    /// Fold the running segment into `accumulated`.
    fn settle(&mut self) {
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed().as_secs_f64() * f64::from(self.rate);
            self.started_at = Some(Instant::now());
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MasterClock for WallClock {
    fn current_time(&self) -> f64 {
        let running = self
            .started_at
            .map(|st| st.elapsed().as_secs_f64() * f64::from(self.rate))
            .unwrap_or(0.0);
        self.accumulated + running
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some()
    }

    fn play(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.settle();
        self.started_at = None;
    }

    fn seek(&mut self, secs: f64) {
        self.accumulated = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn set_rate(&mut self, rate: f32) {
        self.settle();
        self.rate = rate;
    }

    fn rate(&self) -> f32 {
        self.rate
    }
}
