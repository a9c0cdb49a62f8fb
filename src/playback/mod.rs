mod clock;
mod scheduler;

pub use clock::*;
pub use scheduler::*;

use std::time::Duration;

/// Real-time cadence of playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    /// Wall time per simulated minute while playing.
    pub tick_interval: Duration,
    /// Wall time between frame boundaries.
    pub frame_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            frame_interval: Duration::from_millis(16),
        }
    }
}

impl PlaybackConfig {
    /// Scales the default tick interval. A factor of 2 plays twice as fast.
    /// Non-positive factors leave the interval unchanged.
    pub fn speed(mut self, factor: f64) -> Self {
        if factor.is_finite() && factor > 0.0 {
            self.tick_interval = Self::default().tick_interval.div_f64(factor);
        }
        self
    }

    /// Simulated seconds per wall-clock second.
    pub fn ratio(&self) -> f64 {
        60.0 / self.tick_interval.as_secs_f64()
    }
}

#[test]
fn default_ratio_is_600() {
    let config = PlaybackConfig::default();
    assert!((config.ratio() - 600.0).abs() < 1e-9);
    assert_eq!(config.speed(2.0).tick_interval.as_millis(), 50);
    assert_eq!(config.speed(0.0).tick_interval, Duration::from_millis(100));
}
