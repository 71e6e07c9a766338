//! Time source for the board: real frame time in, scaled animation time out.

use std::time::Duration;
use tracing::debug;

/// Multiplier applied to frame time, with an optional timed override
/// (slow motion, time stop).
#[derive(Debug, Clone)]
pub struct TimeScale {
    default_scale: f32,
    scale: f32,
    /// Real time left before the override lapses.
    override_left: Option<Duration>,
    paused: bool,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl TimeScale {
    pub fn new(default_scale: f32) -> Self {
        let default_scale = default_scale.max(0.0);
        Self {
            default_scale,
            scale: default_scale,
            override_left: None,
            paused: false,
        }
    }

    /// Use `scale` for the next `duration` of real time, replacing any running override.
    pub fn set_scale(&mut self, scale: f32, duration: Duration) {
        self.scale = scale.max(0.0);
        self.override_left = Some(duration);
        debug!(target: "board", scale = self.scale, ?duration, "time_scale_set");
    }

    /// Drop any override now.
    pub fn reset(&mut self) {
        self.scale = self.default_scale;
        self.override_left = None;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn current(&self) -> f32 {
        if self.paused { 0.0 } else { self.scale }
    }

    /// Consume `real` frame time and return the animation time it stands for.
    /// An override that lapses mid-frame only scales the part of the frame it covered.
    pub fn scaled(&mut self, real: Duration) -> Duration {
        if self.paused {
            return Duration::ZERO;
        }
        let Some(left) = self.override_left else {
            return real.mul_f64(f64::from(self.scale));
        };
        if real < left {
            self.override_left = Some(left - real);
            return real.mul_f64(f64::from(self.scale));
        }
        let covered = left.mul_f64(f64::from(self.scale));
        let rest = (real - left).mul_f64(f64::from(self.default_scale));
        self.reset();
        covered + rest
    }
}
