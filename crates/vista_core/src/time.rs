//! Snapshot interpolation timing
//!
//! Tracks a fractional render time, measured in simulation ticks, that lags
//! the latest verified frame by a configurable delay. Views sample their
//! interpolation buffers at `current_from` and `current_from + 1` and blend
//! with `alpha`.

use crate::frame::FrameNumber;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotInterpolationSettings {
    /// How far behind the latest verified frame rendering runs.
    pub delay_ticks: f32,
    /// Drift beyond which the timer snaps to its target instead of easing.
    pub max_drift_ticks: f32,
    /// Fraction of the current drift converted into playback speed change.
    pub drift_correction: f32,
}

impl Default for SnapshotInterpolationSettings {
    fn default() -> Self {
        Self {
            delay_ticks: 2.0,
            max_drift_ticks: 4.0,
            drift_correction: 0.1,
        }
    }
}

/// Render-side clock for snapshot interpolation.
pub struct SnapshotInterpolationTimer {
    settings: SnapshotInterpolationSettings,
    time: f64,
    current_from: FrameNumber,
    alpha: f32,
    started: bool,
}

impl SnapshotInterpolationTimer {
    pub fn new(settings: SnapshotInterpolationSettings) -> Self {
        Self {
            settings,
            time: 0.0,
            current_from: 0,
            alpha: 0.0,
            started: false,
        }
    }

    pub fn settings(&self) -> &SnapshotInterpolationSettings {
        &self.settings
    }

    /// Frame sampled as the "from" side of the blend.
    pub fn current_from(&self) -> FrameNumber {
        self.current_from
    }

    /// Blend factor between `current_from` and `current_from + 1`.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Advance by one render update.
    ///
    /// `tick_delta` is the fixed simulation step in seconds and
    /// `render_delta` the elapsed render time.
    pub fn advance(&mut self, latest_verified: FrameNumber, tick_delta: f32, render_delta: f32) {
        if tick_delta <= 0.0 {
            return;
        }

        let goal = latest_verified as f64 - self.settings.delay_ticks as f64;
        let drift = goal - self.time;

        if !self.started || drift.abs() > self.settings.max_drift_ticks as f64 {
            tracing::trace!(goal, drift, "snapshot interpolation timer snapped");
            self.time = goal;
            self.started = true;
        } else {
            let scale = 1.0 + (drift * self.settings.drift_correction as f64).clamp(-0.5, 0.5);
            self.time += (render_delta as f64 / tick_delta as f64) * scale;
        }

        // never run past the newest pair of samples
        let ceiling = (latest_verified - 1) as f64;
        if self.time > ceiling {
            self.time = ceiling;
        }

        let from = self.time.floor();
        self.current_from = from as FrameNumber;
        self.alpha = (self.time - from) as f32;
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
        self.current_from = 0;
        self.alpha = 0.0;
        self.started = false;
    }
}

impl Default for SnapshotInterpolationTimer {
    fn default() -> Self {
        Self::new(SnapshotInterpolationSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: f32 = 1.0 / 60.0;

    #[test]
    fn first_advance_snaps_behind_latest() {
        let mut timer = SnapshotInterpolationTimer::default();
        timer.advance(10, TICK, TICK);
        assert_eq!(timer.current_from(), 8);
        assert_eq!(timer.alpha(), 0.0);
    }

    #[test]
    fn half_tick_render_step_yields_half_alpha() {
        let mut timer = SnapshotInterpolationTimer::default();
        timer.advance(10, TICK, TICK);
        timer.advance(10, TICK, TICK * 0.5);
        assert_eq!(timer.current_from(), 8);
        assert!((timer.alpha() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn large_drift_snaps() {
        let mut timer = SnapshotInterpolationTimer::default();
        timer.advance(10, TICK, TICK);
        timer.advance(40, TICK, TICK);
        assert_eq!(timer.current_from(), 38);
    }

    #[test]
    fn never_passes_latest_pair() {
        let settings = SnapshotInterpolationSettings {
            delay_ticks: 0.0,
            ..Default::default()
        };
        let mut timer = SnapshotInterpolationTimer::new(settings);
        timer.advance(5, TICK, TICK);
        timer.advance(5, TICK, TICK * 3.0);
        assert_eq!(timer.current_from(), 4);
        assert_eq!(timer.alpha(), 0.0);
    }

    #[test]
    fn ignores_invalid_tick_delta() {
        let mut timer = SnapshotInterpolationTimer::default();
        timer.advance(10, 0.0, TICK);
        assert_eq!(timer.current_from(), 0);
    }
}
