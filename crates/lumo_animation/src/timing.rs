//! Duration-based transitions

use serde::{Deserialize, Serialize};

use crate::easing::Easing;
use crate::values::{AnimValue, Interpolate};

/// Shortest accepted duration; zero or negative durations finish on the first tick
pub const MIN_DURATION_MS: f32 = 1.0;

/// Configuration for a timing transition
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub duration_ms: f32,
    pub easing: Easing,
}

impl TimingConfig {
    pub fn new(duration_ms: f32, easing: Easing) -> Self {
        Self {
            duration_ms,
            easing,
        }
    }

    pub fn linear(duration_ms: f32) -> Self {
        Self::new(duration_ms, Easing::Linear)
    }

    pub fn sanitized(self) -> Self {
        if self.duration_ms.is_finite() && self.duration_ms >= MIN_DURATION_MS {
            return self;
        }
        tracing::warn!(
            "TimingConfig: clamped duration {}ms to {}ms",
            self.duration_ms,
            MIN_DURATION_MS
        );
        Self {
            duration_ms: MIN_DURATION_MS,
            ..self
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::new(300.0, Easing::EaseInOutQuad)
    }
}

/// A running timing interpolation between two values
#[derive(Clone, Debug)]
pub struct Timing {
    from: AnimValue,
    to: AnimValue,
    config: TimingConfig,
    elapsed_ms: f32,
}

impl Timing {
    pub fn new(from: AnimValue, to: AnimValue, config: TimingConfig) -> Self {
        Self {
            from,
            to: to.shaped_like(&from),
            config: config.sanitized(),
            elapsed_ms: 0.0,
        }
    }

    /// Linear progress in `0.0..=1.0`
    pub fn progress(&self) -> f32 {
        (self.elapsed_ms / self.config.duration_ms).clamp(0.0, 1.0)
    }

    pub fn value(&self) -> AnimValue {
        if self.is_settled() {
            return self.to;
        }
        self.from
            .lerp(&self.to, self.config.easing.apply(self.progress()))
    }

    pub fn is_settled(&self) -> bool {
        self.elapsed_ms >= self.config.duration_ms
    }

    /// Advance by `dt_ms` milliseconds and return the new value
    pub fn step(&mut self, dt_ms: f32) -> AnimValue {
        self.elapsed_ms += dt_ms.max(0.0);
        self.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_midpoint_and_end() {
        let mut timing = Timing::new(
            0.0_f32.into(),
            100.0_f32.into(),
            TimingConfig::linear(1000.0),
        );

        assert_eq!(timing.step(500.0), AnimValue::Scalar(50.0));
        assert!(!timing.is_settled());

        assert_eq!(timing.step(500.0), AnimValue::Scalar(100.0));
        assert!(timing.is_settled());
    }

    #[test]
    fn test_overshooting_elapsed_clamps_to_target() {
        let mut timing =
            Timing::new(10.0_f32.into(), 20.0_f32.into(), TimingConfig::default());
        assert_eq!(timing.step(10_000.0), AnimValue::Scalar(20.0));
        assert_eq!(timing.progress(), 1.0);
    }

    #[test]
    fn test_zero_duration_settles_on_first_tick() {
        let mut timing =
            Timing::new(0.0_f32.into(), 1.0_f32.into(), TimingConfig::linear(0.0));
        assert!(!timing.is_settled());
        assert_eq!(timing.step(16.0), AnimValue::Scalar(1.0));
        assert!(timing.is_settled());
    }

    #[test]
    fn test_pair_values() {
        let mut timing = Timing::new(
            AnimValue::pair(0.0, 24.0),
            AnimValue::pair(0.0, 0.0),
            TimingConfig::linear(200.0),
        );
        assert_eq!(timing.step(100.0), AnimValue::pair(0.0, 12.0));
    }
}
