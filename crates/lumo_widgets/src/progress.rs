//! Progress indicators
//!
//! - [`ProgressBar`]: linear bar whose fill eases toward the current progress
//!   and whose color follows a threshold table
//! - [`CircularProgress`]: indefinite spinner with a breathing opacity pulse

use lumo_animation::{AnimValue, AnimatedValue, Easing, RepeatCount, SchedulerHandle, Transition};
use lumo_core::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::style::{StyleSource, VisualStyle};

pub const MAX_PROGRESS: f32 = 100.0;

/// A threshold table mapping progress to a color
///
/// Each band starts at its threshold and runs up to the next one. Progress
/// below the first threshold uses the first band's color. Bands are always
/// sorted by threshold and never empty, including tables read from config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BandTable")]
pub struct ColorBands {
    bands: Vec<(f32, Color)>,
}

/// Unchecked band table as written in config files
#[derive(Deserialize)]
struct BandTable {
    bands: Vec<(f32, Color)>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ColorBandsError {
    #[error("color band table is empty")]
    Empty,

    #[error("color band threshold {0} is not a finite number")]
    NonFiniteThreshold(f32),
}

impl TryFrom<BandTable> for ColorBands {
    type Error = ColorBandsError;

    fn try_from(table: BandTable) -> Result<Self, Self::Error> {
        let mut bands = table.bands;
        if bands.is_empty() {
            return Err(ColorBandsError::Empty);
        }
        if let Some((threshold, _)) = bands.iter().find(|(t, _)| !t.is_finite()) {
            return Err(ColorBandsError::NonFiniteThreshold(*threshold));
        }
        // Stable, so equal thresholds keep their written order like `band()`
        bands.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { bands })
    }
}

impl Default for ColorBands {
    fn default() -> Self {
        Self::new(Color::RED)
            .band(40.0, Color::ORANGE)
            .band(60.0, Color::YELLOW)
            .band(80.0, Color::GREEN)
    }
}

impl ColorBands {
    /// A single band covering all progress values
    pub fn new(base: Color) -> Self {
        Self {
            bands: vec![(0.0, base)],
        }
    }

    /// Add a band starting at `threshold`
    pub fn band(mut self, threshold: f32, color: Color) -> Self {
        let at = self.bands.partition_point(|(t, _)| *t <= threshold);
        self.bands.insert(at, (threshold, color));
        self
    }

    pub fn color_for(&self, progress: f32) -> Color {
        let below = self.bands.partition_point(|(threshold, _)| *threshold <= progress);
        let (_, color) = self.bands[below.saturating_sub(1)];
        color
    }
}

/// Progress bar configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressBarConfig {
    /// Fill transition length
    pub duration_ms: f32,
    pub easing: Easing,
    pub bands: ColorBands,
}

impl Default for ProgressBarConfig {
    fn default() -> Self {
        Self {
            duration_ms: 800.0,
            easing: Easing::EaseOutCubic,
            bands: ColorBands::default(),
        }
    }
}

impl ProgressBarConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duration(mut self, duration_ms: f32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn bands(mut self, bands: ColorBands) -> Self {
        self.bands = bands;
        self
    }
}

fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        tracing::warn!("ProgressBar: NaN progress treated as 0");
        return 0.0;
    }
    progress.clamp(0.0, MAX_PROGRESS)
}

fn bar_style(readings: &[AnimValue]) -> VisualStyle {
    VisualStyle::new().with_fill(readings[0].as_scalar())
}

/// Linear progress bar
///
/// Mounting animates the fill from empty; later [`set_progress`] calls
/// retarget the same value, so an in-flight fill continues from where it is.
///
/// [`set_progress`]: ProgressBar::set_progress
pub struct ProgressBar {
    progress: f32,
    config: ProgressBarConfig,
    fill: AnimatedValue,
    style: StyleSource,
}

impl ProgressBar {
    pub fn new(handle: SchedulerHandle, progress: f32, config: ProgressBarConfig) -> Self {
        let fill = AnimatedValue::new(handle.clone(), 0.0_f32);
        let style = StyleSource::new(handle, &[&fill], bar_style);
        let mut bar = Self {
            progress: 0.0,
            config,
            fill,
            style,
        };
        bar.set_progress(progress);
        bar
    }

    /// Retarget the fill to `progress` percent (clamped to `0..=100`)
    pub fn set_progress(&mut self, progress: f32) {
        self.progress = clamp_progress(progress);
        self.fill.animate(Transition::timing(
            self.progress / MAX_PROGRESS,
            self.config.duration_ms,
            self.config.easing,
        ));
    }

    /// The logical (target) progress, not the animated reading
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Color for the current target progress
    pub fn color(&self) -> Color {
        self.config.bands.color_for(self.progress)
    }

    pub fn is_animating(&self) -> bool {
        self.fill.is_animating()
    }

    pub fn style(&mut self) -> VisualStyle {
        let color = self.color();
        self.style.evaluate(&[&self.fill]).with_color(color)
    }
}

/// Spinner configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircularProgressConfig {
    /// One full turn
    pub period_ms: f32,
    /// One half of the opacity pulse
    pub pulse_ms: f32,
    /// Opacity at the dim end of the pulse
    pub min_opacity: f32,
    pub color: Color,
}

impl Default for CircularProgressConfig {
    fn default() -> Self {
        Self {
            period_ms: 1000.0,
            pulse_ms: 800.0,
            min_opacity: 0.4,
            color: Color::from_hex(0x3F51B5),
        }
    }
}

impl CircularProgressConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(mut self, period_ms: f32) -> Self {
        self.period_ms = period_ms;
        self
    }

    pub fn pulse(mut self, pulse_ms: f32, min_opacity: f32) -> Self {
        self.pulse_ms = pulse_ms;
        self.min_opacity = min_opacity;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

fn spinner_style(readings: &[AnimValue]) -> VisualStyle {
    VisualStyle::new()
        .with_rotation(readings[0].as_scalar())
        .with_opacity(readings[1].as_scalar())
}

/// Indefinite spinner
///
/// Both of its transitions repeat forever; they stop only when the spinner
/// is dropped.
pub struct CircularProgress {
    config: CircularProgressConfig,
    rotation: AnimatedValue,
    opacity: AnimatedValue,
    style: StyleSource,
}

impl CircularProgress {
    pub fn new(handle: SchedulerHandle, config: CircularProgressConfig) -> Self {
        let mut rotation = AnimatedValue::new(handle.clone(), 0.0_f32);
        let mut opacity = AnimatedValue::new(handle.clone(), 1.0_f32);

        rotation.animate(
            Transition::timing(360.0_f32, config.period_ms, Easing::Linear)
                .repeat(RepeatCount::Indefinite, false),
        );
        opacity.animate(
            Transition::timing(config.min_opacity, config.pulse_ms, Easing::EaseInOutQuad)
                .repeat(RepeatCount::Indefinite, true),
        );

        let style = StyleSource::new(handle, &[&rotation, &opacity], spinner_style);
        Self {
            config,
            rotation,
            opacity,
            style,
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.rotation.is_animating()
    }

    pub fn style(&mut self) -> VisualStyle {
        self.style
            .evaluate(&[&self.rotation, &self.opacity])
            .with_color(self.config.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumo_animation::AnimationScheduler;
    use std::time::Duration;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn run(scheduler: &AnimationScheduler, frames: usize) {
        for _ in 0..frames {
            scheduler.tick_by(FRAME);
        }
    }

    #[test]
    fn test_color_bands_boundaries() {
        let bands = ColorBands::default();
        assert_eq!(bands.color_for(0.0), Color::RED);
        assert_eq!(bands.color_for(39.0), Color::RED);
        assert_eq!(bands.color_for(39.99), Color::RED);
        assert_eq!(bands.color_for(40.0), Color::ORANGE);
        assert_eq!(bands.color_for(59.0), Color::ORANGE);
        assert_eq!(bands.color_for(60.0), Color::YELLOW);
        assert_eq!(bands.color_for(79.0), Color::YELLOW);
        assert_eq!(bands.color_for(80.0), Color::GREEN);
        assert_eq!(bands.color_for(100.0), Color::GREEN);
    }

    #[test]
    fn test_color_bands_unordered_insert() {
        let bands = ColorBands::new(Color::BLACK)
            .band(50.0, Color::WHITE)
            .band(25.0, Color::RED);
        assert_eq!(bands.color_for(10.0), Color::BLACK);
        assert_eq!(bands.color_for(30.0), Color::RED);
        assert_eq!(bands.color_for(75.0), Color::WHITE);
    }

    #[test]
    fn test_color_bands_from_toml() {
        let bands: ColorBands = toml::from_str(
            r#"bands = [[0.0, 0xE53935], [50.0, { r = 0.0, g = 1.0, b = 0.0 }]]"#,
        )
        .unwrap();
        assert_eq!(bands.color_for(10.0), Color::from_hex(0xE53935));
        assert_eq!(bands.color_for(50.0), Color::rgb(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_color_bands_from_unsorted_toml() {
        let bands: ColorBands =
            toml::from_str("bands = [[80.0, 0x00FF00], [0.0, 0xFF0000]]").unwrap();
        assert_eq!(bands.color_for(10.0), Color::from_hex(0xFF0000));
        assert_eq!(bands.color_for(90.0), Color::from_hex(0x00FF00));
    }

    #[test]
    fn test_color_bands_reject_invalid_tables() {
        let err = toml::from_str::<ColorBands>("bands = []").unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = toml::from_str::<ColorBands>("bands = [[nan, 0xFF0000]]").unwrap_err();
        assert!(err.to_string().contains("finite"));
    }

    #[test]
    fn test_mount_animates_fill_from_zero() {
        let scheduler = AnimationScheduler::new();
        let mut bar = ProgressBar::new(
            scheduler.handle(),
            75.0,
            ProgressBarConfig::new().duration(500.0).easing(Easing::Linear),
        );

        assert_eq!(bar.style().fill, 0.0);
        assert!(bar.is_animating());

        run(&scheduler, 15);
        let mid = bar.style().fill;
        assert!(mid > 0.0 && mid < 0.75);

        run(&scheduler, 30);
        assert_eq!(bar.style().fill, 0.75);
        assert_eq!(bar.style().color, Some(Color::YELLOW));
    }

    #[test]
    fn test_set_progress_retargets_existing_value() {
        let scheduler = AnimationScheduler::new();
        let mut bar = ProgressBar::new(scheduler.handle(), 30.0, ProgressBarConfig::default());
        run(&scheduler, 10);
        let before = bar.style().fill;

        bar.set_progress(90.0);
        assert_eq!(scheduler.value_count(), 1);
        // Continues from the in-flight reading
        assert_eq!(bar.style().fill, before);
        assert_eq!(bar.color(), Color::GREEN);

        run(&scheduler, 120);
        assert_eq!(bar.style().fill, 0.9);
    }

    #[test]
    fn test_progress_is_clamped() {
        let scheduler = AnimationScheduler::new();
        let mut bar = ProgressBar::new(scheduler.handle(), 150.0, ProgressBarConfig::default());
        assert_eq!(bar.progress(), 100.0);
        bar.set_progress(-5.0);
        assert_eq!(bar.progress(), 0.0);
        bar.set_progress(f32::NAN);
        assert_eq!(bar.progress(), 0.0);
        assert_eq!(bar.color(), Color::RED);
    }

    #[test]
    fn test_style_cached_between_ticks() {
        let scheduler = AnimationScheduler::new();
        let mut bar = ProgressBar::new(scheduler.handle(), 50.0, ProgressBarConfig::default());
        bar.style();
        bar.style();
        assert_eq!(bar.style.recompute_count(), 1);
        run(&scheduler, 1);
        bar.style();
        assert_eq!(bar.style.recompute_count(), 2);
    }

    #[test]
    fn test_spinner_rotates_and_pulses() {
        let scheduler = AnimationScheduler::new();
        let mut spinner = CircularProgress::new(
            scheduler.handle(),
            CircularProgressConfig::new().period(1000.0).pulse(500.0, 0.4),
        );

        run(&scheduler, 15);
        let style = spinner.style();
        assert!(style.rotation_deg > 0.0 && style.rotation_deg < 360.0);
        assert!(style.opacity < 1.0 && style.opacity > 0.4 - 1e-4);

        // Many periods later it is still going
        run(&scheduler, 600);
        assert!(spinner.is_spinning());
        let style = spinner.style();
        assert!((0.0..=360.0).contains(&style.rotation_deg));
        assert!(style.opacity > 0.4 - 1e-4 && style.opacity <= 1.0 + 1e-4);
    }

    #[test]
    fn test_spinner_drop_cancels_transitions() {
        let scheduler = AnimationScheduler::new();
        let spinner = CircularProgress::new(scheduler.handle(), CircularProgressConfig::default());
        run(&scheduler, 3);
        assert_eq!(scheduler.value_count(), 2);
        assert!(scheduler.has_active_animations());

        drop(spinner);
        assert_eq!(scheduler.value_count(), 0);
        assert!(!scheduler.tick_by(FRAME));
    }
}
