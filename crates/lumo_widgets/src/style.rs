//! Visual style snapshots
//!
//! Every widget reduces its animated values to a [`VisualStyle`], the only
//! thing the presentation layer reads when painting.

use lumo_animation::{AnimValue, AnimatedValue, DerivedStyle, SchedulerHandle};
use lumo_core::{Color, Vec2};
use serde::Serialize;
use smallvec::SmallVec;

/// Paint-ready properties of a widget for one frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VisualStyle {
    pub scale: f32,
    pub opacity: f32,
    pub rotation_deg: f32,
    pub translate: Vec2,
    /// Fill fraction in `0.0..=1.0` (progress indicators)
    pub fill: f32,
    pub color: Option<Color>,
}

impl Default for VisualStyle {
    fn default() -> Self {
        Self {
            scale: 1.0,
            opacity: 1.0,
            rotation_deg: 0.0,
            translate: Vec2::ZERO,
            fill: 0.0,
            color: None,
        }
    }
}

impl VisualStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation_deg = degrees;
        self
    }

    pub fn with_translate(mut self, translate: Vec2) -> Self {
        self.translate = translate;
        self
    }

    pub fn with_fill(mut self, fill: f32) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

pub(crate) type StyleFn = fn(&[AnimValue]) -> VisualStyle;

/// Cached style evaluation over a widget's own values
///
/// Falls back to reading the values directly once the scheduler is gone,
/// so a late paint after shutdown still gets the last known style.
pub(crate) struct StyleSource {
    handle: SchedulerHandle,
    derived: Option<DerivedStyle<VisualStyle>>,
    compute: StyleFn,
}

impl StyleSource {
    pub(crate) fn new(handle: SchedulerHandle, values: &[&AnimatedValue], compute: StyleFn) -> Self {
        let ids: Option<Vec<_>> = values.iter().map(|value| value.id()).collect();
        Self {
            handle,
            derived: ids.map(|ids| DerivedStyle::new(ids, compute)),
            compute,
        }
    }

    pub(crate) fn evaluate(&mut self, values: &[&AnimatedValue]) -> VisualStyle {
        if let Some(derived) = self.derived.as_mut() {
            if let Some(style) = self.handle.derive(derived) {
                return style;
            }
        }
        let readings: SmallVec<[AnimValue; 4]> = values.iter().map(|value| value.get()).collect();
        (self.compute)(&readings)
    }

    #[cfg(test)]
    pub(crate) fn recompute_count(&self) -> u64 {
        self.derived
            .as_ref()
            .map_or(0, DerivedStyle::recompute_count)
    }
}
