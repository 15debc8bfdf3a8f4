//! Floating action button
//!
//! Pops in on mount, shrinks while pressed and rotates its icon when toggled
//! open (a "+" turning into an "x").

use lumo_animation::{
    AnimValue, AnimatedValue, Easing, SchedulerHandle, SpringConfig, Transition,
};
use lumo_core::{Color, Dispatcher};

use crate::press::{PressBridge, PressConfig, PressState};
use crate::style::{StyleSource, VisualStyle};

/// Floating action button configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FabConfig {
    pub press: PressConfig,
    /// Icon rotation when open
    pub open_rotation_deg: f32,
    pub rotation_spring: SpringConfig,
    /// Play the pop-in sequence on mount
    pub entrance: bool,
    /// Peak scale of the pop-in
    pub pop_scale: f32,
    pub pop_ms: f32,
    pub background: Color,
}

impl Default for FabConfig {
    fn default() -> Self {
        Self {
            press: PressConfig::new(0.9),
            open_rotation_deg: 45.0,
            rotation_spring: SpringConfig::wobbly(),
            entrance: true,
            pop_scale: 1.15,
            pop_ms: 180.0,
            background: Color::from_hex(0xFF4081),
        }
    }
}

impl FabConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pressed_scale(mut self, scale: f32) -> Self {
        self.press.pressed_scale = scale;
        self
    }

    pub fn open_rotation(mut self, degrees: f32) -> Self {
        self.open_rotation_deg = degrees;
        self
    }

    pub fn rotation_spring(mut self, spring: SpringConfig) -> Self {
        self.rotation_spring = spring;
        self
    }

    pub fn entrance(mut self, entrance: bool) -> Self {
        self.entrance = entrance;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }
}

fn fab_style(readings: &[AnimValue]) -> VisualStyle {
    let press = readings[0].as_scalar();
    let entrance = readings[2].as_scalar();
    VisualStyle::new()
        .with_scale(press * entrance)
        .with_rotation(readings[1].as_scalar())
}

pub struct FloatingActionButton {
    config: FabConfig,
    press: PressBridge,
    rotation: AnimatedValue,
    entrance: AnimatedValue,
    open: bool,
    style: StyleSource,
}

impl FloatingActionButton {
    pub fn new(handle: SchedulerHandle, dispatcher: Dispatcher, config: FabConfig) -> Self {
        let press = PressBridge::new(handle.clone(), dispatcher, config.press);
        let rotation = AnimatedValue::new(handle.clone(), 0.0_f32);

        let entrance = if config.entrance {
            let mut entrance = AnimatedValue::new(handle.clone(), 0.0_f32);
            entrance.animate(Transition::sequence([
                Transition::timing(config.pop_scale, config.pop_ms, Easing::EaseOutCubic),
                Transition::spring(1.0_f32, SpringConfig::stiff()),
            ]));
            entrance
        } else {
            AnimatedValue::new(handle.clone(), 1.0_f32)
        };

        let style = StyleSource::new(handle, &[press.value(), &rotation, &entrance], fab_style);
        Self {
            config,
            press,
            rotation,
            entrance,
            open: false,
            style,
        }
    }

    pub fn on_press<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.press.set_on_press(callback);
        self
    }

    /// Rotate the icon to its open or closed angle
    pub fn set_open(&mut self, open: bool) {
        if self.open == open {
            return;
        }
        self.open = open;
        let target = if open {
            self.config.open_rotation_deg
        } else {
            0.0
        };
        self.rotation
            .animate(Transition::spring(target, self.config.rotation_spring));
    }

    pub fn toggle(&mut self) {
        self.set_open(!self.open);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn press_state(&self) -> PressState {
        self.press.state()
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.press.set_disabled(disabled);
    }

    pub fn gesture_start(&mut self) -> bool {
        self.press.gesture_start()
    }

    pub fn gesture_end(&mut self) -> bool {
        self.press.gesture_end()
    }

    pub fn gesture_cancel(&mut self) -> bool {
        self.press.gesture_cancel()
    }

    pub fn style(&mut self) -> VisualStyle {
        self.style
            .evaluate(&[self.press.value(), &self.rotation, &self.entrance])
            .with_color(self.config.background)
    }
}
