//! Press gesture bridge
//!
//! Turns presentation-layer gesture events into a press-scale animation and
//! exactly one application callback per completed press.
//!
//! State machine:
//!
//! ```text
//!          gesture_start
//!   Idle ───────────────▶ Pressed
//!    ▲                       │
//!    │  gesture_end          │  (callback posted)
//!    ├───────────────────────┤
//!    │  gesture_cancel       │  (no callback)
//!    └───────────────────────┘
//! ```
//!
//! Events that don't fit the current state are ignored. The callback is
//! posted through the [`Dispatcher`] the moment the gesture ends; it does not
//! wait for the release animation to settle.

use std::fmt;
use std::sync::Arc;

use lumo_animation::{AnimatedValue, SchedulerHandle, SpringConfig, Transition};
use lumo_core::Dispatcher;

/// Application callback for a completed press
pub type PressCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PressState {
    #[default]
    Idle,
    Pressed,
}

/// Press animation parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PressConfig {
    /// Scale at rest
    pub rest_scale: f32,
    /// Scale while held down
    pub pressed_scale: f32,
    pub spring: SpringConfig,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            rest_scale: 1.0,
            pressed_scale: 0.95,
            spring: SpringConfig::stiff(),
        }
    }
}

impl PressConfig {
    pub fn new(pressed_scale: f32) -> Self {
        Self {
            pressed_scale,
            ..Self::default()
        }
    }

    pub fn spring(mut self, spring: SpringConfig) -> Self {
        self.spring = spring;
        self
    }
}

pub struct PressBridge {
    state: PressState,
    config: PressConfig,
    scale: AnimatedValue,
    dispatcher: Dispatcher,
    on_press: Option<PressCallback>,
    disabled: bool,
    presses: u64,
}

impl PressBridge {
    pub fn new(handle: SchedulerHandle, dispatcher: Dispatcher, config: PressConfig) -> Self {
        Self {
            state: PressState::Idle,
            scale: AnimatedValue::new(handle, config.rest_scale),
            config,
            dispatcher,
            on_press: None,
            disabled: false,
            presses: 0,
        }
    }

    pub fn set_on_press<F>(&mut self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_press = Some(Arc::new(callback));
    }

    pub fn on_press<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.set_on_press(callback);
        self
    }

    /// Disabled bridges ignore new gestures; a press in progress is canceled
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.gesture_cancel();
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn state(&self) -> PressState {
        self.state
    }

    pub fn is_pressed(&self) -> bool {
        self.state == PressState::Pressed
    }

    /// Completed presses so far
    pub fn press_count(&self) -> u64 {
        self.presses
    }

    pub fn scale(&self) -> f32 {
        self.scale.get_scalar()
    }

    pub(crate) fn value(&self) -> &AnimatedValue {
        &self.scale
    }

    /// Pointer down. Returns true if the event was accepted.
    pub fn gesture_start(&mut self) -> bool {
        if self.disabled || self.state != PressState::Idle {
            return false;
        }
        self.state = PressState::Pressed;
        self.scale
            .animate(Transition::spring(self.config.pressed_scale, self.config.spring));
        true
    }

    /// Pointer up inside the element: completes the press
    pub fn gesture_end(&mut self) -> bool {
        if self.state != PressState::Pressed {
            return false;
        }
        self.release();
        self.presses += 1;

        if let Some(callback) = &self.on_press {
            let callback = Arc::clone(callback);
            if !self.dispatcher.dispatch(move || callback()) {
                tracing::warn!("PressBridge: logic context is gone, press callback dropped");
            }
        }
        true
    }

    /// Pointer left the element or the gesture was interrupted
    pub fn gesture_cancel(&mut self) -> bool {
        if self.state != PressState::Pressed {
            return false;
        }
        self.release();
        true
    }

    fn release(&mut self) {
        self.state = PressState::Idle;
        self.scale
            .animate(Transition::spring(self.config.rest_scale, self.config.spring));
    }
}

impl fmt::Debug for PressBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PressBridge")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("disabled", &self.disabled)
            .field("presses", &self.presses)
            .finish_non_exhaustive()
    }
}
