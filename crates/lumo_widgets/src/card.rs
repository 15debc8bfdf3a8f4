//! Course card
//!
//! Fades and slides in on mount, staggered by its position in a list, and
//! sinks slightly while pressed.

use lumo_animation::{AnimValue, AnimatedValue, Easing, SchedulerHandle, Transition};
use lumo_core::{Dispatcher, Vec2};

use crate::press::{PressBridge, PressConfig, PressState};
use crate::style::{StyleSource, VisualStyle};

/// Course card configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CardConfig {
    pub press: PressConfig,
    /// Entrance fade and slide length
    pub entrance_ms: f32,
    pub entrance_easing: Easing,
    /// Extra entrance delay per list position
    pub stagger_ms: f32,
    /// Vertical offset the card slides in from
    pub slide_distance: f32,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            press: PressConfig::new(0.97),
            entrance_ms: 350.0,
            entrance_easing: Easing::EaseOutCubic,
            stagger_ms: 60.0,
            slide_distance: 24.0,
        }
    }
}

impl CardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pressed_scale(mut self, scale: f32) -> Self {
        self.press.pressed_scale = scale;
        self
    }

    pub fn entrance(mut self, duration_ms: f32, easing: Easing) -> Self {
        self.entrance_ms = duration_ms;
        self.entrance_easing = easing;
        self
    }

    pub fn stagger(mut self, stagger_ms: f32) -> Self {
        self.stagger_ms = stagger_ms;
        self
    }

    pub fn slide_distance(mut self, distance: f32) -> Self {
        self.slide_distance = distance;
        self
    }
}

fn card_style(readings: &[AnimValue]) -> VisualStyle {
    VisualStyle::new()
        .with_scale(readings[0].as_scalar())
        .with_opacity(readings[1].as_scalar())
        .with_translate(readings[2].as_pair())
}

pub struct CourseCard {
    index: usize,
    press: PressBridge,
    opacity: AnimatedValue,
    offset: AnimatedValue,
    style: StyleSource,
}

impl CourseCard {
    /// Mount the card at list position `index`
    pub fn new(
        handle: SchedulerHandle,
        dispatcher: Dispatcher,
        index: usize,
        config: CardConfig,
    ) -> Self {
        let press = PressBridge::new(handle.clone(), dispatcher, config.press);
        let mut opacity = AnimatedValue::new(handle.clone(), 0.0_f32);
        let mut offset =
            AnimatedValue::new(handle.clone(), Vec2::new(0.0, config.slide_distance));

        let delay_ms = index as f32 * config.stagger_ms;
        opacity.animate(
            Transition::timing(1.0_f32, config.entrance_ms, config.entrance_easing)
                .delayed(delay_ms),
        );
        offset.animate(
            Transition::timing(Vec2::ZERO, config.entrance_ms, config.entrance_easing)
                .delayed(delay_ms),
        );

        let style = StyleSource::new(handle, &[press.value(), &opacity, &offset], card_style);
        Self {
            index,
            press,
            opacity,
            offset,
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

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn press_state(&self) -> PressState {
        self.press.state()
    }

    /// True until the entrance has finished
    pub fn is_entering(&self) -> bool {
        self.opacity.is_animating() || self.offset.is_animating()
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
            .evaluate(&[self.press.value(), &self.opacity, &self.offset])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumo_animation::AnimationScheduler;
    use lumo_core::CallbackQueue;
    use std::time::Duration;

    const FRAME: Duration = Duration::from_millis(10);

    fn run(scheduler: &AnimationScheduler, frames: usize) {
        for _ in 0..frames {
            scheduler.tick_by(FRAME);
        }
    }

    #[test]
    fn test_entrance_fades_and_slides() {
        let scheduler = AnimationScheduler::new();
        let queue = CallbackQueue::new();
        let mut card = CourseCard::new(scheduler.handle(), queue.dispatcher(), 0, CardConfig::default());

        let start = card.style();
        assert_eq!(start.opacity, 0.0);
        assert_eq!(start.translate, Vec2::new(0.0, 24.0));

        run(&scheduler, 10);
        let mid = card.style();
        assert!(mid.opacity > 0.0 && mid.opacity < 1.0);
        assert!(mid.translate.y > 0.0 && mid.translate.y < 24.0);
        assert_eq!(mid.translate.x, 0.0);

        run(&scheduler, 40);
        let done = card.style();
        assert_eq!(done.opacity, 1.0);
        assert_eq!(done.translate, Vec2::ZERO);
        assert!(!card.is_entering());
    }

    #[test]
    fn test_stagger_delays_later_cards() {
        let scheduler = AnimationScheduler::new();
        let queue = CallbackQueue::new();
        let config = CardConfig::default().stagger(100.0);
        let mut first = CourseCard::new(scheduler.handle(), queue.dispatcher(), 0, config);
        let mut third = CourseCard::new(scheduler.handle(), queue.dispatcher(), 2, config);

        run(&scheduler, 15);
        assert!(first.style().opacity > 0.0);
        assert_eq!(third.style().opacity, 0.0);

        run(&scheduler, 10);
        assert!(third.style().opacity > 0.0);
        assert_eq!(third.index(), 2);
    }

    #[test]
    fn test_press_sinks_card() {
        let scheduler = AnimationScheduler::new();
        let queue = CallbackQueue::new();
        let mut card = CourseCard::new(scheduler.handle(), queue.dispatcher(), 0, CardConfig::default())
            .on_press(|| {});
        run(&scheduler, 50);

        card.gesture_start();
        run(&scheduler, 100);
        assert_eq!(card.style().scale, 0.97);

        card.gesture_cancel();
        run(&scheduler, 100);
        assert_eq!(card.style().scale, 1.0);
        assert_eq!(card.press_state(), PressState::Idle);
        assert_eq!(queue.pending(), 0);
    }
}
