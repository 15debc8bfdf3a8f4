//! Lumo Animation System
//!
//! Animated values that live outside the component logic context and are
//! advanced once per rendering tick.
//!
//! # Features
//!
//! - **Value Store**: Arena of scalar and pair values with generational handles
//! - **Spring Physics**: RK4-integrated springs that inherit velocity when retargeted
//! - **Timing Curves**: Fixed-duration transitions with easing functions
//! - **Combinators**: Sequence, repeat (with alternation) and delay, nesting freely
//! - **Derived Styles**: Pure, version-cached functions of animated values
//! - **Scheduler**: Manual or background ticking, settle completions posted
//!   back to the logic context
//! - **Motion Files**: TOML presets for springs, timings and transitions

pub mod config;
pub mod derived;
pub mod easing;
pub mod error;
pub mod scheduler;
pub mod spring;
pub mod store;
pub mod timing;
pub mod transition;
pub mod values;

pub use config::{ConfigError, MotionConfig, MotionFile, ResolvedValue, ValueEntry};
pub use derived::{derive_style, DerivedStyle};
pub use easing::Easing;
pub use error::{AnimationError, Result};
pub use scheduler::{
    get_scheduler, is_scheduler_initialized, set_global_scheduler, try_get_scheduler,
    AnimatedValue, AnimationScheduler, SchedulerHandle, WakeCallback, DEFAULT_FPS, MAX_FRAME_DT,
};
pub use spring::{Spring, SpringConfig};
pub use store::{AnimationStore, Completion, Listener, ListenerId, TickReport, ValueId};
pub use timing::{Timing, TimingConfig};
pub use transition::{ActiveTransition, RepeatCount, Transition, TransitionStatus};
pub use values::{AnimValue, Interpolate};
