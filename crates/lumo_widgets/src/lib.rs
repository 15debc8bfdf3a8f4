//! Lumo Widget Library
//!
//! Animated learning-platform components built on `lumo_animation`.
//!
//! # Architecture
//!
//! Each widget owns its [`AnimatedValue`](lumo_animation::AnimatedValue)s and
//! exposes a `style()` method returning a [`VisualStyle`] snapshot for the
//! presentation layer. Interactive widgets route gestures through a
//! [`PressBridge`], which posts the application's press callback to the
//! logic context through a [`Dispatcher`](lumo_core::Dispatcher).
//!
//! # Example
//!
//! ```ignore
//! use lumo_widgets::prelude::*;
//!
//! let queue = CallbackQueue::new();
//! let scheduler = AnimationScheduler::new().with_dispatcher(queue.dispatcher());
//!
//! let mut fab = FloatingActionButton::new(scheduler.handle(), queue.dispatcher(), FabConfig::default())
//!     .on_press(|| println!("compose"));
//!
//! // Presentation layer, per frame
//! scheduler.tick();
//! let style = fab.style();
//!
//! // Logic context, per event-loop turn
//! queue.drain();
//! ```

pub mod card;
pub mod fab;
pub mod press;
pub mod progress;
pub mod style;

pub use card::{CardConfig, CourseCard};
pub use fab::{FabConfig, FloatingActionButton};
pub use press::{PressBridge, PressCallback, PressConfig, PressState};
pub use progress::{
    CircularProgress, CircularProgressConfig, ColorBands, ColorBandsError, ProgressBar,
    ProgressBarConfig, MAX_PROGRESS,
};
pub use style::VisualStyle;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::card::{CardConfig, CourseCard};
    pub use crate::fab::{FabConfig, FloatingActionButton};
    pub use crate::press::{PressBridge, PressConfig, PressState};
    pub use crate::progress::{
        CircularProgress, CircularProgressConfig, ColorBands, ProgressBar, ProgressBarConfig,
    };
    pub use crate::style::VisualStyle;
    pub use lumo_animation::{AnimationScheduler, SchedulerHandle};
    pub use lumo_core::{CallbackQueue, Color, Dispatcher, Vec2};
}
