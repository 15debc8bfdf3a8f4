//! Animation lifecycle errors
//!
//! None of these are recoverable user errors: they indicate a component
//! touching a value after unmount, or a handle outliving its scheduler.
//! The panicking store operations report them with these messages.

use thiserror::Error;

use crate::store::{ListenerId, ValueId};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AnimationError {
    #[error("animated value {0:?} does not exist (destroyed or never created)")]
    UnknownValue(ValueId),

    #[error("listener {0:?} is not registered")]
    UnknownListener(ListenerId),

    #[error("animation scheduler has been dropped")]
    SchedulerGone,

    #[error("animation scheduler has no dispatcher to deliver notifications")]
    NoDispatcher,
}

pub type Result<T> = std::result::Result<T, AnimationError>;
