//! Lumo Core
//!
//! Foundational primitives shared by the Lumo motion crates:
//!
//! - **Color**: RGBA colors with linear interpolation and hex parsing
//! - **Vec2**: 2D vectors for paired animated values (translations, offsets)
//! - **Dispatch**: The hand-off queue that carries callbacks from the
//!   render/animation context back into application logic
//!
//! # Example
//!
//! ```rust
//! use lumo_core::dispatch::CallbackQueue;
//!
//! let queue = CallbackQueue::new();
//! let dispatcher = queue.dispatcher();
//!
//! // Render side: enqueue a callback
//! dispatcher.dispatch(|| println!("released"));
//!
//! // Logic side: run everything that was queued
//! assert_eq!(queue.drain(), 1);
//! ```

pub mod color;
pub mod dispatch;
pub mod geometry;

pub use color::Color;
pub use dispatch::{CallbackQueue, Dispatcher, Job};
pub use geometry::Vec2;
