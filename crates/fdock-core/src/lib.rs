#![forbid(unsafe_code)]

//! Core: geometry, pointer input, and drag gesture primitives.
//!
//! # Role in fdock
//! `fdock-core` is the input layer. It owns the coordinate types shared by the
//! layout model and the runtime, the normalized pointer events a host feeds
//! into the drag/drop state machine, and the drag-start threshold.
//!
//! # How it fits in the system
//! `fdock-layout` stores window bounds using [`geometry::Rect`]; the runtime
//! (`fdock-runtime`) consumes [`event::PointerEvent`] values and asks
//! [`gesture::DragThreshold`] whether a press has turned into a drag.

pub mod event;
pub mod geometry;
pub mod gesture;
pub mod logging;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
