#![forbid(unsafe_code)]

//! Canonical pointer events.
//!
//! Hosts translate whatever their windowing toolkit reports into
//! [`PointerEvent`] values. Only the semantics the docking core consumes are
//! modelled: press, move, release, capture loss and explicit cancel.
//!
//! # Design Notes
//!
//! - Positions are screen coordinates (see [`crate::geometry`]).
//! - `Modifiers` use bitflags for easy combination.
//! - `CaptureLost` and `Cancel` both abort a gesture; they are kept apart so
//!   logs can tell a focus loss from an Escape press.

use bitflags::bitflags;

use crate::geometry::Point;

/// A pointer event delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub position: Point,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Create a pointer event without modifiers.
    #[must_use]
    pub const fn new(kind: PointerEventKind, position: Point) -> Self {
        Self {
            kind,
            position,
            modifiers: Modifiers::NONE,
        }
    }

    /// Set modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Whether this event terminates any gesture in progress.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(
            self.kind,
            PointerEventKind::CaptureLost | PointerEventKind::Cancel
        )
    }
}

/// What happened to the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    Down(PointerButton),
    Up(PointerButton),
    Moved,
    /// The host revoked pointer capture (focus change, window destroyed).
    CaptureLost,
    /// Explicit cancellation requested by the user, e.g. Escape.
    Cancel,
}

/// Pointer buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerButton {
    #[default]
    Left,
    Right,
    Middle,
}

bitflags! {
    /// Modifier keys held while the pointer event was produced.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const NONE  = 0b0000;
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}
