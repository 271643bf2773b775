//! Input abstraction layer.
//!
//! Normalizes browser pointer and keyboard events into a unified
//! `InputEvent` enum consumed by the canvas controller. Coordinates are
//! canvas pixels.

/// Keyboard modifier state at the time of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// What the pointer landed on, as far as the host can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The drag handle of a card (or an element inside it).
    Handle,
    /// Any other part of a card: inputs, buttons, body text.
    Body,
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f64,
        y: f64,
        target: PointerTarget,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp {
        x: f64,
        y: f64,
    },
    Key {
        key: String,
        modifiers: Modifiers,
    },
}

impl InputEvent {
    pub fn from_pointer_down(x: f64, y: f64, on_handle: bool) -> Self {
        Self::PointerDown {
            x,
            y,
            target: if on_handle {
                PointerTarget::Handle
            } else {
                PointerTarget::Body
            },
        }
    }

    pub fn from_pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn from_pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp { x, y }
    }

    pub fn from_key(key: &str, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers,
        }
    }
}
