//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. What a key
//! means depends on where focus is: a parameter field claims Enter and
//! Escape, the canvas only reacts to Escape (abandon a drag).

use crate::input::Modifiers;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Parameter editing ──
    SaveParams,
    CancelEdit,

    // ── Canvas ──
    CancelDrag,
}

/// Where keyboard focus is when the key arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutScope {
    Canvas,
    /// A parameter input of a tool card.
    ParamField,
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"Enter"`).
    /// Returns `None` if the key combo has no binding in `scope`.
    pub fn resolve(key: &str, modifiers: Modifiers, scope: ShortcutScope) -> Option<ShortcutAction> {
        match scope {
            ShortcutScope::ParamField => match key {
                // Shift+Enter is a newline in multi-line fields
                "Enter" if !modifiers.shift => Some(ShortcutAction::SaveParams),
                "Escape" | "Esc" => Some(ShortcutAction::CancelEdit),
                _ => None,
            },
            ShortcutScope::Canvas => match key {
                "Escape" | "Esc" => Some(ShortcutAction::CancelDrag),
                _ => None,
            },
        }
    }
}
