//! Drag controller: pointer sequences → position updates.
//!
//! State machine `Idle → Dragging → Idle`. The mode is fixed at
//! pointer-down from the viewport width:
//!
//! | Mode      | Move                              | Up                    |
//! |-----------|-----------------------------------|-----------------------|
//! | `Free`    | live `Moved` preview, clamped ≥ 0 | one `Committed`       |
//! | `Reorder` | `Reordered` per slot crossed      | nothing (already applied) |
//!
//! Global side effects (no text selection, grabbing cursor) belong to the
//! `DragSession`: applied when it opens, reverted when it closes, whether
//! by pointer-up, `cancel`, or the controller being dropped.

use crate::input::PointerTarget;
use serde::{Deserialize, Serialize};
use tc_core::id::ToolId;
use tc_core::layout::{LayoutConfig, PlacementMode};
use tc_core::model::{Position, ToolInstance};

/// Document-wide effects held for the duration of a drag.
pub trait DragEffects {
    fn begin(&mut self);
    fn end(&mut self);
}

/// For hosts without global styling.
#[derive(Debug, Default)]
pub struct NoEffects;

impl DragEffects for NoEffects {
    fn begin(&mut self) {}
    fn end(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DragConfig {
    /// Estimated card height on mobile; one slot per `item_height_px`
    /// of vertical travel, switching at the half-way point.
    pub item_height_px: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            item_height_px: 120.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    /// Absolute positioning (desktop).
    Free,
    /// Reordering within the list (mobile).
    Reorder,
}

impl From<PlacementMode> for DragMode {
    fn from(mode: PlacementMode) -> Self {
        match mode {
            PlacementMode::Flow => DragMode::Free,
            PlacementMode::Stack => DragMode::Reorder,
        }
    }
}

/// Output of the controller, applied by the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum DragUpdate {
    /// Live preview position (not committed to the store).
    Moved { id: ToolId, position: Position },
    /// Final position on pointer-up.
    Committed { id: ToolId, position: Position },
    /// Move the dragged tool from one list index to another.
    Reordered { id: ToolId, from: usize, to: usize },
    /// Drag abandoned; restore the starting position.
    Cancelled { id: ToolId, position: Position },
}

/// One in-progress drag.
#[derive(Debug, Clone)]
pub struct DragSession {
    pub id: ToolId,
    pub mode: DragMode,
    start_x: f64,
    start_y: f64,
    start_position: Position,
    /// Current (preview) position in free mode.
    pub position: Position,
    /// List index at drag start.
    origin_index: usize,
    /// Current list index in reorder mode.
    pub index: usize,
    len: usize,
}

impl DragSession {
    fn open(
        tool: &ToolInstance,
        index: usize,
        len: usize,
        x: f64,
        y: f64,
        mode: DragMode,
        effects: &mut dyn DragEffects,
    ) -> Self {
        effects.begin();
        Self {
            id: tool.id,
            mode,
            start_x: x,
            start_y: y,
            start_position: tool.position,
            position: tool.position,
            origin_index: index,
            index,
            len,
        }
    }

    fn close(self, effects: &mut dyn DragEffects) -> Self {
        effects.end();
        self
    }
}

pub struct DragController {
    layout: LayoutConfig,
    config: DragConfig,
    effects: Box<dyn DragEffects>,
    session: Option<DragSession>,
}

impl DragController {
    pub fn new(layout: LayoutConfig, config: DragConfig, effects: Box<dyn DragEffects>) -> Self {
        Self {
            layout,
            config,
            effects,
            session: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Start dragging `tool` (at `index` in a list of `len`) if the press
    /// is on its handle and no drag is already running. Returns whether a
    /// session opened.
    #[allow(clippy::too_many_arguments)]
    pub fn pointer_down(
        &mut self,
        tool: &ToolInstance,
        index: usize,
        len: usize,
        x: f64,
        y: f64,
        target: PointerTarget,
        viewport_width: f64,
    ) -> bool {
        if self.session.is_some() {
            log::debug!("drag: ignoring pointer-down on {} during active drag", tool.id);
            return false;
        }
        if target != PointerTarget::Handle {
            return false;
        }
        let mode = DragMode::from(PlacementMode::for_viewport(viewport_width, &self.layout));
        log::debug!("drag: start {} ({mode:?}) at ({x}, {y})", tool.id);
        self.session = Some(DragSession::open(
            tool,
            index,
            len,
            x,
            y,
            mode,
            self.effects.as_mut(),
        ));
        true
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<DragUpdate> {
        let ppu = self.layout.px_per_unit;
        let item_h = self.config.item_height_px;
        let session = self.session.as_mut()?;

        match session.mode {
            DragMode::Free => {
                let dx = (x - session.start_x) / ppu;
                let dy = (y - session.start_y) / ppu;
                let position = session.start_position.offset_clamped(dx, dy);
                if position == session.position {
                    return None;
                }
                session.position = position;
                log::trace!("drag: {} → {:?}", session.id, position);
                Some(DragUpdate::Moved {
                    id: session.id,
                    position,
                })
            }
            DragMode::Reorder => {
                if session.len < 2 || item_h <= 0.0 {
                    return None;
                }
                let steps = ((y - session.start_y) / item_h).round() as i64;
                let last = session.len as i64 - 1;
                let target = (session.index as i64 + steps).clamp(0, last) as usize;
                if target == session.index {
                    return None;
                }
                let from = session.index;
                // Rebase by the slots actually moved so later steps count
                // from the new slot, keeping any sub-slot remainder.
                session.start_y += (target as f64 - from as f64) * item_h;
                session.index = target;
                log::trace!("drag: {} slot {from} → {target}", session.id);
                Some(DragUpdate::Reordered {
                    id: session.id,
                    from,
                    to: target,
                })
            }
        }
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> Option<DragUpdate> {
        // The release point is the final free position. Reorders only
        // happen on move so the list never jumps on release.
        if self.session.as_ref()?.mode == DragMode::Free {
            let _ = self.pointer_move(x, y);
        }
        let session = self.session.take()?.close(self.effects.as_mut());
        log::debug!("drag: end {}", session.id);
        match session.mode {
            DragMode::Free => Some(DragUpdate::Committed {
                id: session.id,
                position: session.position,
            }),
            DragMode::Reorder => None,
        }
    }

    /// Abandon the drag (Escape, unmount). Free drags restore the start
    /// position; reorders move the tool back to its original slot.
    pub fn cancel(&mut self) -> Option<DragUpdate> {
        let session = self.session.take()?.close(self.effects.as_mut());
        log::debug!("drag: cancel {}", session.id);
        match session.mode {
            DragMode::Free => Some(DragUpdate::Cancelled {
                id: session.id,
                position: session.start_position,
            }),
            DragMode::Reorder if session.index != session.origin_index => {
                Some(DragUpdate::Reordered {
                    id: session.id,
                    from: session.index,
                    to: session.origin_index,
                })
            }
            DragMode::Reorder => None,
        }
    }
}

impl Drop for DragController {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.close(self.effects.as_mut());
        }
    }
}
