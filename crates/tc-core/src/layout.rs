//! Placement engine for new tool cards.
//!
//! Computes where a newly added tool lands, given the tools already on
//! the canvas. Desktop uses a row-based flow (fill rows left to right,
//! wrap below); mobile stacks everything in a single column.
//!
//! All positions are in layout units; card sizes are configured in pixels
//! and converted through `LayoutConfig::px_per_unit`.

use crate::model::{Position, ToolInstance};
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The canvas (viewport) dimensions, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Layout constants used by the placement engine and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Pixels per layout unit (rem).
    pub px_per_unit: f64,
    pub tool_width_px: f64,
    pub tool_height_px: f64,
    /// Height of the drag-handle strip along the top of a card.
    pub handle_height_px: f64,
    /// Gap between cards in flow mode, in units.
    pub desktop_spacing: f64,
    /// Gap between cards in stack mode, in units.
    pub mobile_spacing: f64,
    /// Canvas margin, in units.
    pub margin: f64,
    /// Max vertical distance (units) for two cards to share a row.
    pub row_threshold: f64,
    /// Canvas width assumed by flow placement, in pixels.
    pub canvas_width_px: f64,
    /// Viewports at or below this width use stack placement.
    pub mobile_breakpoint_px: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            px_per_unit: 16.0,
            tool_width_px: 200.0,
            tool_height_px: 200.0,
            handle_height_px: 40.0,
            desktop_spacing: 2.0,
            mobile_spacing: 1.0,
            margin: 2.0,
            row_threshold: 1.0,
            canvas_width_px: 800.0,
            mobile_breakpoint_px: 768.0,
        }
    }
}

impl LayoutConfig {
    pub fn px_to_units(&self, px: f64) -> f64 {
        px / self.px_per_unit
    }

    pub fn units_to_px(&self, units: f64) -> f64 {
        units * self.px_per_unit
    }

    pub fn tool_width(&self) -> f64 {
        self.px_to_units(self.tool_width_px)
    }

    pub fn tool_height(&self) -> f64 {
        self.px_to_units(self.tool_height_px)
    }

    pub fn spacing_for(&self, mode: PlacementMode) -> f64 {
        match mode {
            PlacementMode::Stack => self.mobile_spacing,
            PlacementMode::Flow => self.desktop_spacing,
        }
    }

    /// Rightmost x (units) a card may extend to in flow mode.
    fn max_canvas_width(&self) -> f64 {
        self.px_to_units(self.canvas_width_px) - self.margin
    }
}

/// How new tools are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementMode {
    /// Single column, each new tool below the bottom-most one (mobile).
    Stack,
    /// Fill rows left to right, then wrap (desktop).
    Flow,
}

impl PlacementMode {
    /// Pick the mode for a viewport width in pixels.
    pub fn for_viewport(width_px: f64, config: &LayoutConfig) -> Self {
        if width_px <= config.mobile_breakpoint_px {
            PlacementMode::Stack
        } else {
            PlacementMode::Flow
        }
    }
}

/// Compute the position for one new tool.
///
/// Never fails: an empty canvas yields `{margin, margin}`, and a full
/// canvas always has room in a new row below the last one.
pub fn calculate_new_tool_position(
    existing: &[ToolInstance],
    mode: PlacementMode,
    config: &LayoutConfig,
) -> Position {
    if existing.is_empty() {
        return Position::new(config.margin, config.margin);
    }

    match mode {
        PlacementMode::Stack => stack_position(existing, config),
        PlacementMode::Flow => flow_position(existing, config),
    }
}

fn stack_position(existing: &[ToolInstance], config: &LayoutConfig) -> Position {
    let spacing = config.spacing_for(PlacementMode::Stack);
    let bottom_y = existing
        .iter()
        .map(|t| t.position.y)
        .fold(f64::NEG_INFINITY, f64::max);

    Position::new(config.margin, bottom_y + config.tool_height() + spacing)
}

type Row<'a> = SmallVec<[&'a Position; 4]>;

/// Greedy row partition: each tool joins the first row whose first member
/// is within `row_threshold` vertically. Order-dependent by construction.
fn group_rows<'a>(existing: &'a [ToolInstance], threshold: f64) -> Vec<Row<'a>> {
    let mut rows: Vec<Row<'a>> = Vec::new();
    for tool in existing {
        let p = &tool.position;
        match rows.iter_mut().find(|row| (row[0].y - p.y).abs() < threshold) {
            Some(row) => row.push(p),
            None => rows.push(SmallVec::from_elem(p, 1)),
        }
    }
    rows.sort_by(|a, b| a[0].y.total_cmp(&b[0].y));
    rows
}

fn flow_position(existing: &[ToolInstance], config: &LayoutConfig) -> Position {
    let spacing = config.spacing_for(PlacementMode::Flow);
    let tool_width = config.tool_width();
    let max_width = config.max_canvas_width();

    let mut rows = group_rows(existing, config.row_threshold);

    for row in rows.iter_mut() {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
        let rightmost = row[row.len() - 1];
        let candidate_x = rightmost.x + tool_width + spacing;
        if candidate_x + tool_width <= max_width {
            return Position::new(candidate_x, rightmost.y);
        }
    }

    // No room in any row: open a new one below the last row.
    match rows.last() {
        Some(last) => Position::new(
            config.margin,
            last[0].y + config.tool_height() + spacing,
        ),
        None => Position::new(config.margin, config.margin),
    }
}

/// Position that centres one tool on a canvas of the given size,
/// clamped at the origin.
pub fn default_position(canvas: Viewport, config: &LayoutConfig) -> Position {
    Position::new(
        (config.px_to_units(canvas.width - config.tool_width_px) / 2.0).max(0.0),
        (config.px_to_units(canvas.height - config.tool_height_px) / 2.0).max(0.0),
    )
}

// ─── Hit geometry ────────────────────────────────────────────────────────

/// Card rectangle in canvas pixels.
pub fn tool_rect(position: Position, config: &LayoutConfig) -> Rect {
    let x = config.units_to_px(position.x);
    let y = config.units_to_px(position.y);
    Rect::new(x, y, x + config.tool_width_px, y + config.tool_height_px)
}

/// Drag-handle strip along the top edge of a card, in canvas pixels.
pub fn handle_rect(position: Position, config: &LayoutConfig) -> Rect {
    let card = tool_rect(position, config);
    Rect::new(
        card.x0,
        card.y0,
        card.x1,
        card.y0 + config.handle_height_px.min(card.height()),
    )
}

/// Topmost tool whose card contains the pixel point (last drawn = topmost).
pub fn hit_test<'a>(
    tools: &'a [ToolInstance],
    px: f64,
    py: f64,
    config: &LayoutConfig,
) -> Option<&'a ToolInstance> {
    let point = kurbo::Point::new(px, py);
    tools
        .iter()
        .rev()
        .find(|t| tool_rect(t.position, config).contains(point))
}
