//! Integration tests: registry → placement → snapshot.
//!
//! Exercises the `tc-core` pipeline the way the canvas uses it: place
//! tools one after another, then persist and restore the result.

use pretty_assertions::assert_eq;
use tc_core::id::ToolId;
use tc_core::layout::{LayoutConfig, PlacementMode, calculate_new_tool_position};
use tc_core::model::{Position, ToolInstance};
use tc_core::registry::ToolRegistry;
use tc_core::snapshot::{decode_snapshot, encode_snapshot};

fn tool_at(x: f64, y: f64) -> ToolInstance {
    ToolInstance {
        id: ToolId::generate(),
        name: "calculate".into(),
        params: Default::default(),
        position: Position::new(x, y),
    }
}

/// 12.5-unit cards with half a unit between them.
fn tight_config(canvas_width_px: f64) -> LayoutConfig {
    LayoutConfig {
        tool_width_px: 200.0,
        tool_height_px: 200.0,
        desktop_spacing: 0.5,
        canvas_width_px,
        ..LayoutConfig::default()
    }
}

// ─── Placement properties ───────────────────────────────────────────────

#[test]
fn empty_canvas_places_at_margin() {
    let cfg = LayoutConfig::default();
    for mode in [PlacementMode::Flow, PlacementMode::Stack] {
        assert_eq!(
            calculate_new_tool_position(&[], mode, &cfg),
            Position::new(2.0, 2.0)
        );
    }
}

#[test]
fn second_tool_packs_into_same_row() {
    let cfg = tight_config(1200.0);
    let p = calculate_new_tool_position(&[tool_at(1.0, 1.0)], PlacementMode::Flow, &cfg);
    assert_eq!(p, Position::new(14.0, 1.0));
}

#[test]
fn narrow_canvas_wraps_to_new_row() {
    let cfg = tight_config(320.0);
    let p = calculate_new_tool_position(&[tool_at(1.0, 1.0)], PlacementMode::Flow, &cfg);
    assert_eq!(p, Position::new(cfg.margin, 1.0 + 12.5 + 0.5));
}

#[test]
fn successive_adds_never_overlap_on_desktop() {
    let cfg = LayoutConfig::default();
    let reg = ToolRegistry::builtin();
    let mut tools: Vec<ToolInstance> = Vec::new();
    for template in reg.templates() {
        let pos = calculate_new_tool_position(&tools, PlacementMode::Flow, &cfg);
        tools.push(ToolInstance::from_template(template, pos));
    }

    for (i, a) in tools.iter().enumerate() {
        for b in &tools[i + 1..] {
            let ra = tc_core::layout::tool_rect(a.position, &cfg);
            let rb = tc_core::layout::tool_rect(b.position, &cfg);
            assert!(
                ra.intersect(rb).area() == 0.0,
                "{} at {:?} overlaps {} at {:?}",
                a.name,
                a.position,
                b.name,
                b.position
            );
        }
    }
    // 800px canvas fits three 12.5-unit cards per row
    assert_eq!(tools[3].position, Position::new(2.0, 16.5));
}

#[test]
fn stack_mode_builds_single_column() {
    let cfg = LayoutConfig::default();
    let mut tools = Vec::new();
    for _ in 0..3 {
        let pos = calculate_new_tool_position(&tools, PlacementMode::Stack, &cfg);
        tools.push(tool_at(pos.x, pos.y));
    }
    let ys: Vec<f64> = tools.iter().map(|t| t.position.y).collect();
    assert_eq!(ys, vec![2.0, 15.5, 29.0]);
    assert!(tools.iter().all(|t| t.position.x == 2.0));
}

// ─── Snapshot fixtures ──────────────────────────────────────────────────

#[test]
fn saved_canvas_fixture_restores_and_keeps_orphans() {
    let text = include_str!("fixtures/saved_canvas.json");
    let tools = decode_snapshot(text).unwrap();
    assert_eq!(tools.len(), 3);

    let reg = ToolRegistry::builtin();
    assert_eq!(reg.display_name(&tools[0]), "Weather Forecast");
    assert_eq!(reg.display_name(&tools[2]), "retired_tool");

    let again = decode_snapshot(&encode_snapshot(&tools).unwrap()).unwrap();
    assert_eq!(again, tools);
}

#[test]
fn placement_continues_from_restored_canvas() {
    let cfg = LayoutConfig::default();
    let tools = decode_snapshot(include_str!("fixtures/saved_canvas.json")).unwrap();
    let p = calculate_new_tool_position(&tools, PlacementMode::Flow, &cfg);
    // Row y=2 holds x=2 and x=16.5; a third card still fits at x=31.
    assert_eq!(p, Position::new(31.0, 2.0));
}
