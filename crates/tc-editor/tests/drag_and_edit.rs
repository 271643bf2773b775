//! Integration tests: pointer drags, parameter editing and export through
//! `ToolCanvas` (tc-editor).

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tc_core::export::{ExportEnvelope, ExportFormat};
use tc_core::layout::Viewport;
use tc_core::model::Position;
use tc_core::registry::ToolRegistry;
use tc_editor::{CanvasConfig, DragUpdate, MemoryStorage, Modifiers, PointerTarget, ToolCanvas};

const DESKTOP: Viewport = Viewport {
    width: 1280.0,
    height: 800.0,
};

const PHONE: Viewport = Viewport {
    width: 375.0,
    height: 700.0,
};

fn canvas(viewport: Viewport) -> ToolCanvas<MemoryStorage> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut canvas = ToolCanvas::new(
        ToolRegistry::builtin(),
        MemoryStorage::new(),
        CanvasConfig::default(),
    );
    canvas.set_viewport(viewport);
    canvas.hydrate(0.0);
    canvas
}

fn names(canvas: &ToolCanvas<MemoryStorage>) -> Vec<&str> {
    canvas.tools().iter().map(|t| t.name.as_str()).collect()
}

// ─── Desktop drag ───────────────────────────────────────────────────────

#[test]
fn drag_end_commits_once_with_unit_offset() {
    let mut c = canvas(DESKTOP);
    let id = c.add_tool("get_weather", 0.0).unwrap();
    c.flush();

    assert!(c.pointer_down_on(id, 500.0, 300.0, PointerTarget::Handle));
    for step in 1..=4 {
        let f = step as f64;
        c.pointer_move(500.0 + 20.0 * f, 300.0 - 40.0 * f, 0.0);
    }
    assert!(!c.has_unsaved_changes());

    let update = c.pointer_up(580.0, 140.0, 100.0);
    // dx = 80px = 5 units, dy = -160px clamps y at 0
    assert_eq!(
        update,
        Some(DragUpdate::Committed {
            id,
            position: Position::new(7.0, 0.0)
        })
    );
    assert_eq!(c.get(id).unwrap().position, Position::new(7.0, 0.0));
    assert_eq!(c.pointer_up(580.0, 140.0, 100.0), None);
    assert_eq!(c.next_deadline(), Some(600.0));
}

#[test]
fn second_press_during_drag_is_ignored() {
    let mut c = canvas(DESKTOP);
    let a = c.add_tool("get_weather", 0.0).unwrap();
    let b = c.add_tool("calculate", 0.0).unwrap();
    assert!(c.pointer_down_on(a, 0.0, 0.0, PointerTarget::Handle));
    assert!(!c.pointer_down_on(b, 0.0, 0.0, PointerTarget::Handle));

    c.pointer_up(16.0, 0.0, 0.0);
    assert_eq!(c.get(a).unwrap().position, Position::new(3.0, 2.0));
    assert_eq!(c.get(b).unwrap().position, Position::new(16.5, 2.0));
}

#[test]
fn press_on_card_body_does_not_drag() {
    let mut c = canvas(DESKTOP);
    let id = c.add_tool("calculate", 0.0).unwrap();
    assert!(!c.pointer_down_on(id, 0.0, 0.0, PointerTarget::Body));
    assert_eq!(c.pointer_move(100.0, 100.0, 0.0), None);
}

// ─── Mobile reorder ─────────────────────────────────────────────────────

#[test]
fn mobile_drag_reorders_step_by_step() {
    let mut c = canvas(PHONE);
    let first = c.add_tool("get_weather", 0.0).unwrap();
    c.add_tool("search_wikipedia", 0.0);
    c.add_tool("calculate", 0.0);

    c.pointer_down_on(first, 100.0, 0.0, PointerTarget::Handle);
    assert_eq!(
        c.pointer_move(100.0, 130.0, 0.0),
        Some(DragUpdate::Reordered { id: first, from: 0, to: 1 })
    );
    assert_eq!(names(&c), vec!["search_wikipedia", "get_weather", "calculate"]);

    assert_eq!(
        c.pointer_move(100.0, 250.0, 0.0),
        Some(DragUpdate::Reordered { id: first, from: 1, to: 2 })
    );
    assert_eq!(c.pointer_up(100.0, 250.0, 0.0), None);
    assert_eq!(names(&c), vec!["search_wikipedia", "calculate", "get_weather"]);
}

#[test]
fn escape_puts_reordered_tool_back() {
    let mut c = canvas(PHONE);
    let first = c.add_tool("get_weather", 0.0).unwrap();
    c.add_tool("calculate", 0.0);

    c.pointer_down_on(first, 0.0, 0.0, PointerTarget::Handle);
    c.pointer_move(0.0, 200.0, 0.0);
    assert_eq!(names(&c), vec!["calculate", "get_weather"]);

    assert!(c.key(None, "Escape", Modifiers::default(), 0.0));
    assert_eq!(names(&c), vec!["get_weather", "calculate"]);
}

// ─── Parameter editing ──────────────────────────────────────────────────

#[test]
fn invalid_email_blocks_save() {
    let mut c = canvas(DESKTOP);
    let id = c.add_tool("send_email", 0.0).unwrap();
    c.flush();

    c.start_editing(id, "to");
    c.param_change(id, "to", "not-an-email");
    assert!(!c.save_params(id, 10.0));

    let editor = c.editor(id).unwrap();
    assert!(editor.is_editing());
    assert_eq!(
        editor.validation_errors().get("to"),
        Some(&vec!["Invalid email format".to_string()])
    );
    assert_eq!(c.get(id).unwrap().params["to"], "");
    assert!(!c.has_unsaved_changes());
}

#[test]
fn escape_in_field_reverts_without_update() {
    let mut c = canvas(DESKTOP);
    let id = c.add_tool("calculate", 0.0).unwrap();
    c.flush();

    c.start_editing(id, "expression");
    c.param_change(id, "expression", "sqrt(16)");
    assert!(c.key(Some(id), "Escape", Modifiers::default(), 10.0));

    let editor = c.editor(id).unwrap();
    assert!(!editor.is_editing());
    assert_eq!(editor.edit_params()["expression"], "2 + 2");
    assert_eq!(c.get(id).unwrap().params["expression"], "2 + 2");
    assert_eq!(c.next_deadline(), None);
}

#[test]
fn enter_in_field_saves() {
    let mut c = canvas(DESKTOP);
    let id = c.add_tool("calculate", 0.0).unwrap();
    c.start_editing(id, "expression");
    c.param_change(id, "expression", "2 ^ 10");
    assert!(c.key(Some(id), "Enter", Modifiers::default(), 40.0));
    assert_eq!(c.get(id).unwrap().params["expression"], "2 ^ 10");
    assert_eq!(c.next_deadline(), Some(540.0));
}

#[test]
fn unbalanced_expression_is_rejected() {
    let mut c = canvas(DESKTOP);
    let id = c.add_tool("calculate", 0.0).unwrap();
    c.param_change(id, "expression", "(1 + 2");
    assert!(!c.save_params(id, 0.0));
    assert!(c.editor(id).unwrap().validation_errors().contains_key("expression"));
}

#[test]
fn pathological_expressions_become_field_errors() {
    let mut c = canvas(DESKTOP);
    let id = c.add_tool("calculate", 0.0).unwrap();

    c.param_change(id, "expression", &"(".repeat(200_000));
    assert_eq!(
        c.editor(id).unwrap().validation_errors().get("expression"),
        Some(&vec!["Input too long (max 1000 characters)".to_string()])
    );

    c.param_change(id, "expression", &"(".repeat(1000));
    assert!(!c.save_params(id, 0.0));
    assert_eq!(c.get(id).unwrap().params["expression"], "2 + 2");
}

// ─── Export ─────────────────────────────────────────────────────────────

#[test]
fn export_envelope_names_file_by_time() {
    let mut c = canvas(DESKTOP);
    c.add_tool("get_weather", 0.0);
    c.add_tool("translate_text", 0.0);

    let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let file = c.export(ExportFormat::Envelope, now).unwrap();
    assert_eq!(file.filename, "tool-canvas-2025-01-02T03-04-05.json");
    assert_eq!(file.mime, "application/json");

    let envelope: ExportEnvelope = serde_json::from_str(&file.contents).unwrap();
    assert_eq!(envelope.version, "2.0.0");
    assert_eq!(envelope.timestamp, "2025-01-02T03:04:05.000Z");
    assert_eq!(envelope.tools, c.tools());
}
