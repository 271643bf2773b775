//! WASM bridge for Tool Canvas — exposes the canvas controller to
//! JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. Tool lists and editor
//! state cross the boundary as JSON strings; ids are plain strings.

mod dom;
mod schedule;
mod storage;

use schedule::{Scheduler, SharedCanvas};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use storage::LocalStorage;
use tc_core::export::ExportFormat;
use tc_core::id::ToolId;
use tc_core::layout::Viewport;
use tc_core::model::Params;
use tc_core::registry::ToolRegistry;
use tc_editor::{CanvasConfig, Modifiers, ParameterEditor, PointerTarget, ToolCanvas};
use wasm_bindgen::prelude::*;

/// The main WASM-facing canvas handle.
///
/// Owns the shared controller and the timers that persist it. Every
/// mutating method re-arms the save timer before returning.
#[wasm_bindgen]
pub struct ToolCanvasHandle {
    canvas: SharedCanvas,
    scheduler: Scheduler,
}

#[wasm_bindgen]
impl ToolCanvasHandle {
    /// `config_json` may be empty or hold partial overrides.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, width: f64, height: f64) -> Result<ToolCanvasHandle, JsValue> {
        dom::console_error_panic_hook_setup();
        dom::init_logging(log::LevelFilter::Info);

        let config = CanvasConfig::from_json(config_json)
            .map_err(|e| JsValue::from_str(&format!("invalid config: {e}")))?;
        let mut canvas = ToolCanvas::with_effects(
            ToolRegistry::builtin(),
            LocalStorage::open(),
            config,
            Box::new(dom::BodyDragEffects),
        );
        canvas.set_viewport(Viewport { width, height });

        let canvas = Rc::new(RefCell::new(canvas));
        let scheduler = Scheduler::new(canvas.clone());
        Ok(Self { canvas, scheduler })
    }

    /// Start loading the saved canvas. `on_loaded` is called once the
    /// tool list is available.
    pub fn mount(&self, on_loaded: Option<js_sys::Function>) {
        self.scheduler.mount(on_loaded);
    }

    /// Cancel timers, abandon drags and detach listeners. Pending writes
    /// are dropped; call `flush` first to keep them.
    pub fn unmount(&self) {
        self.scheduler.unmount();
        self.canvas.borrow_mut().unmount();
    }

    pub fn set_log_level(&self, level: &str) {
        dom::init_logging(level.parse().unwrap_or(log::LevelFilter::Info));
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.canvas
            .borrow_mut()
            .set_viewport(Viewport { width, height });
    }

    /// `"flow"` (desktop) or `"stack"` (mobile).
    pub fn placement_mode(&self) -> String {
        match self.canvas.borrow().placement_mode() {
            tc_core::layout::PlacementMode::Flow => "flow".to_string(),
            tc_core::layout::PlacementMode::Stack => "stack".to_string(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.canvas.borrow().is_hydrated()
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    /// Tools in list order, with drag previews applied.
    pub fn get_tools_json(&self) -> String {
        let canvas = self.canvas.borrow();
        let registry = canvas.registry();
        let views: Vec<ToolView<'_>> = canvas
            .tools()
            .iter()
            .map(|t| ToolView {
                id: t.id.as_str(),
                name: &t.name,
                display_name: registry.display_name(t),
                params: &t.params,
                position: canvas.display_position(t.id).unwrap_or(t.position),
            })
            .collect();
        to_json(&views)
    }

    /// Templates that are not on the canvas yet.
    pub fn get_available_templates_json(&self) -> String {
        to_json(&self.canvas.borrow().available_templates())
    }

    /// Parameter rows for a card, with edit state and errors.
    pub fn get_editor_json(&self, id: &str) -> String {
        let canvas = self.canvas.borrow();
        let Some(id) = ToolId::lookup(id) else {
            return "null".to_string();
        };
        let Some(tool) = canvas.get(id) else {
            return "null".to_string();
        };
        let transient;
        let editor = match canvas.editor(id) {
            Some(editor) => editor,
            None => {
                transient = match canvas.registry().get(&tool.name) {
                    Some(template) => ParameterEditor::for_template(tool, template),
                    None => ParameterEditor::new(tool),
                };
                &transient
            }
        };
        to_json(&EditorView::from(editor))
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.canvas.borrow().has_unsaved_changes()
    }

    pub fn is_dragging(&self) -> bool {
        self.canvas.borrow().is_dragging()
    }

    // ─── Tool intents ────────────────────────────────────────────────────

    /// Place a tool. Returns the new id, or `undefined` for an unknown
    /// template.
    pub fn add_tool(&self, name: &str) -> Option<String> {
        let id = self.canvas.borrow_mut().add_tool(name, now());
        self.scheduler.sync();
        id.map(|id| id.to_string())
    }

    /// Replace a tool's params with a JSON object of strings.
    pub fn update_params(&self, id: &str, params_json: &str) -> bool {
        let (Some(id), Ok(params)) = (ToolId::lookup(id), serde_json::from_str::<Params>(params_json)) else {
            return false;
        };
        self.mutate(|c| c.update_params(id, params, now()))
    }

    pub fn delete_tool(&self, id: &str) -> bool {
        let Some(id) = ToolId::lookup(id) else {
            return false;
        };
        self.mutate(|c| c.delete_tool(id, now()))
    }

    pub fn clear_all(&self) -> bool {
        self.mutate(|c| c.clear_all(now()))
    }

    pub fn reorder(&self, from: usize, to: usize) -> bool {
        self.mutate(|c| c.reorder(from, to, now()))
    }

    // ─── Parameter editing ───────────────────────────────────────────────

    pub fn start_editing(&self, id: &str, param: &str) -> bool {
        match ToolId::lookup(id) {
            Some(id) => self.canvas.borrow_mut().start_editing(id, param),
            None => false,
        }
    }

    pub fn param_change(&self, id: &str, key: &str, value: &str) -> bool {
        match ToolId::lookup(id) {
            Some(id) => self.canvas.borrow_mut().param_change(id, key, value),
            None => false,
        }
    }

    /// Returns `false` if validation failed; read errors via `get_editor_json`.
    pub fn save_params(&self, id: &str) -> bool {
        let Some(id) = ToolId::lookup(id) else {
            return false;
        };
        self.mutate(|c| c.save_params(id, now()))
    }

    pub fn cancel_edit(&self, id: &str) {
        if let Some(id) = ToolId::lookup(id) {
            self.canvas.borrow_mut().cancel_edit(id);
        }
    }

    // ─── Pointer & keyboard ──────────────────────────────────────────────

    /// Pointer pressed on a card. `on_handle` is whether the target is the
    /// card's drag handle. Returns true if a drag started; the canvas then
    /// follows the pointer on `document` and calls `on_update` whenever the
    /// cards need re-rendering, until the pointer is released.
    pub fn handle_pointer_down(
        &self,
        id: &str,
        x: f64,
        y: f64,
        on_handle: bool,
        on_update: Option<js_sys::Function>,
    ) -> bool {
        let Some(id) = ToolId::lookup(id) else {
            return false;
        };
        let target = if on_handle {
            PointerTarget::Handle
        } else {
            PointerTarget::Body
        };
        let started = self.canvas.borrow_mut().pointer_down_on(id, x, y, target);
        if started {
            self.scheduler.track_drag(on_update);
        }
        started
    }

    /// Returns true if anything moved (re-render).
    pub fn handle_pointer_move(&self, x: f64, y: f64) -> bool {
        self.mutate(|c| c.pointer_move(x, y, now()).is_some())
    }

    pub fn handle_pointer_up(&self, x: f64, y: f64) -> bool {
        self.mutate(|c| c.pointer_up(x, y, now()).is_some())
    }

    /// Key event. `focus_id` is the tool whose parameter field has focus.
    /// Returns true if the key was consumed.
    pub fn handle_key(
        &self,
        focus_id: Option<String>,
        key: &str,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let modifiers = Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        };
        let focus = focus_id.as_deref().and_then(ToolId::lookup);
        self.mutate(|c| c.key(focus, key, modifiers, now()))
    }

    // ─── Persistence & export ────────────────────────────────────────────

    /// Write immediately, skipping the debounce.
    pub fn flush(&self) -> bool {
        let saved = self.canvas.borrow_mut().flush();
        self.scheduler.sync();
        saved
    }

    pub fn can_export(&self) -> bool {
        self.canvas.borrow().can_export()
    }

    /// Download the canvas as JSON. `format` is `"envelope"` (default) or
    /// `"flat"`.
    pub fn export(&self, format: &str) -> Result<(), JsValue> {
        let format = parse_export_format(format);
        let file = self
            .canvas
            .borrow()
            .export(format, chrono::Utc::now())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        dom::download(&file)
    }
}

impl Drop for ToolCanvasHandle {
    // Timer and listener closures hold the scheduler; release them so a
    // freed handle stops saving.
    fn drop(&mut self) {
        self.scheduler.unmount();
    }
}

impl ToolCanvasHandle {
    /// Run a store-changing closure, then re-arm the save timer.
    fn mutate<R>(&self, f: impl FnOnce(&mut ToolCanvas<LocalStorage>) -> R) -> R {
        let result = f(&mut self.canvas.borrow_mut());
        self.scheduler.sync();
        result
    }
}

// ─── JSON views ──────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolView<'a> {
    id: &'a str,
    name: &'a str,
    display_name: &'a str,
    params: &'a Params,
    position: tc_core::model::Position,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldView<'a> {
    name: &'a str,
    value: &'a str,
    display_value: &'a str,
    dom_id: String,
    /// HTML `<input type>`.
    input_type: &'static str,
    is_editing: bool,
    errors: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EditorView<'a> {
    is_editing: bool,
    editing_param: Option<&'a str>,
    has_changes: bool,
    fields: Vec<FieldView<'a>>,
}

impl<'a> From<&'a ParameterEditor> for EditorView<'a> {
    fn from(editor: &'a ParameterEditor) -> Self {
        let fields = editor
            .fields()
            .into_iter()
            .map(|f| FieldView {
                name: f.name,
                value: f.value,
                display_value: f.display_value(),
                input_type: f.input_type.html_input_type(),
                is_editing: f.is_editing,
                errors: f.errors,
                dom_id: f.dom_id,
            })
            .collect();
        Self {
            is_editing: editor.is_editing(),
            editing_param: editor.editing_param(),
            has_changes: editor.has_changes(),
            fields,
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("serialization failed: {e}");
        "null".to_string()
    })
}

fn parse_export_format(format: &str) -> ExportFormat {
    match format {
        "flat" => ExportFormat::Flat,
        _ => ExportFormat::Envelope,
    }
}

fn now() -> f64 {
    js_sys::Date::now()
}

// ─── Standalone functions (no canvas needed) ─────────────────────────────

/// Validate one parameter value. Returns JSON `{"inputType":"email","errors":[...]}`.
#[wasm_bindgen]
pub fn validate_param(param_name: &str, value: &str) -> String {
    let ty = tc_core::validate::infer_input_type(param_name);
    let result = tc_core::validate::validate_input(value, ty);
    to_json(&serde_json::json!({
        "inputType": ty,
        "errors": result.errors,
    }))
}
