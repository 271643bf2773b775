//! Canvas controller.
//!
//! `ToolCanvas` owns the store, the persistence adapter with its storage
//! backend, the drag controller and the open parameter editors. Hosts
//! call intent methods; every effective store change is reported to the
//! persistence adapter. After an intent the host asks `next_deadline()`
//! whether a debounce timer must be (re)scheduled.
//!
//! Time is always passed in (`now_ms`, or a `DateTime` for export) so the
//! controller runs the same natively and in the browser.

use crate::config::CanvasConfig;
use crate::drag::{DragController, DragEffects, DragUpdate, NoEffects};
use crate::input::{InputEvent, Modifiers, PointerTarget};
use crate::params::ParameterEditor;
use crate::persist::{PersistenceAdapter, Schedule, Storage};
use crate::shortcuts::{ShortcutAction, ShortcutMap, ShortcutScope};
use crate::store::{ToolMutation, ToolStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tc_core::export::{ExportFile, ExportFormat, can_export, encode_export};
use tc_core::id::ToolId;
use tc_core::layout::{PlacementMode, Viewport, handle_rect, hit_test};
use tc_core::model::{Params, Position, ToolInstance, ToolTemplate};
use tc_core::registry::ToolRegistry;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("there are no tools to export")]
    Empty,
    #[error("could not encode export: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct ToolCanvas<S: Storage> {
    config: CanvasConfig,
    registry: ToolRegistry,
    store: ToolStore,
    storage: S,
    persistence: PersistenceAdapter,
    drag: DragController,
    /// Live position of the tool being dragged in free mode.
    preview: Option<(ToolId, Position)>,
    editors: HashMap<ToolId, ParameterEditor>,
    viewport: Viewport,
}

impl<S: Storage> ToolCanvas<S> {
    pub fn new(registry: ToolRegistry, storage: S, config: CanvasConfig) -> Self {
        Self::with_effects(registry, storage, config, Box::new(NoEffects))
    }

    /// Canvas whose drags apply `effects` to the host document.
    pub fn with_effects(
        registry: ToolRegistry,
        storage: S,
        config: CanvasConfig,
        effects: Box<dyn DragEffects>,
    ) -> Self {
        let persistence = PersistenceAdapter::new(config.persist.clone());
        let drag = DragController::new(config.layout, config.drag, effects);
        Self {
            config,
            registry,
            store: ToolStore::new(),
            storage,
            persistence,
            drag,
            preview: None,
            editors: HashMap::new(),
            viewport: Viewport::default(),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn tools(&self) -> &[ToolInstance] {
        self.store.tools()
    }

    pub fn get(&self, id: ToolId) -> Option<&ToolInstance> {
        self.store.get(id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn placement_mode(&self) -> PlacementMode {
        PlacementMode::for_viewport(self.viewport.width, &self.config.layout)
    }

    /// Templates not yet placed on the canvas.
    pub fn available_templates(&self) -> Vec<&ToolTemplate> {
        self.registry.available(self.store.tools())
    }

    /// Where to draw `id`: the drag preview while it is being dragged,
    /// otherwise its stored position.
    pub fn display_position(&self, id: ToolId) -> Option<Position> {
        match self.preview {
            Some((dragged, position)) if dragged == id => Some(position),
            _ => self.store.get(id).map(|t| t.position),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn editor(&self, id: ToolId) -> Option<&ParameterEditor> {
        self.editors.get(&id)
    }

    // ─── Tool intents ────────────────────────────────────────────────────

    /// Place a new instance of template `name`. Returns its id, or `None`
    /// for an unknown template.
    pub fn add_tool(&mut self, name: &str, now_ms: f64) -> Option<ToolId> {
        let Some(template) = self.registry.get(name) else {
            log::warn!("canvas: unknown template {name:?}");
            return None;
        };
        let mutation = self
            .store
            .instantiate(template, self.placement_mode(), &self.config.layout);
        let id = match &mutation {
            ToolMutation::Add { tool } => tool.id,
            _ => return None,
        };
        self.commit(mutation, now_ms).then_some(id)
    }

    pub fn update_params(&mut self, id: ToolId, params: Params, now_ms: f64) -> bool {
        self.commit(ToolMutation::UpdateParams { id, params }, now_ms)
    }

    pub fn update_position(&mut self, id: ToolId, position: Position, now_ms: f64) -> bool {
        self.commit(ToolMutation::UpdatePosition { id, position }, now_ms)
    }

    pub fn delete_tool(&mut self, id: ToolId, now_ms: f64) -> bool {
        if self.drag.session().is_some_and(|s| s.id == id) {
            self.cancel_drag(now_ms);
        }
        self.editors.remove(&id);
        self.commit(ToolMutation::Delete { id }, now_ms)
    }

    pub fn clear_all(&mut self, now_ms: f64) -> bool {
        self.cancel_drag(now_ms);
        self.editors.clear();
        self.commit(ToolMutation::ClearAll, now_ms)
    }

    pub fn reorder(&mut self, from: usize, to: usize, now_ms: f64) -> bool {
        self.commit(ToolMutation::Reorder { from, to }, now_ms)
    }

    // ─── Parameter editing ───────────────────────────────────────────────

    pub fn start_editing(&mut self, id: ToolId, param: &str) -> bool {
        let Some(tool) = self.store.get(id) else {
            return false;
        };
        let registry = &self.registry;
        self.editors
            .entry(id)
            .or_insert_with(|| match registry.get(&tool.name) {
                Some(template) => ParameterEditor::for_template(tool, template),
                None => ParameterEditor::new(tool),
            })
            .start_editing(param);
        true
    }

    pub fn param_change(&mut self, id: ToolId, key: &str, value: &str) -> bool {
        if !self.editors.contains_key(&id) && !self.start_editing(id, key) {
            return false;
        }
        match self.editors.get_mut(&id) {
            Some(editor) => {
                editor.handle_param_change(key, value);
                true
            }
            None => false,
        }
    }

    /// Validate and commit the buffered params of `id`. Returns `false`
    /// when validation failed (errors are on the editor) or nothing changed.
    pub fn save_params(&mut self, id: ToolId, now_ms: f64) -> bool {
        let mutation = self.editors.get_mut(&id).and_then(|e| e.handle_save_params());
        match mutation {
            Some(mutation) => self.commit(mutation, now_ms),
            None => false,
        }
    }

    pub fn cancel_edit(&mut self, id: ToolId) {
        if let Some(editor) = self.editors.get_mut(&id) {
            editor.handle_cancel_edit();
        }
    }

    // ─── Pointer & keyboard ──────────────────────────────────────────────

    /// Press on a known card (DOM hosts know which element was hit).
    pub fn pointer_down_on(&mut self, id: ToolId, x: f64, y: f64, target: PointerTarget) -> bool {
        let Some(index) = self.store.index_of(id) else {
            return false;
        };
        let tool = &self.store.tools()[index];
        self.drag.pointer_down(
            tool,
            index,
            self.store.len(),
            x,
            y,
            target,
            self.viewport.width,
        )
    }

    /// Press at a canvas pixel: hit-test cards and their handles.
    pub fn pointer_down_at(&mut self, x: f64, y: f64) -> bool {
        let layout = &self.config.layout;
        let Some(tool) = hit_test(self.store.tools(), x, y, layout) else {
            return false;
        };
        let target = if handle_rect(tool.position, layout).contains(kurbo::Point::new(x, y)) {
            PointerTarget::Handle
        } else {
            PointerTarget::Body
        };
        let id = tool.id;
        self.pointer_down_on(id, x, y, target)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, now_ms: f64) -> Option<DragUpdate> {
        let update = self.drag.pointer_move(x, y)?;
        self.apply_drag(&update, now_ms);
        Some(update)
    }

    pub fn pointer_up(&mut self, x: f64, y: f64, now_ms: f64) -> Option<DragUpdate> {
        let update = self.drag.pointer_up(x, y);
        self.preview = None;
        if let Some(update) = &update {
            self.apply_drag(update, now_ms);
        }
        update
    }

    /// Abandon an in-progress drag, restoring the start state.
    pub fn cancel_drag(&mut self, now_ms: f64) -> Option<DragUpdate> {
        let update = self.drag.cancel();
        self.preview = None;
        if let Some(update) = &update {
            self.apply_drag(update, now_ms);
        }
        update
    }

    /// Key pressed. `focus` is the tool whose parameter field has focus,
    /// if any. Returns whether the key was handled.
    pub fn key(&mut self, focus: Option<ToolId>, key: &str, modifiers: Modifiers, now_ms: f64) -> bool {
        if let Some(id) = focus {
            if ShortcutMap::resolve(key, modifiers, ShortcutScope::ParamField).is_none() {
                return false;
            }
            let mutation = match self.editors.get_mut(&id) {
                Some(editor) => editor.handle_key(key, modifiers),
                None => return false,
            };
            if let Some(mutation) = mutation {
                self.commit(mutation, now_ms);
            }
            return true;
        }

        match ShortcutMap::resolve(key, modifiers, ShortcutScope::Canvas) {
            Some(ShortcutAction::CancelDrag) => self.cancel_drag(now_ms).is_some(),
            _ => false,
        }
    }

    /// Dispatch a normalized input event. Pointer-downs are hit-tested.
    pub fn handle_event(&mut self, event: &InputEvent, now_ms: f64) -> bool {
        match event {
            InputEvent::PointerDown { x, y, .. } => self.pointer_down_at(*x, *y),
            InputEvent::PointerMove { x, y } => self.pointer_move(*x, *y, now_ms).is_some(),
            InputEvent::PointerUp { x, y } => self.pointer_up(*x, *y, now_ms).is_some(),
            InputEvent::Key { key, modifiers } => self.key(None, key, *modifiers, now_ms),
        }
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Load the stored canvas. Tools added before hydration are kept after
    /// the restored ones and saved together.
    pub fn hydrate(&mut self, now_ms: f64) -> usize {
        let loaded = self.persistence.load(&self.storage);
        let restored = loaded.len();
        if self.store.is_empty() {
            self.store.apply(ToolMutation::Replace { tools: loaded });
            return restored;
        }

        let mut merged = loaded;
        for tool in self.store.tools() {
            if !merged.iter().any(|t| t.id == tool.id) {
                merged.push(tool.clone());
            }
        }
        log::debug!(
            "canvas: hydrated {restored} tools, kept {} added early",
            merged.len() - restored
        );
        self.store.apply(ToolMutation::Replace { tools: merged });
        self.sync_editors();
        self.persistence
            .on_change(&mut self.storage, self.store.tools(), now_ms);
        restored
    }

    pub fn is_hydrated(&self) -> bool {
        self.persistence.is_hydrated()
    }

    /// Debounce timer fired. Returns whether the host must request an idle
    /// callback for `run_idle`.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.persistence.tick(now_ms)
    }

    pub fn run_idle(&mut self) -> bool {
        self.persistence.run_idle(&mut self.storage)
    }

    /// Write the current list now (tests, page unload).
    pub fn flush(&mut self) -> bool {
        self.persistence.flush(&mut self.storage, self.store.tools())
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.persistence.next_deadline()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.persistence.is_dirty(self.store.tools())
    }

    /// Remove the stored canvas without touching the in-memory list.
    pub fn clear_storage(&mut self) {
        self.persistence.clear(&mut self.storage);
    }

    // ─── Export ──────────────────────────────────────────────────────────

    pub fn can_export(&self) -> bool {
        can_export(self.store.tools())
    }

    pub fn export(&self, format: ExportFormat, now: DateTime<Utc>) -> Result<ExportFile, ExportError> {
        if !self.can_export() {
            return Err(ExportError::Empty);
        }
        Ok(encode_export(self.store.tools(), format, now, &self.config.export)?)
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Tear down: abandon any drag, drop editors and pending writes.
    /// Nothing is written; hosts that want a final save call `flush` first.
    pub fn unmount(&mut self) {
        let _ = self.drag.cancel();
        self.preview = None;
        self.editors.clear();
        self.persistence.cancel();
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn commit(&mut self, mutation: ToolMutation, now_ms: f64) -> bool {
        if !self.store.apply(mutation) {
            return false;
        }
        self.sync_editors();
        if let Schedule::Timer { at_ms } =
            self.persistence
                .on_change(&mut self.storage, self.store.tools(), now_ms)
        {
            log::trace!("canvas: save scheduled at {at_ms}");
        }
        true
    }

    fn apply_drag(&mut self, update: &DragUpdate, now_ms: f64) {
        match *update {
            DragUpdate::Moved { id, position } => self.preview = Some((id, position)),
            DragUpdate::Committed { id, position } => {
                self.commit(ToolMutation::UpdatePosition { id, position }, now_ms);
            }
            DragUpdate::Reordered { from, to, .. } => {
                self.commit(ToolMutation::Reorder { from, to }, now_ms);
            }
            DragUpdate::Cancelled { .. } => {}
        }
    }

    fn sync_editors(&mut self) {
        let store = &self.store;
        self.editors.retain(|id, _| store.get(*id).is_some());
        for (id, editor) in self.editors.iter_mut() {
            if let Some(tool) = store.get(*id) {
                editor.sync(tool);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStorage;
    use pretty_assertions::assert_eq;

    fn canvas() -> ToolCanvas<MemoryStorage> {
        let mut c = ToolCanvas::new(
            ToolRegistry::builtin(),
            MemoryStorage::new(),
            CanvasConfig::default(),
        );
        c.set_viewport(Viewport { width: 1280.0, height: 800.0 });
        c.hydrate(0.0);
        c
    }

    #[test]
    fn add_unknown_template_is_rejected() {
        let mut c = canvas();
        assert_eq!(c.add_tool("nope", 0.0), None);
        assert!(c.tools().is_empty());
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn add_schedules_debounced_save() {
        let mut c = canvas();
        let id = c.add_tool("calculate", 1000.0).unwrap();
        assert_eq!(c.get(id).unwrap().position, Position::new(2.0, 2.0));
        assert_eq!(c.next_deadline(), Some(1500.0));
        assert!(c.has_unsaved_changes());
    }

    #[test]
    fn pointer_down_at_requires_handle() {
        let mut c = canvas();
        c.add_tool("calculate", 0.0);
        // Card at (32, 32)px; handle covers the top 40px.
        assert!(!c.pointer_down_at(40.0, 150.0));
        assert!(c.pointer_down_at(40.0, 40.0));
    }

    #[test]
    fn drag_preview_is_not_committed_until_release() {
        let mut c = canvas();
        let id = c.add_tool("calculate", 0.0).unwrap();
        c.flush();
        assert!(c.pointer_down_on(id, 0.0, 0.0, PointerTarget::Handle));
        c.pointer_move(32.0, 32.0, 10.0);
        assert_eq!(c.display_position(id), Some(Position::new(4.0, 4.0)));
        assert_eq!(c.get(id).unwrap().position, Position::new(2.0, 2.0));
        assert!(!c.has_unsaved_changes());

        c.pointer_up(32.0, 32.0, 20.0);
        assert_eq!(c.get(id).unwrap().position, Position::new(4.0, 4.0));
        assert!(c.has_unsaved_changes());
    }

    #[test]
    fn escape_cancels_drag() {
        let mut c = canvas();
        let id = c.add_tool("calculate", 0.0).unwrap();
        c.pointer_down_on(id, 0.0, 0.0, PointerTarget::Handle);
        c.pointer_move(160.0, 0.0, 0.0);
        assert!(c.key(None, "Escape", Modifiers::default(), 0.0));
        assert!(!c.is_dragging());
        assert_eq!(c.display_position(id), Some(Position::new(2.0, 2.0)));
    }

    #[test]
    fn deleting_closes_editor() {
        let mut c = canvas();
        let id = c.add_tool("send_email", 0.0).unwrap();
        assert!(c.start_editing(id, "subject"));
        assert!(c.delete_tool(id, 0.0));
        assert!(c.editor(id).is_none());
    }

    #[test]
    fn input_events_drive_a_drag() {
        let mut c = canvas();
        let id = c.add_tool("calculate", 0.0).unwrap();
        assert!(c.handle_event(&InputEvent::from_pointer_down(40.0, 40.0, true), 0.0));
        assert!(c.handle_event(&InputEvent::from_pointer_move(72.0, 40.0), 0.0));
        assert!(c.handle_event(&InputEvent::from_pointer_up(72.0, 40.0), 0.0));
        assert_eq!(c.get(id).unwrap().position, Position::new(4.0, 2.0));
        assert!(!c.handle_event(&InputEvent::from_key("Escape", Modifiers::default()), 0.0));
    }

    #[test]
    fn export_requires_tools() {
        let c = canvas();
        assert!(matches!(
            c.export(ExportFormat::Envelope, Utc::now()),
            Err(ExportError::Empty)
        ));
    }
}
