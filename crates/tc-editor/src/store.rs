//! Tool entity store: the single ordered list of tools on the canvas.
//!
//! Every change goes through `ToolStore::apply` with a `ToolMutation`, so
//! the drag controller, parameter editor and host intents all mutate the
//! list the same way. The store never hands out a second owned copy.

use tc_core::id::ToolId;
use tc_core::layout::{LayoutConfig, PlacementMode, calculate_new_tool_position};
use tc_core::model::{Params, Position, ToolInstance, ToolTemplate};

/// A whole-list edit applied to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolMutation {
    Add { tool: Box<ToolInstance> },
    UpdateParams { id: ToolId, params: Params },
    UpdatePosition { id: ToolId, position: Position },
    Delete { id: ToolId },
    ClearAll,
    /// Move the tool at `from` so it ends up at index `to`.
    Reorder { from: usize, to: usize },
    /// Swap in a whole list (hydration from storage).
    Replace { tools: Vec<ToolInstance> },
}

#[derive(Debug, Clone, Default)]
pub struct ToolStore {
    tools: Vec<ToolInstance>,
}

impl ToolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tools(&self) -> &[ToolInstance] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, id: ToolId) -> Option<&ToolInstance> {
        self.tools.iter().find(|t| t.id == id)
    }

    pub fn index_of(&self, id: ToolId) -> Option<usize> {
        self.tools.iter().position(|t| t.id == id)
    }

    /// Build the `Add` mutation for a template, placed after the current tools.
    pub fn instantiate(
        &self,
        template: &ToolTemplate,
        mode: PlacementMode,
        config: &LayoutConfig,
    ) -> ToolMutation {
        let position = calculate_new_tool_position(&self.tools, mode, config);
        ToolMutation::Add {
            tool: Box::new(ToolInstance::from_template(template, position)),
        }
    }

    /// Apply a mutation. Returns `true` if the list changed.
    pub fn apply(&mut self, mutation: ToolMutation) -> bool {
        match mutation {
            ToolMutation::Add { tool } => {
                if self.get(tool.id).is_some() {
                    log::warn!("store: refusing duplicate id {}", tool.id);
                    false
                } else {
                    log::debug!("store: add {} ({}) at {:?}", tool.id, tool.name, tool.position);
                    self.tools.push(*tool);
                    true
                }
            }
            ToolMutation::UpdateParams { id, params } => match self.get_mut(id) {
                Some(tool) if tool.params != params => {
                    tool.params = params;
                    true
                }
                _ => false,
            },
            ToolMutation::UpdatePosition { id, position } => match self.get_mut(id) {
                Some(tool) if tool.position != position => {
                    tool.position = position;
                    true
                }
                _ => false,
            },
            ToolMutation::Delete { id } => {
                let before = self.tools.len();
                self.tools.retain(|t| t.id != id);
                self.tools.len() != before
            }
            ToolMutation::ClearAll => {
                let changed = !self.tools.is_empty();
                self.tools.clear();
                changed
            }
            ToolMutation::Reorder { from, to } => {
                if from == to || from >= self.tools.len() || to >= self.tools.len() {
                    false
                } else {
                    let moved = self.tools.remove(from);
                    self.tools.insert(to, moved);
                    true
                }
            }
            ToolMutation::Replace { tools } => {
                let changed = self.tools != tools;
                self.tools = tools;
                changed
            }
        }
    }

    fn get_mut(&mut self, id: ToolId) -> Option<&mut ToolInstance> {
        self.tools.iter_mut().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tc_core::registry::ToolRegistry;

    fn store_with(n: usize) -> ToolStore {
        let reg = ToolRegistry::builtin();
        let cfg = LayoutConfig::default();
        let mut store = ToolStore::new();
        for template in reg.templates().iter().take(n) {
            let m = store.instantiate(template, PlacementMode::Flow, &cfg);
            assert!(store.apply(m));
        }
        store
    }

    fn names(store: &ToolStore) -> Vec<&str> {
        store.tools().iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn add_places_in_flow() {
        let store = store_with(2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.tools()[0].position, Position::new(2.0, 2.0));
        assert_eq!(store.tools()[1].position, Position::new(16.5, 2.0));
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut store = store_with(1);
        let dup = store.tools()[0].clone();
        assert!(!store.apply(ToolMutation::Add { tool: Box::new(dup) }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_only_counts_real_changes() {
        let mut store = store_with(1);
        let id = store.tools()[0].id;
        let same = store.tools()[0].params.clone();
        assert!(!store.apply(ToolMutation::UpdateParams { id, params: same }));
        assert!(store.apply(ToolMutation::UpdatePosition {
            id,
            position: Position::new(5.0, 5.0)
        }));
        assert_eq!(store.get(id).unwrap().position, Position::new(5.0, 5.0));
    }

    #[test]
    fn reorder_moves_item() {
        let mut store = store_with(3);
        assert!(store.apply(ToolMutation::Reorder { from: 0, to: 2 }));
        assert_eq!(names(&store), vec!["search_wikipedia", "send_email", "get_weather"]);
        assert!(!store.apply(ToolMutation::Reorder { from: 1, to: 1 }));
        assert!(!store.apply(ToolMutation::Reorder { from: 0, to: 9 }));
    }

    #[test]
    fn delete_and_clear() {
        let mut store = store_with(3);
        let id = store.tools()[1].id;
        assert!(store.apply(ToolMutation::Delete { id }));
        assert!(!store.apply(ToolMutation::Delete { id }));
        assert!(store.apply(ToolMutation::ClearAll));
        assert!(store.is_empty());
        assert!(!store.apply(ToolMutation::ClearAll));
    }
}
