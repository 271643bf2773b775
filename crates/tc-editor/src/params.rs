//! Per-card parameter editing.
//!
//! A `ParameterEditor` buffers edits for one tool. Nothing reaches the
//! store until `handle_save_params` validates every field and yields a
//! `ToolMutation::UpdateParams`; cancel throws the buffer away.

use crate::input::Modifiers;
use crate::shortcuts::{ShortcutAction, ShortcutMap, ShortcutScope};
use crate::store::ToolMutation;
use std::collections::BTreeMap;
use tc_core::id::ToolId;
use tc_core::model::{Params, ToolInstance, ToolTemplate};
use tc_core::validate::{InputType, ValidationResult, infer_input_type, validate_input};

/// Field errors keyed by parameter name.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

/// Placeholder shown for an empty value.
pub const EMPTY_VALUE_PLACEHOLDER: &str = "Click to edit";

/// One row of a card's parameter section.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterField<'a> {
    pub name: &'a str,
    pub value: &'a str,
    /// DOM id, unique across cards.
    pub dom_id: String,
    pub input_type: InputType,
    pub is_editing: bool,
    pub errors: &'a [String],
}

impl<'a> ParameterField<'a> {
    pub fn display_value(&self) -> &'a str {
        if self.value.is_empty() {
            EMPTY_VALUE_PLACEHOLDER
        } else {
            self.value
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterEditor {
    tool: ToolId,
    /// Last committed params.
    original: Params,
    /// Working copy while editing.
    edit_params: Params,
    is_editing: bool,
    editing_param: Option<String>,
    validation_errors: ValidationErrors,
    /// Declared types from the template; other params are inferred.
    input_types: BTreeMap<String, InputType>,
}

impl ParameterEditor {
    pub fn new(tool: &ToolInstance) -> Self {
        Self {
            tool: tool.id,
            original: tool.params.clone(),
            edit_params: tool.params.clone(),
            is_editing: false,
            editing_param: None,
            validation_errors: ValidationErrors::new(),
            input_types: BTreeMap::new(),
        }
    }

    /// Editor for a tool whose template declares input types.
    pub fn for_template(tool: &ToolInstance, template: &ToolTemplate) -> Self {
        Self {
            input_types: template.input_types.clone(),
            ..Self::new(tool)
        }
    }

    pub fn input_type(&self, param: &str) -> InputType {
        self.input_types
            .get(param)
            .copied()
            .unwrap_or_else(|| infer_input_type(param))
    }

    fn validate(&self, param: &str, value: &str) -> ValidationResult {
        validate_input(value, self.input_type(param))
    }

    pub fn tool(&self) -> ToolId {
        self.tool
    }

    pub fn is_editing(&self) -> bool {
        self.is_editing
    }

    pub fn editing_param(&self) -> Option<&str> {
        self.editing_param.as_deref()
    }

    pub fn edit_params(&self) -> &Params {
        &self.edit_params
    }

    pub fn validation_errors(&self) -> &ValidationErrors {
        &self.validation_errors
    }

    /// Whether the buffer differs from the committed params, including
    /// keys that were removed.
    pub fn has_changes(&self) -> bool {
        self.edit_params != self.original
    }

    /// Enter edit mode focused on `param`. Starting a fresh session copies
    /// the committed params into the buffer; switching fields mid-session
    /// keeps pending edits.
    pub fn start_editing(&mut self, param: &str) {
        if !self.is_editing {
            self.edit_params = self.original.clone();
            self.validation_errors.clear();
            self.is_editing = true;
        }
        self.editing_param = Some(param.to_string());
    }

    /// Buffer a new value and re-validate just that field.
    pub fn handle_param_change(&mut self, key: &str, value: &str) {
        self.is_editing = true;
        self.edit_params.insert(key.to_string(), value.to_string());

        let result = self.validate(key, value);
        if result.is_valid() {
            self.validation_errors.remove(key);
        } else {
            self.validation_errors.insert(key.to_string(), result.errors);
        }
    }

    /// Validate every field. On success leave edit mode and return the
    /// mutation to apply (or `None` when nothing changed). On failure stay
    /// in edit mode with the errors recorded.
    pub fn handle_save_params(&mut self) -> Option<ToolMutation> {
        let errors: ValidationErrors = self
            .edit_params
            .iter()
            .filter_map(|(key, value)| {
                let result = self.validate(key, value);
                (!result.is_valid()).then(|| (key.clone(), result.errors))
            })
            .collect();

        if !errors.is_empty() {
            log::debug!("params: save blocked on {} ({} fields)", self.tool, errors.len());
            self.validation_errors = errors;
            return None;
        }

        self.validation_errors.clear();
        self.is_editing = false;
        self.editing_param = None;

        if !self.has_changes() {
            return None;
        }
        self.original = self.edit_params.clone();
        Some(ToolMutation::UpdateParams {
            id: self.tool,
            params: self.edit_params.clone(),
        })
    }

    /// Discard the buffer and leave edit mode.
    pub fn handle_cancel_edit(&mut self) {
        self.edit_params = self.original.clone();
        self.validation_errors.clear();
        self.is_editing = false;
        self.editing_param = None;
    }

    /// Key pressed inside a parameter field.
    pub fn handle_key(&mut self, key: &str, modifiers: Modifiers) -> Option<ToolMutation> {
        match ShortcutMap::resolve(key, modifiers, ShortcutScope::ParamField)? {
            ShortcutAction::SaveParams => self.handle_save_params(),
            ShortcutAction::CancelEdit => {
                self.handle_cancel_edit();
                None
            }
            ShortcutAction::CancelDrag => None,
        }
    }

    /// Pick up params committed elsewhere. An open edit session keeps its
    /// buffer; only the baseline moves.
    pub fn sync(&mut self, tool: &ToolInstance) {
        if self.original == tool.params {
            return;
        }
        self.original = tool.params.clone();
        if !self.is_editing {
            self.edit_params = tool.params.clone();
        }
    }

    /// Rows for the card, in key order. Values come from the buffer while
    /// editing.
    pub fn fields(&self) -> Vec<ParameterField<'_>> {
        let source = if self.is_editing {
            &self.edit_params
        } else {
            &self.original
        };
        source
            .iter()
            .map(|(name, value)| ParameterField {
                name,
                value,
                dom_id: format!("{}-{name}", self.tool),
                input_type: self.input_type(name),
                is_editing: self.is_editing && self.editing_param.as_deref() == Some(name.as_str()),
                errors: self
                    .validation_errors
                    .get(name)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]),
            })
            .collect()
    }
}
