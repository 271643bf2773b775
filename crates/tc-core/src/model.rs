//! Core data model for the tool canvas.
//!
//! A canvas holds an ordered list of `ToolInstance`s, each created from a
//! `ToolTemplate` in the registry. Positions live in layout units (rem),
//! convertible to pixels via `layout::px_to_units` / `units_to_px`.
//! List order matters: it is the stacking order on mobile and the
//! persistence order everywhere.

use crate::id::ToolId;
use crate::validate::{InputType, infer_input_type};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameter map of a tool: name → raw string value.
///
/// Ordered so that serialization is deterministic, which the
/// persistence dirty-check relies on.
pub type Params = BTreeMap<String, String>;

// ─── Geometry ────────────────────────────────────────────────────────────

/// A position on the canvas, in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset by a delta, clamping both axes at zero.
    pub fn offset_clamped(self, dx: f64, dy: f64) -> Self {
        Self {
            x: (self.x + dx).max(0.0),
            y: (self.y + dy).max(0.0),
        }
    }

    /// Clamp both axes into `[0, max]`. NaN collapses to 0.
    pub fn clamped(self, max: f64) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, max) };
        Self {
            x: clamp(self.x),
            y: clamp(self.y),
        }
    }
}

// ─── Templates & Instances ───────────────────────────────────────────────

/// A catalog entry describing an available tool type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolTemplate {
    /// Unique key, referenced by `ToolInstance::name`.
    pub name: String,
    pub display_name: String,
    pub default_params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Explicit input types, for params whose names mislead inference
    /// (a language code called `to`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_types: BTreeMap<String, InputType>,
}

impl ToolTemplate {
    pub fn new(name: &str, display_name: &str, defaults: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            default_params: defaults
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            description: None,
            input_types: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_input_type(mut self, param: &str, ty: InputType) -> Self {
        self.input_types.insert(param.to_string(), ty);
        self
    }

    /// Declared type for `param`, else the one inferred from its name.
    pub fn input_type(&self, param: &str) -> InputType {
        self.input_types
            .get(param)
            .copied()
            .unwrap_or_else(|| infer_input_type(param))
    }
}

/// A placed, user-configured tool on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInstance {
    pub id: ToolId,
    /// Template name. May reference a template that no longer exists.
    pub name: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub position: Position,
}

impl ToolInstance {
    /// Instantiate a template at `position` with a freshly generated id.
    pub fn from_template(template: &ToolTemplate, position: Position) -> Self {
        Self {
            id: ToolId::generate(),
            name: template.name.clone(),
            params: template.default_params.clone(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_clamps_at_zero() {
        let p = Position::new(1.0, 2.0).offset_clamped(-5.0, 0.5);
        assert_eq!(p, Position::new(0.0, 2.5));
    }

    #[test]
    fn clamped_handles_nan_and_overflow() {
        let p = Position::new(f64::NAN, 20_000.0).clamped(10_000.0);
        assert_eq!(p, Position::new(0.0, 10_000.0));
    }

    #[test]
    fn template_serializes_camel_case() {
        let t = ToolTemplate::new("calculate", "Calculator", &[("expression", "2 + 2")]);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["displayName"], "Calculator");
        assert_eq!(json["defaultParams"]["expression"], "2 + 2");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn from_template_clones_defaults() {
        let t = ToolTemplate::new("get_weather", "Weather", &[("location", "Durham, NC")]);
        let tool = ToolInstance::from_template(&t, Position::new(2.0, 2.0));
        assert_eq!(tool.name, "get_weather");
        assert_eq!(tool.params.get("location").map(String::as_str), Some("Durham, NC"));
        assert_eq!(tool.position, Position::new(2.0, 2.0));
    }
}
