//! Tool registry: the read-only catalog of templates a user can place.

use crate::model::{ToolInstance, ToolTemplate};
use crate::validate::{InputType, infer_input_type};
use std::collections::HashSet;

/// An immutable catalog of tool templates, keyed by `name`.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    templates: Vec<ToolTemplate>,
}

impl ToolRegistry {
    /// Build a registry. Later duplicates of a name are dropped.
    pub fn new(templates: Vec<ToolTemplate>) -> Self {
        let mut seen = HashSet::new();
        let templates = templates
            .into_iter()
            .filter(|t| {
                let fresh = seen.insert(t.name.clone());
                if !fresh {
                    log::warn!("registry: duplicate template name `{}` ignored", t.name);
                }
                fresh
            })
            .collect();
        Self { templates }
    }

    /// The built-in catalog shipped with the canvas.
    pub fn builtin() -> Self {
        Self::new(vec![
            ToolTemplate::new(
                "get_weather",
                "Weather Forecast",
                &[("location", "Durham, NC"), ("date", "tomorrow")],
            )
            .with_description("Get weather information for any location and date"),
            ToolTemplate::new(
                "search_wikipedia",
                "Wikipedia Search",
                &[("query", "React"), ("language", "en")],
            )
            .with_description("Search Wikipedia articles and get information"),
            ToolTemplate::new(
                "send_email",
                "Email Sender",
                &[("to", ""), ("subject", ""), ("body", "")],
            )
            .with_description("Compose and send email messages"),
            ToolTemplate::new("calculate", "Calculator", &[("expression", "2 + 2")])
                .with_description("Perform mathematical calculations and equations"),
            ToolTemplate::new(
                "translate_text",
                "Text Translator",
                &[("text", ""), ("from", "en"), ("to", "es")],
            )
            .with_description("Translate text between different languages")
            .with_input_type("from", InputType::Alphanumeric)
            .with_input_type("to", InputType::Alphanumeric),
        ])
    }

    pub fn templates(&self) -> &[ToolTemplate] {
        &self.templates
    }

    pub fn get(&self, name: &str) -> Option<&ToolTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Display name for a placed tool, falling back to its raw name when
    /// the template is unknown.
    pub fn display_name<'a>(&'a self, tool: &'a ToolInstance) -> &'a str {
        self.get(&tool.name)
            .map(|t| t.display_name.as_str())
            .unwrap_or(tool.name.as_str())
    }

    /// Input type of `param` on a placed tool. Orphans fall back to
    /// name-based inference.
    pub fn input_type(&self, tool: &ToolInstance, param: &str) -> InputType {
        match self.get(&tool.name) {
            Some(template) => template.input_type(param),
            None => infer_input_type(param),
        }
    }

    /// Templates not yet placed on the canvas.
    pub fn available<'a>(&'a self, placed: &[ToolInstance]) -> Vec<&'a ToolTemplate> {
        let used: HashSet<&str> = placed.iter().map(|t| t.name.as_str()).collect();
        self.templates
            .iter()
            .filter(|t| !used.contains(t.name.as_str()))
            .collect()
    }
}
