//! Renders the built-in prompt templates.
//!
//! Placeholders are `{{name}}` or `{{object.field}}`. Values are inserted as:
//!
//! - strings verbatim
//! - numbers and booleans via `to_string`
//! - arrays of strings joined with blank lines, other arrays element by element
//! - objects as pretty-printed JSON
//!
//! A placeholder with no value is an error, never an empty string.

use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use xpilot_application::ports::template::{TemplateError, TemplateRenderer};
use xpilot_domain::PromptTemplate;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_.]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// [`TemplateRenderer`] over [`PromptTemplate`]'s built-in sources, with
/// optional per-name overrides.
#[derive(Debug, Default, Clone)]
pub struct BuiltinTemplates {
    overrides: HashMap<String, String>,
}

impl BuiltinTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the source of `name`.
    pub fn with_override(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), source.into());
        self
    }

    fn source(&self, name: &str) -> Option<&str> {
        self.overrides
            .get(name)
            .map(String::as_str)
            .or_else(|| PromptTemplate::source(name))
    }
}

impl TemplateRenderer for BuiltinTemplates {
    fn render(&self, name: &str, variables: &Value) -> Result<String, TemplateError> {
        let source = self
            .source(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))?;

        let mut missing = None;
        let rendered = PLACEHOLDER.replace_all(source, |caps: &Captures| {
            let path = &caps[1];
            match lookup(variables, path) {
                Some(value) => format_value(value),
                None => {
                    missing.get_or_insert_with(|| path.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(variable) => Err(TemplateError::MissingVariable {
                template: name.to_string(),
                variable,
            }),
            None => Ok(rendered.into_owned()),
        }
    }
}

fn lookup<'a>(variables: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(variables, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join("\n\n"),
        Value::Object(_) => serde_json::to_string_pretty(value).unwrap_or_default(),
    }
}
