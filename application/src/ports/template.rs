//! Template renderer port

use serde_json::Value;
use thiserror::Error;
use xpilot_domain::Conversation;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template {template} references missing variable {variable}")]
    MissingVariable { template: String, variable: String },
}

/// Turns a template name plus variables into literal prompt text.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, variables: &Value) -> Result<String, TemplateError>;

    /// Render `name` into `conversation` as a user message and record it in
    /// the prompt log.
    fn render_into(
        &self,
        conversation: &mut Conversation,
        name: &str,
        variables: Value,
    ) -> Result<(), TemplateError> {
        let text = self.render(name, &variables)?;
        conversation.user(text).record_prompt(name, variables);
        Ok(())
    }
}
