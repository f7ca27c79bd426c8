//! Conversation domain entities

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message in a conversation (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One rendered prompt template, kept for telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptLogEntry {
    pub template: String,
    pub variables: Value,
}

/// Ordered message history forming one LLM prompt context (Entity)
///
/// Conversations are plain values. [`Conversation::fork`] hands back an
/// independent copy, so retries and re-prompts can append to the fork without
/// touching the caller's history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
    prompt_log: Vec<PromptLogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<Value>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a system message
    pub fn system(&mut self, content: impl Into<String>) -> &mut Self {
        self.messages.push(Message::system(content));
        self
    }

    /// Append a user message
    pub fn user(&mut self, content: impl Into<String>) -> &mut Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Append an assistant message
    pub fn assistant(&mut self, content: impl Into<String>) -> &mut Self {
        self.messages.push(Message::assistant(content));
        self
    }

    /// Independent copy of this conversation.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Record that `template` was rendered into this conversation.
    pub fn record_prompt(&mut self, template: impl Into<String>, variables: Value) -> &mut Self {
        self.prompt_log.push(PromptLogEntry {
            template: template.into(),
            variables,
        });
        self
    }

    /// Attach the expected output schema and tell the model about it.
    pub fn require_schema(&mut self, schema: Value) -> &mut Self {
        let pretty = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());
        self.messages.push(Message::user(format!(
            "IMPORTANT: Your response MUST conform to this JSON schema:\n```\n{}\n```\n\
             YOU MUST NEVER add any additional fields to your response, and NEVER add \
             additional preamble like \"Here is your JSON\".",
            pretty
        )));
        self.schema = Some(schema);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn prompt_log(&self) -> &[PromptLogEntry] {
        &self.prompt_log
    }

    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total characters across all message contents
    pub fn content_len(&self) -> usize {
        self.messages.iter().map(|m| m.content.len()).sum()
    }
}
