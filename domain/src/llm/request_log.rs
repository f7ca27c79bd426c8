//! Structured record of one LLM invocation

use crate::conversation::{Message, PromptLogEntry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of the latest attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Success,
    Error,
}

/// Record of one top-level `invoke` call.
///
/// Per-attempt fields (`messages`, `response`, `status`, `error`) describe the
/// most recent attempt; token counts accumulate across attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLog {
    pub provider: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub messages: Vec<Message>,
    pub prompts: Vec<PromptLogEntry>,
    pub response: Option<String>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub duration: Duration,
    pub status: RequestStatus,
    pub error: Option<String>,
}

impl RequestLog {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        temperature: Option<f32>,
        prompts: Vec<PromptLogEntry>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            temperature,
            messages: Vec::new(),
            prompts,
            response: None,
            prompt_tokens: 0,
            completion_tokens: 0,
            duration: Duration::ZERO,
            status: RequestStatus::Success,
            error: None,
        }
    }

    /// Reset per-attempt fields before sending `messages`.
    pub fn begin_attempt(&mut self, messages: &[Message]) {
        self.messages = messages.to_vec();
        self.response = None;
        self.status = RequestStatus::Success;
        self.error = None;
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.status = RequestStatus::Error;
    }

    pub fn record_response(
        &mut self,
        response: impl Into<String>,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) {
        self.response = Some(response.into());
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
    }

    pub fn is_success(&self) -> bool {
        self.status == RequestStatus::Success
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}
