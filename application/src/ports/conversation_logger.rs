//! Port for structured request telemetry.
//!
//! [`ConversationLogger`] receives machine-readable events: one per finished
//! LLM request (successful or not) and one per converged code review.
//! Human-readable diagnostics go through `tracing` instead.

use serde_json::{Value, json};
use xpilot_domain::{RequestLog, ReviewChanges};

pub const LLM_REQUEST: &str = "llm_request";
pub const REVIEW_OUTCOME: &str = "review_outcome";

/// A structured telemetry event.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationEvent {
    /// One of [`LLM_REQUEST`] or [`REVIEW_OUTCOME`], or a caller-defined type.
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// The full request log: prompts, messages, response, tokens and timing.
    pub fn llm_request(log: &RequestLog) -> Self {
        Self::new(LLM_REQUEST, serde_json::to_value(log).unwrap_or_default())
    }

    /// Reviewer decisions for one file once every hunk is covered.
    pub fn review_outcome(file: &str, hunk_count: usize, review: &ReviewChanges) -> Self {
        Self::new(
            REVIEW_OUTCOME,
            json!({
                "file": file,
                "hunks": hunk_count,
                "decisions": review.hunks,
                "review_notes": review.review_notes,
            }),
        )
    }
}

/// Sink for telemetry events.
///
/// `log` is synchronous and infallible; implementations swallow their own
/// write failures.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// Drops every event.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
