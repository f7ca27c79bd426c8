//! Execution parameters for the request engine and review loop.

use serde::{Deserialize, Serialize};

/// Attempt budgets shared by the use cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Attempts per LLM call before the error handler is consulted.
    pub max_retries: u32,
    /// Coding attempts after which a change is accepted without review.
    pub max_coding_attempts: u32,
    /// Re-prompts allowed when a review does not cover every hunk.
    pub max_review_retries: u32,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_coding_attempts: xpilot_domain::review::MAX_CODING_ATTEMPTS,
            max_review_retries: xpilot_domain::review::MAX_REVIEW_RETRIES,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_max_coding_attempts(mut self, max: u32) -> Self {
        self.max_coding_attempts = max;
        self
    }

    pub fn with_max_review_retries(mut self, max: u32) -> Self {
        self.max_review_retries = max;
        self
    }
}
