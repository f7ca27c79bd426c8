//! Review (`[review]`) and logging (`[logging]`) sections

use super::ConfigIssue;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use xpilot_domain::review::{MAX_CODING_ATTEMPTS, MAX_REVIEW_RETRIES};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReviewConfig {
    /// Coding attempts after which changes are accepted without review
    pub max_coding_attempts: u32,
    /// Re-prompts when the reviewer misses or invents hunks
    pub max_review_retries: u32,
}

impl Default for FileReviewConfig {
    fn default() -> Self {
        Self {
            max_coding_attempts: MAX_CODING_ATTEMPTS,
            max_review_retries: MAX_REVIEW_RETRIES,
        }
    }
}

impl FileReviewConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.max_coding_attempts == 0 {
            issues.push(ConfigIssue::error(
                "review.max_coding_attempts",
                "must be at least 1",
            ));
        }
        issues
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL file receiving one record per LLM request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_log: Option<PathBuf>,
}
