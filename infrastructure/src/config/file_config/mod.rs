//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain/application
//! types, collecting problems as [`ConfigIssue`]s instead of failing.

mod llm;
mod providers;
mod review;

pub use llm::FileLlmConfig;
pub use providers::{FileEndpointConfig, FileProvidersConfig};
pub use review::{FileLoggingConfig, FileReviewConfig};

use serde::{Deserialize, Serialize};
use xpilot_application::ExecutionParams;
use xpilot_domain::{LlmConfig, ProviderConfig};

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The configuration cannot work as written.
    Error,
    /// Works, but a fallback value is used.
    Warning,
}

/// A detected problem in the loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    /// Dotted key of the offending value, e.g. `llm.provider`.
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Provider, model and request settings
    pub llm: FileLlmConfig,
    /// Per-provider endpoint settings
    pub providers: FileProvidersConfig,
    /// Code review budgets
    pub review: FileReviewConfig,
    /// Request log output
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.llm.to_llm_config().1);
        issues.extend(self.providers.validate());
        issues.extend(self.review.validate());

        if let Ok(kind) = self.llm.parse_provider()
            && kind == xpilot_domain::ProviderKind::Azure
            && self.providers.azure.base_url.as_deref().unwrap_or_default().is_empty()
        {
            issues.push(ConfigIssue::error(
                "providers.azure.base_url",
                "Azure requires the resource endpoint, e.g. https://<resource>.openai.azure.com",
            ));
        }
        issues
    }

    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn llm_config(&self) -> LlmConfig {
        self.llm.to_llm_config().0
    }

    pub fn provider_config(&self) -> ProviderConfig {
        self.providers.to_provider_config()
    }

    pub fn execution_params(&self) -> ExecutionParams {
        ExecutionParams::default()
            .with_max_retries(self.llm.max_retries)
            .with_max_coding_attempts(self.review.max_coding_attempts)
            .with_max_review_retries(self.review.max_review_retries)
    }
}
