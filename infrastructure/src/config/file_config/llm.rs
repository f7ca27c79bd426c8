//! LLM configuration from TOML (`[llm]` section)

use super::ConfigIssue;
use serde::{Deserialize, Serialize};
use xpilot_domain::{DomainError, LlmConfig, Model, ProviderKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLlmConfig {
    /// Provider name: "openai", "anthropic", "groq" or "azure"
    pub provider: String,
    /// Model identifier; defaults to the provider's default model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature (ignored by models that don't support it)
    pub temperature: f32,
    /// Attempts per request before giving up
    pub max_retries: u32,
    /// Stream responses as they are generated
    pub stream: bool,
}

impl Default for FileLlmConfig {
    fn default() -> Self {
        let defaults = LlmConfig::default();
        Self {
            provider: defaults.provider.as_str().to_string(),
            model: None,
            temperature: defaults.temperature,
            max_retries: defaults.max_retries,
            stream: defaults.stream,
        }
    }
}

impl FileLlmConfig {
    pub fn parse_provider(&self) -> Result<ProviderKind, DomainError> {
        self.provider.parse()
    }

    /// Convert into [`LlmConfig`], falling back to defaults for invalid values.
    pub fn to_llm_config(&self) -> (LlmConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let defaults = LlmConfig::default();

        let provider = match self.parse_provider() {
            Ok(kind) => kind,
            Err(e) => {
                let valid: Vec<_> = ProviderKind::ALL.iter().map(|k| k.as_str()).collect();
                issues.push(ConfigIssue::error(
                    "llm.provider",
                    format!("{e} (valid values: {})", valid.join(", ")),
                ));
                defaults.provider
            }
        };

        let model = match self.model.as_deref().map(str::trim) {
            Some("") => {
                issues.push(ConfigIssue::warning(
                    "llm.model",
                    "model name is empty, using the provider default",
                ));
                provider.default_model()
            }
            Some(name) => name.parse::<Model>().unwrap_or_else(|never| match never {}),
            None => provider.default_model(),
        };

        let temperature = if (0.0..=2.0).contains(&self.temperature) {
            self.temperature
        } else {
            issues.push(ConfigIssue::warning(
                "llm.temperature",
                format!(
                    "temperature {} is outside 0.0..=2.0, using {}",
                    self.temperature, defaults.temperature
                ),
            ));
            defaults.temperature
        };

        let config = LlmConfig {
            provider,
            model,
            temperature,
            max_retries: self.max_retries,
            stream: self.stream,
        };
        (config, issues)
    }
}
