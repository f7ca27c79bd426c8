//! Provider configuration types (provider-neutral, serde-free).
//!
//! These types define the shape of provider settings without depending
//! on any serialization format (TOML, JSON, etc.).

use crate::core::error::DomainError;
use crate::core::model::Model;
use std::time::Duration;

/// LLM backends an adapter exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    /// OpenAI-compatible endpoint
    Groq,
    /// OpenAI-compatible deployment endpoint, `api-key` header auth
    Azure,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Groq,
        ProviderKind::Azure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Groq => "groq",
            ProviderKind::Azure => "azure",
        }
    }

    /// Whether the backend speaks the OpenAI chat completions dialect.
    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, ProviderKind::Anthropic)
    }

    /// Model used when the configuration names none.
    pub fn default_model(&self) -> Model {
        match self {
            ProviderKind::OpenAi | ProviderKind::Azure => Model::Gpt4o,
            ProviderKind::Anthropic => Model::ClaudeSonnet35,
            ProviderKind::Groq => Model::Llama31_70b,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "groq" => Ok(ProviderKind::Groq),
            "azure" => Ok(ProviderKind::Azure),
            other => Err(DomainError::UnknownProvider(other.to_string())),
        }
    }
}

/// Connection settings for one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Direct API key (prefer the env var).
    pub api_key: Option<String>,
    /// Base URL of the API.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Max tokens per response.
    pub max_tokens: u32,
    /// API version (Anthropic `anthropic-version` header, Azure `api-version` query).
    pub api_version: Option<String>,
}

impl EndpointConfig {
    /// Defaults for the given backend.
    pub fn defaults_for(kind: ProviderKind) -> Self {
        let (api_key_env, base_url, api_version) = match kind {
            ProviderKind::OpenAi => ("OPENAI_API_KEY", "https://api.openai.com/v1", None),
            ProviderKind::Anthropic => (
                "ANTHROPIC_API_KEY",
                "https://api.anthropic.com",
                Some("2023-06-01"),
            ),
            ProviderKind::Groq => ("GROQ_API_KEY", "https://api.groq.com/openai/v1", None),
            ProviderKind::Azure => ("AZURE_OPENAI_API_KEY", "", Some("2024-02-15-preview")),
        };
        Self {
            api_key_env: api_key_env.to_string(),
            api_key: None,
            base_url: base_url.to_string(),
            connect_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(20),
            max_tokens: 8192,
            api_version: api_version.map(str::to_string),
        }
    }
}

/// Settings for every known backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub openai: EndpointConfig,
    pub anthropic: EndpointConfig,
    pub groq: EndpointConfig,
    pub azure: EndpointConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai: EndpointConfig::defaults_for(ProviderKind::OpenAi),
            anthropic: EndpointConfig::defaults_for(ProviderKind::Anthropic),
            groq: EndpointConfig::defaults_for(ProviderKind::Groq),
            azure: EndpointConfig::defaults_for(ProviderKind::Azure),
        }
    }
}

impl ProviderConfig {
    pub fn endpoint(&self, kind: ProviderKind) -> &EndpointConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Groq => &self.groq,
            ProviderKind::Azure => &self.azure,
        }
    }

    pub fn endpoint_mut(&mut self, kind: ProviderKind) -> &mut EndpointConfig {
        match kind {
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Anthropic => &mut self.anthropic,
            ProviderKind::Groq => &mut self.groq,
            ProviderKind::Azure => &mut self.azure,
        }
    }
}

/// Which backend and model the request engine talks to.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub model: Model,
    /// Default sampling temperature when a call names none.
    pub temperature: f32,
    /// Attempt budget per `invoke` call.
    pub max_retries: u32,
    /// Stream output to the registered sink when the model allows it.
    pub stream: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: Model::default(),
            temperature: 0.5,
            max_retries: 3,
            stream: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("groq".parse::<ProviderKind>().unwrap(), ProviderKind::Groq);
        assert_eq!("azure".parse::<ProviderKind>().unwrap(), ProviderKind::Azure);

        let err = "bedrock".parse::<ProviderKind>().unwrap_err();
        assert_eq!(err, DomainError::UnknownProvider("bedrock".to_string()));
    }

    #[test]
    fn test_openai_compatibility() {
        assert!(ProviderKind::Groq.is_openai_compatible());
        assert!(ProviderKind::Azure.is_openai_compatible());
        assert!(!ProviderKind::Anthropic.is_openai_compatible());
    }

    #[test]
    fn test_endpoint_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.anthropic.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.anthropic.api_version.as_deref(), Some("2023-06-01"));
        assert_eq!(config.groq.base_url, "https://api.groq.com/openai/v1");
        assert!(config.azure.base_url.is_empty());
        assert_eq!(config.openai.connect_timeout, Duration::from_secs(60));
        assert_eq!(config.endpoint(ProviderKind::OpenAi).api_key, None);
    }

    #[test]
    fn test_llm_config_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.model, Model::Gpt4o);
        assert!(config.stream);
    }
}
