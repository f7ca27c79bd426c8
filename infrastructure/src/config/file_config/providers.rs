//! Provider configuration from TOML (`[providers.*]` sections)
//!
//! Every field is optional; unset fields take the provider's built-in default
//! from [`EndpointConfig::defaults_for`].

use super::ConfigIssue;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use xpilot_domain::{EndpointConfig, ProviderConfig, ProviderKind};

/// Endpoint settings for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEndpointConfig {
    /// Environment variable holding the API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Direct API key (prefer `api_key_env`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API base URL; for Azure the resource endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,
    /// Max tokens per response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// API version (Anthropic version header, Azure `api-version` query)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl FileEndpointConfig {
    /// Overlay the configured values on `kind`'s defaults.
    pub fn to_endpoint(&self, kind: ProviderKind) -> EndpointConfig {
        let mut endpoint = EndpointConfig::defaults_for(kind);
        if let Some(env) = &self.api_key_env {
            endpoint.api_key_env = env.clone();
        }
        if let Some(key) = &self.api_key {
            endpoint.api_key = Some(key.clone());
        }
        if let Some(url) = &self.base_url {
            endpoint.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = self.connect_timeout_secs {
            endpoint.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.read_timeout_secs {
            endpoint.read_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = self.max_tokens {
            endpoint.max_tokens = max;
        }
        if let Some(version) = &self.api_version {
            endpoint.api_version = Some(version.clone());
        }
        endpoint
    }

    fn validate(&self, section: &str) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for (name, value) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("read_timeout_secs", self.read_timeout_secs),
        ] {
            if value == Some(0) {
                issues.push(ConfigIssue::error(
                    format!("providers.{section}.{name}"),
                    "timeout cannot be 0",
                ));
            }
        }
        if self.max_tokens == Some(0) {
            issues.push(ConfigIssue::error(
                format!("providers.{section}.max_tokens"),
                "max_tokens cannot be 0",
            ));
        }
        if self.api_key.is_some() {
            issues.push(ConfigIssue::warning(
                format!("providers.{section}.api_key"),
                "API key stored in the config file; consider api_key_env instead",
            ));
        }
        issues
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    pub openai: FileEndpointConfig,
    pub anthropic: FileEndpointConfig,
    pub groq: FileEndpointConfig,
    pub azure: FileEndpointConfig,
}

impl FileProvidersConfig {
    pub fn endpoint(&self, kind: ProviderKind) -> &FileEndpointConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Groq => &self.groq,
            ProviderKind::Azure => &self.azure,
        }
    }

    pub fn to_provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::default();
        for kind in ProviderKind::ALL {
            *config.endpoint_mut(kind) = self.endpoint(kind).to_endpoint(kind);
        }
        config
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        ProviderKind::ALL
            .iter()
            .flat_map(|kind| self.endpoint(*kind).validate(kind.as_str()))
            .collect()
    }
}
