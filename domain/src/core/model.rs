//! Model value object representing an LLM model

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Known LLM models (Value Object)
///
/// Known variants carry capability knowledge that the request engine needs:
/// some models reject a temperature override, some cannot stream.
/// Anything else is carried verbatim as [`Model::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    // GPT models
    Gpt4o,
    Gpt4oMini,
    Gpt4Turbo,
    O1Preview,
    O1Mini,
    // Claude models
    ClaudeSonnet35,
    ClaudeHaiku3,
    ClaudeOpus3,
    // Open models (Groq)
    Llama31_70b,
    // Custom
    Custom(String),
}

impl Model {
    /// Get the string identifier for this model
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gpt4o => "gpt-4o",
            Model::Gpt4oMini => "gpt-4o-mini",
            Model::Gpt4Turbo => "gpt-4-turbo",
            Model::O1Preview => "o1-preview",
            Model::O1Mini => "o1-mini",
            Model::ClaudeSonnet35 => "claude-3-5-sonnet-20240620",
            Model::ClaudeHaiku3 => "claude-3-haiku-20240307",
            Model::ClaudeOpus3 => "claude-3-opus-20240229",
            Model::Llama31_70b => "llama-3.1-70b-versatile",
            Model::Custom(s) => s,
        }
    }

    /// Whether the backend accepts a `temperature` parameter for this model.
    ///
    /// The o1 family only runs at its fixed default; sending a value is an error.
    pub fn supports_temperature(&self) -> bool {
        !self.is_reasoning()
    }

    /// Whether the backend can stream incremental output for this model.
    pub fn supports_streaming(&self) -> bool {
        !self.is_reasoning()
    }

    /// o1-family models: fixed temperature, no streaming, and
    /// `max_completion_tokens` instead of `max_tokens`.
    pub fn is_reasoning(&self) -> bool {
        matches!(self, Model::O1Preview | Model::O1Mini)
    }
}

impl Default for Model {
    /// Returns the default model (GPT-4o)
    fn default() -> Self {
        Model::Gpt4o
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "gpt-4o" => Model::Gpt4o,
            "gpt-4o-mini" => Model::Gpt4oMini,
            "gpt-4-turbo" => Model::Gpt4Turbo,
            "o1-preview" => Model::O1Preview,
            "o1-mini" => Model::O1Mini,
            "claude-3-5-sonnet-20240620" => Model::ClaudeSonnet35,
            "claude-3-haiku-20240307" => Model::ClaudeHaiku3,
            "claude-3-opus-20240229" => Model::ClaudeOpus3,
            "llama-3.1-70b-versatile" => Model::Llama31_70b,
            other => Model::Custom(other.to_string()),
        })
    }
}

impl Serialize for Model {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let Ok(model) = s.parse();
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_models_roundtrip() {
        for model in [Model::Gpt4o, Model::O1Mini, Model::ClaudeSonnet35, Model::Llama31_70b] {
            let parsed: Model = model.to_string().parse().unwrap();
            assert_eq!(model, parsed);
        }
    }

    #[test]
    fn test_custom_model() {
        let model: Model = "my-finetune-v1".parse().unwrap();
        assert_eq!(model, Model::Custom("my-finetune-v1".to_string()));
        assert_eq!(model.to_string(), "my-finetune-v1");
        assert!(model.supports_temperature());
        assert!(model.supports_streaming());
    }

    #[test]
    fn test_fixed_temperature_models() {
        assert!(!Model::O1Preview.supports_temperature());
        assert!(!Model::O1Mini.supports_temperature());
        assert!(Model::Gpt4o.supports_temperature());
    }

    #[test]
    fn test_models_without_streaming() {
        assert!(!Model::O1Preview.supports_streaming());
        assert!(!Model::O1Mini.supports_streaming());
        assert!(Model::ClaudeSonnet35.supports_streaming());
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&Model::Gpt4o).unwrap();
        assert_eq!(json, "\"gpt-4o\"");
        let model: Model = serde_json::from_str("\"o1-mini\"").unwrap();
        assert_eq!(model, Model::O1Mini);
    }
}
