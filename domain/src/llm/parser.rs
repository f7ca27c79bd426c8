//! Parsers turning raw LLM output into typed values

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use thiserror::Error;

/// Why a response could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("response does not match the expected schema: {0}")]
    SchemaMismatch(String),

    #[error("{0}")]
    Invalid(String),
}

/// Converts a raw completion into a typed value.
pub trait ResponseParser: Send + Sync {
    type Output: Send;

    fn parse(&self, raw: &str) -> Result<Self::Output, ParseError>;
}

/// Returns the completion text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawText;

impl ResponseParser for RawText {
    type Output = String;

    fn parse(&self, raw: &str) -> Result<String, ParseError> {
        Ok(raw.to_string())
    }
}

type Validator<T> = Box<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

/// Parses JSON into `T`, whose schema doubles as the prompt instruction.
pub struct JsonParser<T> {
    validator: Option<Validator<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for JsonParser<T> {
    fn default() -> Self {
        Self {
            validator: None,
            _marker: PhantomData,
        }
    }
}

impl<T> JsonParser<T>
where
    T: DeserializeOwned + JsonSchema,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra semantic check run after deserialization.
    pub fn with_validator(
        mut self,
        validator: impl Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// JSON schema for `T`
    pub fn schema() -> Value {
        serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
    }
}

impl<T> ResponseParser for JsonParser<T>
where
    T: DeserializeOwned + JsonSchema + Send,
{
    type Output = T;

    fn parse(&self, raw: &str) -> Result<T, ParseError> {
        let body = strip_code_fence(raw);
        let value: T = serde_json::from_str(body).map_err(|e| match e.classify() {
            serde_json::error::Category::Data => ParseError::SchemaMismatch(e.to_string()),
            _ => ParseError::InvalidJson(e.to_string()),
        })?;
        if let Some(validate) = &self.validator {
            validate(&value).map_err(ParseError::Invalid)?;
        }
        Ok(value)
    }
}

/// Strip a surrounding markdown code fence (```` ``` ```` or ```` ```json ````).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
