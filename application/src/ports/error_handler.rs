//! Error handler port
//!
//! Optional collaborator consulted when the request engine runs out of
//! retries or gets throttled. Returning `true` from a retries-exhausted
//! notification grants another full attempt budget.

use async_trait::async_trait;

/// What went wrong with an LLM call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmErrorKind {
    KeyExpired,
    RateLimited,
    GenericApiError,
}

impl LlmErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmErrorKind::KeyExpired => "key_expired",
            LlmErrorKind::RateLimited => "rate_limited",
            LlmErrorKind::GenericApiError => "generic_api_error",
        }
    }
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[async_trait]
pub trait ErrorHandler: Send + Sync {
    /// Returns whether the engine should keep trying.
    async fn on_error(&self, kind: LlmErrorKind, message: &str) -> bool;
}
