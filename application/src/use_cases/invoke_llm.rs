//! LLM request engine.
//!
//! [`LlmClient`] wraps one [`ProviderAdapter`] with the retry policy every
//! agent relies on:
//!
//! 1. The caller's conversation is forked; corrective messages only land in
//!    the fork.
//! 2. Each attempt consumes one unit of the retry budget.
//! 3. Throttling with a backoff hint sleeps once and retries; without a hint,
//!    or with an expired key, the call fails immediately.
//! 4. Unparseable responses are fed back to the model with a correction.
//! 5. When the budget runs out the optional [`ErrorHandler`] may grant a
//!    fresh one; otherwise a single [`ApiError`] is returned.

use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::error_handler::{ErrorHandler, LlmErrorKind};
use crate::ports::provider::{ProviderAdapter, ProviderError, SendOptions};
use crate::ports::stream_sink::{NoStreamSink, StreamSink};
use crate::use_cases::shared::is_cancelled;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use xpilot_domain::{Conversation, LlmConfig, Model, RawText, RequestLog, ResponseParser};

/// Fatal outcome of an `invoke` call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Retry budget spent and no continuation granted.
    #[error("{0}")]
    RetriesExhausted(String),

    /// Throttled with no backoff hint (typically an exhausted quota).
    #[error("Rate limit without retry window: {0}")]
    QuotaExhausted(String),

    #[error("API key expired or missing: {0}")]
    KeyExpiredOrMissing(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Per-call options for [`LlmClient::invoke`]
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Overrides the client's default temperature.
    pub temperature: Option<f32>,
    /// Overrides the client's retry budget.
    pub max_retries: Option<u32>,
    pub json_mode: bool,
}

impl InvokeOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// What the last failed attempt tripped over
enum Failure {
    Api(String),
    Parse,
}

/// Provider-agnostic LLM client with retry, backoff and response parsing.
pub struct LlmClient {
    adapter: Arc<dyn ProviderAdapter>,
    stream_sink: Arc<dyn StreamSink>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    conversation_logger: Arc<dyn ConversationLogger>,
    cancellation: Option<CancellationToken>,
    temperature: f32,
    max_retries: u32,
    stream: bool,
}

impl LlmClient {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        let defaults = LlmConfig::default();
        Self {
            adapter,
            stream_sink: Arc::new(NoStreamSink),
            error_handler: None,
            conversation_logger: Arc::new(NoConversationLogger),
            cancellation: None,
            temperature: defaults.temperature,
            max_retries: defaults.max_retries,
            stream: defaults.stream,
        }
    }

    /// Take temperature, retry budget and streaming preference from `config`.
    pub fn with_config(mut self, config: &LlmConfig) -> Self {
        self.temperature = config.temperature;
        self.max_retries = config.max_retries;
        self.stream = config.stream;
        self
    }

    pub fn with_stream_sink(mut self, sink: Arc<dyn StreamSink>) -> Self {
        self.stream_sink = sink;
        self
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn model(&self) -> &Model {
        self.adapter.model()
    }

    /// Invoke the model and parse the response with `parser`.
    pub async fn invoke<P: ResponseParser>(
        &self,
        conversation: &Conversation,
        parser: &P,
        options: InvokeOptions,
    ) -> Result<(P::Output, RequestLog), ApiError> {
        let provider = self.adapter.kind();
        let model = self.adapter.model().clone();
        let max_retries = options.max_retries.unwrap_or(self.max_retries);
        let temperature = options.temperature.unwrap_or(self.temperature);
        let sent_temperature = model.supports_temperature().then_some(temperature);

        let mut convo = conversation.fork();
        let mut log = RequestLog::new(
            provider.as_str(),
            model.as_str(),
            sent_temperature,
            convo.prompt_log().to_vec(),
        );
        let send_options = SendOptions {
            temperature: sent_temperature,
            json_mode: options.json_mode,
            stream: self.stream && model.supports_streaming(),
            cancellation: self.cancellation.clone(),
        };

        debug!(
            provider = %provider,
            model = %model,
            temperature = ?sent_temperature,
            "Calling LLM, prompt length: {:.1} KB",
            convo.content_len() as f64 / 1024.0
        );
        let started = Instant::now();

        let mut remaining = max_retries;
        let mut last_failure: Option<Failure> = None;
        let result = loop {
            if remaining == 0 {
                let message = match &last_failure {
                    Some(Failure::Api(err)) => format!("Error connecting to the LLM: {err}"),
                    _ => "Error parsing LLM response".to_string(),
                };
                if let Some(handler) = &self.error_handler
                    && handler
                        .on_error(LlmErrorKind::GenericApiError, &message)
                        .await
                {
                    info!("Retry budget renewed by error handler");
                    remaining = max_retries;
                    continue;
                }
                break Err(ApiError::RetriesExhausted(message));
            }

            if is_cancelled(&self.cancellation) {
                break Err(ApiError::Cancelled);
            }

            remaining -= 1;
            log.begin_attempt(convo.messages());

            let completion = match self
                .adapter
                .send(&convo, &send_options, self.stream_sink.as_ref())
                .await
            {
                Ok(completion) => completion,
                Err(err) => {
                    warn!(provider = %provider, "API error: {}", err);
                    log.record_error(err.to_string());
                    match err {
                        ProviderError::RateLimited { .. } => {
                            let Some(delay) = self.adapter.rate_limit_delay(&err) else {
                                break Err(ApiError::QuotaExhausted(err.to_string()));
                            };
                            let message = format!(
                                "We've hit {} rate limit. Sleeping for {} seconds...",
                                provider,
                                delay.as_secs()
                            );
                            info!("{}", message);
                            if let Some(handler) = &self.error_handler {
                                handler.on_error(LlmErrorKind::RateLimited, &message).await;
                            }
                            tokio::time::sleep(delay).await;
                            last_failure = Some(Failure::Api(err.to_string()));
                        }
                        ProviderError::KeyExpiredOrMissing(message) => {
                            if let Some(handler) = &self.error_handler {
                                handler.on_error(LlmErrorKind::KeyExpired, &message).await;
                            }
                            break Err(ApiError::KeyExpiredOrMissing(message));
                        }
                        ProviderError::Cancelled => break Err(ApiError::Cancelled),
                        other => last_failure = Some(Failure::Api(other.to_string())),
                    }
                    continue;
                }
            };

            log.record_response(
                &completion.content,
                completion.prompt_tokens,
                completion.completion_tokens,
            );
            match parser.parse(&completion.content) {
                Ok(parsed) => break Ok(parsed),
                Err(err) => {
                    debug!("Error parsing LLM response: {}, asking LLM to retry", err);
                    log.record_error(format!("Error parsing response: {err}"));
                    convo.assistant(completion.content).user(format!(
                        "Error parsing response: {err}. Please output your response EXACTLY as requested."
                    ));
                    last_failure = Some(Failure::Parse);
                }
            }
        };

        log.duration = started.elapsed();
        debug!(
            provider = %provider,
            duration = ?log.duration,
            "Total response time, {} prompt tokens, {} completion tokens used",
            log.prompt_tokens,
            log.completion_tokens
        );
        self.conversation_logger
            .log(ConversationEvent::llm_request(&log));

        result.map(|parsed| (parsed, log))
    }

    /// Invoke without parsing; any successful response ends the loop.
    pub async fn invoke_text(
        &self,
        conversation: &Conversation,
        options: InvokeOptions,
    ) -> Result<(String, RequestLog), ApiError> {
        self.invoke(conversation, &RawText, options).await
    }

    /// Connectivity self-check: any non-empty answer counts as success.
    pub async fn api_check(&self) -> bool {
        let mut convo = Conversation::new();
        convo.user(xpilot_domain::PromptTemplate::api_check());
        match self.invoke_text(&convo, InvokeOptions::default()).await {
            Ok((response, _)) => !response.is_empty(),
            Err(err) => {
                warn!("API check failed: {}", err);
                false
            }
        }
    }
}
