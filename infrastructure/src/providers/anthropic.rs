//! Anthropic Messages API adapter

use super::sse::SseDecoder;
use super::tokens::{estimate_prompt_tokens, estimate_tokens};
use super::{check_status, invalid_response, missing_key_error, transport_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use xpilot_application::ports::provider::{
    Completion, ProviderAdapter, ProviderError, SendOptions,
};
use xpilot_application::ports::stream_sink::StreamSink;
use xpilot_domain::{Conversation, EndpointConfig, Model, ProviderKind, Role};

const DEFAULT_API_VERSION: &str = "2023-06-01";
const RETRY_AFTER: &str = "retry-after";
const RESET_HEADERS: [&str; 4] = [
    "anthropic-ratelimit-requests-reset",
    "anthropic-ratelimit-tokens-reset",
    "anthropic-ratelimit-input-tokens-reset",
    "anthropic-ratelimit-output-tokens-reset",
];

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Streaming event payloads, tagged by their `type` field
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart { message: StartMessage },
    ContentBlockDelta { delta: BlockDelta },
    MessageDelta { usage: Usage },
    Error { error: ErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StartMessage {
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct BlockDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

pub struct AnthropicProvider {
    client: reqwest::Client,
    endpoint: EndpointConfig,
    api_key: Option<String>,
    model: Model,
}

impl AnthropicProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: EndpointConfig,
        api_key: Option<String>,
        model: Model,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            model,
        }
    }

    fn url(&self) -> String {
        format!("{}/v1/messages", self.endpoint.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, conversation: &Conversation, options: &SendOptions) -> Value {
        let (system, messages) = to_anthropic_messages(conversation);
        let mut body = json!({
            "model": self.model.as_str(),
            "max_tokens": self.endpoint.max_tokens,
            "messages": messages,
            "stream": options.stream,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }

    async fn read_stream(
        &self,
        response: reqwest::Response,
        conversation: &Conversation,
        options: &SendOptions,
        sink: &dyn StreamSink,
    ) -> Result<Completion, ProviderError> {
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut content = String::new();
        let mut usage: Option<Usage> = None;

        loop {
            let (events, done) = match stream.next().await {
                Some(chunk) => {
                    if options.is_cancelled() {
                        return Err(ProviderError::Cancelled);
                    }
                    let bytes = chunk.map_err(|e| transport_error(ProviderKind::Anthropic, e))?;
                    (decoder.push(&bytes), false)
                }
                None => (decoder.finish().into_iter().collect(), true),
            };

            for event in events {
                let parsed: StreamEvent = serde_json::from_str(&event.data)
                    .map_err(|e| invalid_response(ProviderKind::Anthropic, e))?;
                match parsed {
                    StreamEvent::MessageStart { message } => {
                        usage.get_or_insert_with(Usage::default).input_tokens =
                            message.usage.input_tokens;
                    }
                    StreamEvent::ContentBlockDelta { delta } => {
                        if let Some(text) = delta.text.filter(|t| !t.is_empty()) {
                            sink.on_chunk(Some(&text)).await;
                            content.push_str(&text);
                        }
                    }
                    StreamEvent::MessageDelta { usage: delta } => {
                        usage.get_or_insert_with(Usage::default).output_tokens =
                            delta.output_tokens;
                    }
                    StreamEvent::Error { error } => {
                        return Err(stream_error(error));
                    }
                    StreamEvent::Other => {}
                }
            }
            if done {
                break;
            }
        }
        sink.on_chunk(None).await;

        let (prompt_tokens, completion_tokens) = match usage {
            Some(u) => (u.input_tokens, u.output_tokens),
            None => (
                estimate_prompt_tokens(conversation),
                estimate_tokens(&content),
            ),
        };
        Ok(Completion::new(content, prompt_tokens, completion_tokens))
    }

    async fn read_whole(
        &self,
        response: reqwest::Response,
        sink: &dyn StreamSink,
    ) -> Result<Completion, ProviderError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(ProviderKind::Anthropic, e))?;
        let parsed: MessagesResponse = serde_json::from_slice(&bytes)
            .map_err(|e| invalid_response(ProviderKind::Anthropic, e))?;
        let content: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        sink.on_chunk(Some(&content)).await;
        sink.on_chunk(None).await;

        Ok(Completion::new(
            content,
            parsed.usage.input_tokens,
            parsed.usage.output_tokens,
        ))
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &Model {
        &self.model
    }

    async fn send(
        &self,
        conversation: &Conversation,
        options: &SendOptions,
        sink: &dyn StreamSink,
    ) -> Result<Completion, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| missing_key_error(&self.endpoint))?;
        if options.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        if options.json_mode {
            debug!("Anthropic has no JSON mode; relying on the schema instructions");
        }

        let api_version = self
            .endpoint
            .api_version
            .as_deref()
            .unwrap_or(DEFAULT_API_VERSION);
        debug!(provider = "anthropic", model = %self.model, stream = options.stream, "Sending messages request");
        let response = self
            .client
            .post(self.url())
            .header("x-api-key", api_key)
            .header("anthropic-version", api_version)
            .json(&self.request_body(conversation, options))
            .send()
            .await
            .map_err(|e| transport_error(ProviderKind::Anthropic, e))?;
        let response = check_status(ProviderKind::Anthropic, response).await?;

        if options.stream {
            self.read_stream(response, conversation, options, sink).await
        } else {
            self.read_whole(response, sink).await
        }
    }

    fn rate_limit_delay(&self, error: &ProviderError) -> Option<Duration> {
        reset_delay(error.headers()?, Utc::now())
    }
}

/// Split a conversation into Anthropic's `system` field and alternating
/// messages.
///
/// Leading system messages become the system prompt; later ones are sent as
/// user messages. Consecutive messages with the same role are merged.
fn to_anthropic_messages(conversation: &Conversation) -> (Option<String>, Vec<Value>) {
    let messages = conversation.messages();
    let leading = messages
        .iter()
        .take_while(|m| m.role == Role::System)
        .count();
    let system = (leading > 0).then(|| {
        messages[..leading]
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    });

    let mut merged: Vec<(Role, String)> = Vec::new();
    for message in &messages[leading..] {
        let role = match message.role {
            Role::System => Role::User,
            other => other,
        };
        match merged.last_mut() {
            Some((last_role, content)) if *last_role == role => {
                content.push_str("\n\n");
                content.push_str(&message.content);
            }
            _ => merged.push((role, message.content.clone())),
        }
    }

    let messages = merged
        .into_iter()
        .map(|(role, content)| json!({ "role": role.as_str(), "content": content }))
        .collect();
    (system, messages)
}

fn stream_error(error: ErrorBody) -> ProviderError {
    match error.kind.as_str() {
        "rate_limit_error" => ProviderError::rate_limited(error.message, HashMap::new()),
        "authentication_error" | "permission_error" => {
            ProviderError::KeyExpiredOrMissing(error.message)
        }
        "overloaded_error" => ProviderError::Api {
            status: 529,
            message: error.message,
        },
        _ => ProviderError::Api {
            status: 500,
            message: format!("{}: {}", error.kind, error.message),
        },
    }
}

/// Backoff from Anthropic rate-limit headers.
///
/// A representable `retry-after` (seconds) wins; otherwise the earliest of
/// the `anthropic-ratelimit-*-reset` timestamps, measured from `now`.
pub fn reset_delay(headers: &HashMap<String, String>, now: DateTime<Utc>) -> Option<Duration> {
    if let Some(delay) = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    {
        return Some(delay);
    }

    RESET_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| DateTime::parse_from_rfc3339(value.trim()).ok())
        .map(|reset| reset.with_timezone(&Utc))
        .min()
        .map(|reset| (reset - now).to_std().unwrap_or(Duration::ZERO))
}
