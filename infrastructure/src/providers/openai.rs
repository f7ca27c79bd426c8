//! OpenAI-compatible chat completions adapter
//!
//! Serves OpenAI, Groq (same API under a different base URL) and Azure
//! OpenAI (deployment URL, `api-key` header, `api-version` query).

use super::sse::SseDecoder;
use super::tokens::{estimate_prompt_tokens, estimate_tokens};
use super::{check_status, invalid_response, missing_key_error, transport_error};
use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use xpilot_application::ports::provider::{
    Completion, ProviderAdapter, ProviderError, SendOptions,
};
use xpilot_application::ports::stream_sink::StreamSink;
use xpilot_domain::{Conversation, EndpointConfig, Model, ProviderKind, Role};

const REMAINING_TOKENS: &str = "x-ratelimit-remaining-tokens";
const RESET_TOKENS: &str = "x-ratelimit-reset-tokens";
const RESET_REQUESTS: &str = "x-ratelimit-reset-requests";
const DEFAULT_RESET: Duration = Duration::from_secs(5);

static RESET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)(ms|h|m|s)").expect("reset pattern is valid")
});

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

pub struct OpenAiProvider {
    kind: ProviderKind,
    client: reqwest::Client,
    endpoint: EndpointConfig,
    api_key: Option<String>,
    model: Model,
}

impl OpenAiProvider {
    pub fn new(
        kind: ProviderKind,
        client: reqwest::Client,
        endpoint: EndpointConfig,
        api_key: Option<String>,
        model: Model,
    ) -> Self {
        Self {
            kind,
            client,
            endpoint,
            api_key,
            model,
        }
    }

    fn url(&self) -> String {
        let base = self.endpoint.base_url.trim_end_matches('/');
        match self.kind {
            ProviderKind::Azure => format!(
                "{base}/openai/deployments/{}/chat/completions?api-version={}",
                self.model,
                self.endpoint.api_version.as_deref().unwrap_or_default()
            ),
            _ => format!("{base}/chat/completions"),
        }
    }

    fn request_body(&self, conversation: &Conversation, options: &SendOptions) -> Value {
        // System prompts are sent as user messages
        let messages: Vec<Value> = conversation
            .messages()
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => Role::User,
                    other => other,
                };
                json!({ "role": role.as_str(), "content": m.content })
            })
            .collect();

        let mut body = json!({
            "model": self.model.as_str(),
            "messages": messages,
            "stream": options.stream,
        });
        let max_tokens_key = if self.model.is_reasoning() {
            "max_completion_tokens"
        } else {
            "max_tokens"
        };
        body[max_tokens_key] = json!(self.endpoint.max_tokens);
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        if options.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        if options.stream && self.kind == ProviderKind::OpenAi {
            body["stream_options"] = json!({ "include_usage": true });
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
        let mut usage = None;

        loop {
            let (events, done) = match stream.next().await {
                Some(chunk) => {
                    if options.is_cancelled() {
                        return Err(ProviderError::Cancelled);
                    }
                    let bytes = chunk.map_err(|e| transport_error(self.kind, e))?;
                    (decoder.push(&bytes), false)
                }
                None => (decoder.finish().into_iter().collect(), true),
            };
            for event in events {
                if event.data == "[DONE]" {
                    continue;
                }
                let chunk: ChatChunk =
                    serde_json::from_str(&event.data).map_err(|e| invalid_response(self.kind, e))?;
                if chunk.usage.is_some() {
                    usage = chunk.usage;
                }
                for text in chunk.choices.into_iter().filter_map(|c| c.delta.content) {
                    if text.is_empty() {
                        continue;
                    }
                    sink.on_chunk(Some(&text)).await;
                    content.push_str(&text);
                }
            }
            if done {
                break;
            }
        }
        sink.on_chunk(None).await;

        let (prompt_tokens, completion_tokens) = match usage {
            Some(u) => (u.prompt_tokens, u.completion_tokens),
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
        conversation: &Conversation,
        sink: &dyn StreamSink,
    ) -> Result<Completion, ProviderError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(self.kind, e))?;
        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|e| invalid_response(self.kind, e))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        sink.on_chunk(Some(&content)).await;
        sink.on_chunk(None).await;

        let (prompt_tokens, completion_tokens) = match parsed.usage {
            Some(u) => (u.prompt_tokens, u.completion_tokens),
            None => (
                estimate_prompt_tokens(conversation),
                estimate_tokens(&content),
            ),
        };
        Ok(Completion::new(content, prompt_tokens, completion_tokens))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
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

        let url = self.url();
        debug!(provider = %self.kind, model = %self.model, url = %url, stream = options.stream, "Sending chat completion");
        let request = self
            .client
            .post(&url)
            .json(&self.request_body(conversation, options));
        let request = match self.kind {
            ProviderKind::Azure => request.header("api-key", api_key),
            _ => request.bearer_auth(api_key),
        };

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(self.kind, e))?;
        let response = check_status(self.kind, response).await?;

        if options.stream {
            self.read_stream(response, conversation, options, sink).await
        } else {
            self.read_whole(response, conversation, sink).await
        }
    }

    fn rate_limit_delay(&self, error: &ProviderError) -> Option<Duration> {
        reset_delay(error.headers()?)
    }
}

/// Backoff from OpenAI-style `x-ratelimit-*` headers.
///
/// With no tokens left the token window reset applies, otherwise the
/// request window reset. Durations look like `1h2m3s`, `6m0s`, `1.5s` or `20ms`.
pub fn reset_delay(headers: &HashMap<String, String>) -> Option<Duration> {
    let remaining = headers.get(REMAINING_TOKENS)?;
    let reset_header = if remaining.trim() == "0" {
        RESET_TOKENS
    } else {
        RESET_REQUESTS
    };
    let reset = headers.get(reset_header).map(String::as_str).unwrap_or("");
    Some(parse_reset(reset))
}

fn parse_reset(value: &str) -> Duration {
    let mut millis = 0.0;
    let mut matched = false;
    for caps in RESET_PATTERN.captures_iter(value) {
        let Ok(amount) = caps[1].parse::<f64>() else {
            continue;
        };
        let unit = match &caps[2] {
            "h" => 3_600_000.0,
            "m" => 60_000.0,
            "s" => 1_000.0,
            _ => 1.0,
        };
        millis += amount * unit;
        matched = true;
    }
    if !matched {
        return DEFAULT_RESET;
    }
    // Float-to-int casts saturate, so absurd values cannot overflow.
    Duration::from_millis(millis.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_server::serve_once;
    use std::sync::Mutex;
    use xpilot_application::ports::stream_sink::NoStreamSink;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Option<String>>>);

    #[async_trait]
    impl StreamSink for Collect {
        async fn on_chunk(&self, chunk: Option<&str>) {
            self.0.lock().unwrap().push(chunk.map(str::to_string));
        }
    }

    fn provider(kind: ProviderKind, base_url: &str, model: Model) -> OpenAiProvider {
        let mut endpoint = EndpointConfig::defaults_for(kind);
        endpoint.base_url = base_url.to_string();
        OpenAiProvider::new(
            kind,
            reqwest::Client::new(),
            endpoint,
            Some("sk-test".to_string()),
            model,
        )
    }

    fn convo() -> Conversation {
        let mut convo = Conversation::new();
        convo.system("You are terse.").user("Say hi");
        convo
    }

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reset_delay_uses_token_window_when_exhausted() {
        let h = headers(&[
            (REMAINING_TOKENS, "0"),
            (RESET_TOKENS, "1m30s"),
            (RESET_REQUESTS, "2s"),
        ]);
        assert_eq!(reset_delay(&h), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_reset_delay_uses_request_window_otherwise() {
        let h = headers(&[
            (REMAINING_TOKENS, "1500"),
            (RESET_TOKENS, "1m30s"),
            (RESET_REQUESTS, "1h2m3s"),
        ]);
        assert_eq!(reset_delay(&h), Some(Duration::from_secs(3723)));
    }

    #[test]
    fn test_reset_delay_sub_second_and_fractional_units() {
        let exhausted = |reset: &str| {
            reset_delay(&headers(&[(REMAINING_TOKENS, "0"), (RESET_TOKENS, reset)]))
        };
        assert_eq!(exhausted("20ms"), Some(Duration::from_millis(20)));
        assert_eq!(exhausted("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(exhausted("6m0s"), Some(Duration::from_secs(360)));
        assert_eq!(exhausted("1m0.5s"), Some(Duration::from_millis(60_500)));
        assert_eq!(exhausted("soon"), Some(DEFAULT_RESET));
    }

    #[test]
    fn test_reset_delay_defaults_and_absence() {
        assert_eq!(reset_delay(&headers(&[])), None);
        let h = headers(&[(REMAINING_TOKENS, "0")]);
        assert_eq!(reset_delay(&h), Some(DEFAULT_RESET));
        let h = headers(&[(REMAINING_TOKENS, "0"), (RESET_TOKENS, "0s")]);
        assert_eq!(reset_delay(&h), Some(Duration::ZERO));
    }

    #[test]
    fn test_request_body_maps_roles_and_options() {
        let p = provider(ProviderKind::OpenAi, "http://unused", Model::Gpt4o);
        let options = SendOptions::default()
            .with_temperature(Some(0.0))
            .with_json_mode(true)
            .with_stream(true);
        let body = p.request_body(&convo(), &options);

        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "You are terse.");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["stream_options"]["include_usage"], true);
        assert_eq!(body["max_tokens"], 8192);
    }

    #[test]
    fn test_request_body_for_reasoning_model() {
        let p = provider(ProviderKind::OpenAi, "http://unused", Model::O1Mini);
        let body = p.request_body(&convo(), &SendOptions::default());
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["max_completion_tokens"], 8192);
    }

    #[test]
    fn test_groq_skips_stream_options() {
        let p = provider(ProviderKind::Groq, "http://unused", Model::Llama31_70b);
        let body = p.request_body(&convo(), &SendOptions::default().with_stream(true));
        assert!(body.get("stream_options").is_none());
    }

    #[test]
    fn test_azure_url() {
        let mut p = provider(
            ProviderKind::Azure,
            "https://res.openai.azure.com/",
            Model::Gpt4o,
        );
        p.endpoint.api_version = Some("2024-02-15-preview".to_string());
        assert_eq!(
            p.url(),
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-15-preview"
        );
    }

    #[tokio::test]
    async fn test_non_streaming_response() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "hi"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1}
        })
        .to_string();
        let (url, server) = serve_once("200 OK", &[("content-type", "application/json")], &body).await;
        let p = provider(ProviderKind::OpenAi, &url, Model::Gpt4o);
        let sink = Collect::default();

        let completion = p.send(&convo(), &SendOptions::default(), &sink).await.unwrap();

        assert_eq!(completion, Completion::new("hi", 12, 1));
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![Some("hi".to_string()), None]
        );
        let received = server.await.unwrap();
        assert!(received.head.starts_with("POST /chat/completions"));
        assert_eq!(received.header("authorization"), Some("Bearer sk-test"));
        assert_eq!(received.json()["stream"], false);
    }

    #[tokio::test]
    async fn test_streaming_response_without_usage_estimates_tokens() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo!\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let (url, _server) =
            serve_once("200 OK", &[("content-type", "text/event-stream")], body).await;
        let p = provider(ProviderKind::Groq, &url, Model::Llama31_70b);
        let sink = Collect::default();

        let completion = p
            .send(&convo(), &SendOptions::default().with_stream(true), &sink)
            .await
            .unwrap();

        assert_eq!(completion.content, "Hello!");
        assert_eq!(completion.completion_tokens, 2);
        assert_eq!(completion.prompt_tokens, 6);
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![Some("Hel".to_string()), Some("lo!".to_string()), None]
        );
    }

    #[tokio::test]
    async fn test_streaming_usage_chunk_wins() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":40,\"completion_tokens\":1}}\n\n",
            "data: [DONE]\n\n",
        );
        let (url, _server) = serve_once("200 OK", &[], body).await;
        let p = provider(ProviderKind::OpenAi, &url, Model::Gpt4o);

        let completion = p
            .send(&convo(), &SendOptions::default().with_stream(true), &NoStreamSink)
            .await
            .unwrap();
        assert_eq!(completion, Completion::new("ok", 40, 1));
    }

    #[tokio::test]
    async fn test_rate_limit_keeps_headers() {
        let (url, _server) = serve_once(
            "429 Too Many Requests",
            &[(REMAINING_TOKENS, "0"), (RESET_TOKENS, "7s")],
            "{\"error\":{\"message\":\"slow down\"}}",
        )
        .await;
        let p = provider(ProviderKind::OpenAi, &url, Model::Gpt4o);

        let err = p
            .send(&convo(), &SendOptions::default(), &NoStreamSink)
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(p.rate_limit_delay(&err), Some(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn test_unauthorized_is_key_error() {
        let (url, _server) = serve_once("401 Unauthorized", &[], "bad key").await;
        let p = provider(ProviderKind::OpenAi, &url, Model::Gpt4o);
        let err = p
            .send(&convo(), &SendOptions::default(), &NoStreamSink)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::KeyExpiredOrMissing(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let (url, _server) = serve_once("503 Service Unavailable", &[], "overloaded").await;
        let p = provider(ProviderKind::OpenAi, &url, Model::Gpt4o);
        let err = p
            .send(&convo(), &SendOptions::default(), &NoStreamSink)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::Api {
                status: 503,
                message: "overloaded".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_sending() {
        let p = OpenAiProvider::new(
            ProviderKind::OpenAi,
            reqwest::Client::new(),
            EndpointConfig::defaults_for(ProviderKind::OpenAi),
            None,
            Model::Gpt4o,
        );
        let err = p
            .send(&convo(), &SendOptions::default(), &NoStreamSink)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
