//! LLM provider adapters
//!
//! Every adapter implements [`ProviderAdapter`] over plain HTTP:
//!
//! - [`OpenAiProvider`]: OpenAI, Groq and Azure OpenAI (same wire format)
//! - [`AnthropicProvider`]: the Anthropic Messages API
//!
//! [`create_provider`] picks the adapter for a configured [`ProviderKind`].

pub mod anthropic;
pub mod openai;
mod sse;
mod tokens;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use sse::{SseDecoder, SseEvent};
pub use tokens::{estimate_prompt_tokens, estimate_tokens};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use xpilot_application::ports::provider::{ProviderAdapter, ProviderError};
use xpilot_domain::{EndpointConfig, Model, ProviderKind};

/// Build the adapter for `kind`.
///
/// A missing API key is not an error here; it surfaces as
/// [`ProviderError::KeyExpiredOrMissing`] on the first request.
pub fn create_provider(
    kind: ProviderKind,
    endpoint: &EndpointConfig,
    model: Model,
) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
    let api_key = resolve_api_key(endpoint);
    if api_key.is_none() {
        warn!(
            provider = %kind,
            "No API key configured; set {} or providers.{}.api_key",
            endpoint.api_key_env,
            kind
        );
    }
    let client = build_http_client(endpoint)?;
    debug!(provider = %kind, model = %model, base_url = %endpoint.base_url, "Creating provider");

    let adapter: Arc<dyn ProviderAdapter> = match kind {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            client,
            endpoint.clone(),
            api_key,
            model,
        )),
        ProviderKind::OpenAi | ProviderKind::Groq | ProviderKind::Azure => Arc::new(
            OpenAiProvider::new(kind, client, endpoint.clone(), api_key, model),
        ),
    };
    Ok(adapter)
}

/// The direct key if set, otherwise the configured environment variable.
pub fn resolve_api_key(endpoint: &EndpointConfig) -> Option<String> {
    endpoint
        .api_key
        .clone()
        .or_else(|| std::env::var(&endpoint.api_key_env).ok())
        .filter(|key| !key.trim().is_empty())
}

fn build_http_client(endpoint: &EndpointConfig) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(endpoint.connect_timeout)
        .read_timeout(endpoint.read_timeout)
        .build()
        .map_err(|e| ProviderError::Transport(format!("Failed to build HTTP client: {e}")))
}

fn missing_key_error(endpoint: &EndpointConfig) -> ProviderError {
    ProviderError::KeyExpiredOrMissing(format!(
        "no API key found; set the {} environment variable",
        endpoint.api_key_env
    ))
}

fn transport_error(provider: ProviderKind, err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        return ProviderError::Transport(format!("{provider}: request timed out: {err}"));
    }
    ProviderError::Transport(format!("{provider}: {err}"))
}

/// Pass successful responses through; map error statuses to [`ProviderError`].
async fn check_status(
    provider: ProviderKind,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();
    let body = response.text().await.unwrap_or_default();
    debug!(provider = %provider, status = status.as_u16(), "Provider returned an error");

    Err(match status.as_u16() {
        429 => ProviderError::rate_limited(body, headers),
        401 | 403 => ProviderError::KeyExpiredOrMissing(format!("{provider}: {body}")),
        code => ProviderError::Api {
            status: code,
            message: body,
        },
    })
}

fn invalid_response(provider: ProviderKind, err: serde_json::Error) -> ProviderError {
    ProviderError::InvalidResponse(format!("{provider}: {err}"))
}

#[cfg(test)]
pub(crate) mod test_server {
    //! One-shot HTTP server answering a canned response.

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Raw request as received
    pub struct Received {
        pub head: String,
        pub body: String,
    }

    impl Received {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.head.lines().find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case(name).then(|| value.trim())
            })
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    /// Serve one request with `status`, extra `headers` and `body`.
    pub async fn serve_once(
        status: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> (String, JoinHandle<Received>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut response = format!(
            "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n",
            body.len()
        );
        for (name, value) in headers {
            response.push_str(&format!("{name}: {value}\r\n"));
        }
        response.push_str("\r\n");
        response.push_str(body);

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            let (head, body_start) = loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    break (String::from_utf8_lossy(&raw[..pos]).to_string(), pos + 4);
                }
            };
            let length = head
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            while raw.len() < body_start + length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            Received {
                head,
                body: String::from_utf8_lossy(&raw[body_start..]).to_string(),
            }
        });
        (format!("http://{addr}"), handle)
    }
}
