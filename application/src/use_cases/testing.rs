//! In-memory collaborators for use case tests.

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::error_handler::{ErrorHandler, LlmErrorKind};
use crate::ports::persistence::{FilePersistence, PersistenceError};
use crate::ports::provider::{Completion, ProviderAdapter, ProviderError, SendOptions};
use crate::ports::stream_sink::StreamSink;
use crate::ports::template::{TemplateError, TemplateRenderer};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use xpilot_domain::{Conversation, Message, Model, ProviderKind};

/// Header that makes [`ScriptedProvider::rate_limit_delay`] return a delay.
pub const TEST_DELAY_HEADER: &str = "x-test-delay-ms";

/// One recorded `send` call
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub stream: bool,
    pub json_mode: bool,
}

/// Provider answering from a fixed script.
pub struct ScriptedProvider {
    model: Model,
    script: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    requests: Mutex<Vec<SentRequest>>,
}

impl ScriptedProvider {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(Completion::new(content, 10, 5)))
    }

    pub fn fail(self, error: ProviderError) -> Self {
        self.push(Err(error))
    }

    /// Rate-limit error whose headers yield a 1ms backoff
    pub fn throttle(self) -> Self {
        let mut headers = HashMap::new();
        headers.insert(TEST_DELAY_HEADER.to_string(), "1".to_string());
        self.fail(ProviderError::rate_limited("429 Too Many Requests", headers))
    }

    fn push(self, step: Result<Completion, ProviderError>) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn requests(&self) -> Vec<SentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
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
        self.requests.lock().unwrap().push(SentRequest {
            messages: conversation.messages().to_vec(),
            temperature: options.temperature,
            stream: options.stream,
            json_mode: options.json_mode,
        });
        let step = self.script.lock().unwrap().pop_front();
        let completion = step.unwrap_or_else(|| {
            Err(ProviderError::Api {
                status: 500,
                message: "script exhausted".to_string(),
            })
        })?;
        sink.on_chunk(Some(&completion.content)).await;
        sink.on_chunk(None).await;
        Ok(completion)
    }

    fn rate_limit_delay(&self, error: &ProviderError) -> Option<Duration> {
        let ms = error.headers()?.get(TEST_DELAY_HEADER)?.parse().ok()?;
        Some(Duration::from_millis(ms))
    }
}

/// Sink remembering every chunk
#[derive(Default)]
pub struct RecordingSink {
    chunks: Mutex<Vec<Option<String>>>,
}

impl RecordingSink {
    pub fn chunks(&self) -> Vec<Option<String>> {
        self.chunks.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamSink for RecordingSink {
    async fn on_chunk(&self, chunk: Option<&str>) {
        self.chunks.lock().unwrap().push(chunk.map(str::to_string));
    }
}

/// Error handler answering retries-exhausted prompts from a queue
#[derive(Default)]
pub struct ScriptedErrorHandler {
    answers: Mutex<VecDeque<bool>>,
    calls: Mutex<Vec<(LlmErrorKind, String)>>,
}

impl ScriptedErrorHandler {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(LlmErrorKind, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ErrorHandler for ScriptedErrorHandler {
    async fn on_error(&self, kind: LlmErrorKind, message: &str) -> bool {
        self.calls.lock().unwrap().push((kind, message.to_string()));
        if kind != LlmErrorKind::GenericApiError {
            return false;
        }
        self.answers.lock().unwrap().pop_front().unwrap_or(false)
    }
}

/// Renders `<name>` followed by the variables as JSON.
pub struct EchoTemplates;

impl TemplateRenderer for EchoTemplates {
    fn render(&self, name: &str, variables: &Value) -> Result<String, TemplateError> {
        Ok(format!("<{name}>\n{variables}"))
    }
}

#[derive(Default)]
pub struct MemoryPersistence {
    files: Mutex<HashMap<String, String>>,
}

impl MemoryPersistence {
    pub fn file(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl FilePersistence for MemoryPersistence {
    async fn save_file(&self, path: &str, content: &str) -> Result<(), PersistenceError> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingLogger {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }
}

impl ConversationLogger for RecordingLogger {
    fn log(&self, event: ConversationEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type.to_string(), event.payload));
    }
}
