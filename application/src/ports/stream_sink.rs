//! Stream sink port
//!
//! Receives response text as it is produced. `None` marks the end of one
//! response.

use async_trait::async_trait;
use tokio::sync::mpsc;

#[async_trait]
pub trait StreamSink: Send + Sync {
    async fn on_chunk(&self, chunk: Option<&str>);
}

/// Discards everything.
pub struct NoStreamSink;

#[async_trait]
impl StreamSink for NoStreamSink {
    async fn on_chunk(&self, _chunk: Option<&str>) {}
}

/// Event forwarded by [`ChannelStreamSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    End,
}

/// Forwards chunks over an mpsc channel.
pub struct ChannelStreamSink {
    sender: mpsc::Sender<StreamEvent>,
}

impl ChannelStreamSink {
    pub fn new(sender: mpsc::Sender<StreamEvent>) -> Self {
        Self { sender }
    }

    /// Sink plus the receiving end of a fresh channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl StreamSink for ChannelStreamSink {
    async fn on_chunk(&self, chunk: Option<&str>) {
        let event = match chunk {
            Some(text) => StreamEvent::Delta(text.to_string()),
            None => StreamEvent::End,
        };
        // A dropped receiver just means nobody is listening any more
        let _ = self.sender.send(event).await;
    }
}
