//! Terminal adapters for the stream sink and error handler ports

use async_trait::async_trait;
use std::io::Write;
use tracing::warn;
use xpilot_application::{ErrorHandler, LlmErrorKind, StreamSink};

/// Prints response chunks as they arrive.
pub struct ConsoleStreamSink;

#[async_trait]
impl StreamSink for ConsoleStreamSink {
    async fn on_chunk(&self, chunk: Option<&str>) {
        let mut out = std::io::stdout().lock();
        let _ = match chunk {
            Some(text) => write!(out, "{text}"),
            None => writeln!(out),
        };
        let _ = out.flush();
    }
}

/// Asks on the terminal whether to keep retrying.
///
/// Non-interactive handlers always give up, so failures surface as errors.
pub struct ConsoleErrorHandler {
    interactive: bool,
}

impl ConsoleErrorHandler {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

#[async_trait]
impl ErrorHandler for ConsoleErrorHandler {
    async fn on_error(&self, kind: LlmErrorKind, message: &str) -> bool {
        eprintln!("LLM request failed ({kind}): {message}");
        if !self.interactive || kind == LlmErrorKind::KeyExpired {
            return false;
        }

        eprint!("Retry? [y/N] ");
        let _ = std::io::stderr().flush();
        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(e)) => {
                warn!("Could not read answer: {}", e);
                false
            }
            Err(e) => {
                warn!("Prompt task failed: {}", e);
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }

    #[tokio::test]
    async fn test_non_interactive_gives_up() {
        let handler = ConsoleErrorHandler::new(false);
        assert!(
            !handler
                .on_error(LlmErrorKind::GenericApiError, "boom")
                .await
        );
    }
}
