//! Synthetic assistant replies.
//!
//! The responder never computes anything: it echoes the prompt back inside a
//! fixed sentence, one character at a time, pausing between characters so
//! the UI can animate typing. `ResponseSource` is the seam a real generator
//! would plug into.

use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};

pub const DEFAULT_STREAM_DELAY_MS: u64 = 20;

/// Producer of an assistant reply as a stream of characters.
pub trait ResponseSource: Send + Sync {
    fn stream(&self, prompt: &str) -> BoxStream<'static, char>;
}

/// Full reply text for `prompt`.
#[must_use]
pub fn echo_reply(prompt: &str) -> String {
    format!("You said, \"{prompt}\" ...interesting.")
}

/// Echoes the prompt with a fixed delay after each character.
#[derive(Debug, Clone, Copy)]
pub struct EchoResponder {
    delay: Duration,
}

impl EchoResponder {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Responder with no inter-character delay.
    #[must_use]
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for EchoResponder {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_STREAM_DELAY_MS))
    }
}

impl ResponseSource for EchoResponder {
    fn stream(&self, prompt: &str) -> BoxStream<'static, char> {
        let delay = self.delay;
        let chars: Vec<char> = echo_reply(prompt).chars().collect();
        stream::iter(chars)
            .then(move |c| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                c
            })
            .boxed()
    }
}

/// Drain a reply stream into a single string.
pub async fn collect_response(stream: BoxStream<'_, char>) -> String {
    stream.collect::<String>().await
}

#[cfg(test)]
#[path = "echo_test.rs"]
mod tests;
