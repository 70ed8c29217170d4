use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::*;

/// LLM client: streaming chat against a model provider.
pub trait LlmClient: Send + Sync + 'static {
    /// Send a chat request and receive a stream of deltas.
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>>;
}

/// What a worker hands back from one delegated call.
#[derive(Debug, Clone)]
pub struct WorkerOutput<T> {
    /// The typed result.
    pub result: T,
    /// The updated history: the history passed in, followed by the
    /// messages exchanged during this call.
    pub history: Vec<ChatMessage>,
}

impl<T> WorkerOutput<T> {
    pub fn new(result: T, history: Vec<ChatMessage>) -> Self {
        Self { result, history }
    }

    /// Messages added by this call, given the length of the history that
    /// was passed in.
    pub fn new_messages(&self, prior_len: usize) -> &[ChatMessage] {
        self.history.get(prior_len..).unwrap_or(&[])
    }
}

/// Worker: performs one delegated call for a stage.
///
/// Transport and provider failures surface as `WayfarerError::Worker`;
/// output that does not parse or fails its schema as
/// `WayfarerError::Validation`.
pub trait WorkerInvoker<T>: Send + Sync + 'static {
    /// Worker name (used in logs and errors).
    fn name(&self) -> &str;

    /// Run one call with the given prompt and prior conversation history.
    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        history: Vec<ChatMessage>,
    ) -> BoxFuture<'a, Result<WorkerOutput<T>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_messages_slice() {
        let history = vec![
            ChatMessage::user("a"),
            ChatMessage::assistant_text("b"),
            ChatMessage::user("c"),
        ];
        let output = WorkerOutput::new((), history);
        assert_eq!(output.new_messages(1).len(), 2);
        assert_eq!(output.new_messages(1)[0].text(), "b");
        assert!(output.new_messages(3).is_empty());
        assert!(output.new_messages(10).is_empty());
    }
}
