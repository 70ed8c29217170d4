//! Test doubles and fixtures shared by the Wayfarer crates.

pub mod fixtures;

use std::collections::VecDeque;
use std::sync::Mutex;

use futures::future::BoxFuture;
use serde::Serialize;

use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::traits::{WorkerInvoker, WorkerOutput};
use wayfarer_core::types::ChatMessage;

/// What a [`ScriptedWorker`] was called with.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    /// Length of the history passed in.
    pub history_len: usize,
    /// Text of the last message in that history, if any.
    pub last_message: Option<String>,
}

/// A worker that replays queued responses in order.
///
/// Successful responses extend the history with the prompt and the
/// response serialized as JSON, like a model-backed worker would. Calling
/// it after the script runs out is a `Worker` error.
pub struct ScriptedWorker<T> {
    name: String,
    script: Mutex<VecDeque<Result<T>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl<T> ScriptedWorker<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response.
    pub fn then_ok(self, value: T) -> Self {
        self.script.lock().unwrap().push_back(Ok(value));
        self
    }

    /// Queue a failure.
    pub fn then_err(self, error: WayfarerError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl<T> WorkerInvoker<T> for ScriptedWorker<T>
where
    T: Serialize + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
        history: Vec<ChatMessage>,
    ) -> BoxFuture<'a, Result<WorkerOutput<T>>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(RecordedCall {
                prompt: prompt.to_string(),
                history_len: history.len(),
                last_message: history.last().map(ChatMessage::text),
            });

            let next = self.script.lock().unwrap().pop_front();
            let value = match next {
                Some(result) => result?,
                None => return Err(WayfarerError::worker(&self.name, "script exhausted")),
            };

            let mut history = history;
            history.push(ChatMessage::user(prompt));
            history.push(ChatMessage::assistant_text(serde_json::to_string(&value)?));
            Ok(WorkerOutput::new(value, history))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_exhausts() {
        let worker = ScriptedWorker::new("w")
            .then_ok(1u32)
            .then_err(WayfarerError::validation("w", "bad"))
            .then_ok(2u32);

        let first = worker.invoke("a", vec![]).await.unwrap();
        assert_eq!(first.result, 1);
        assert_eq!(first.history.len(), 2);
        assert_eq!(first.history[1].text(), "1");

        assert!(matches!(
            worker.invoke("b", first.history.clone()).await,
            Err(WayfarerError::Validation { .. })
        ));
        assert_eq!(worker.invoke("c", vec![]).await.unwrap().result, 2);
        assert!(matches!(
            worker.invoke("d", vec![]).await,
            Err(WayfarerError::Worker { .. })
        ));

        let calls = worker.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[1].history_len, 2);
        assert_eq!(calls[1].last_message.as_deref(), Some("1"));
        assert_eq!(worker.remaining(), 0);
    }
}
