use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use wayfarer_core::booking::Validate;
use wayfarer_core::config::ModelConfig;
use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::traits::{LlmClient, WorkerInvoker, WorkerOutput};
use wayfarer_core::types::{ChatMessage, StopReason, StreamDelta};

use crate::output::parse_output;

/// A worker backed by a chat model that answers in JSON.
///
/// Each call sends the system prompt, the prior history and the new user
/// prompt, collects the streamed answer, and parses and validates it as
/// `T`. The returned history is the input history plus the user prompt and
/// the model's answer; the system prompt is never stored in it.
pub struct LlmWorker<T> {
    name: String,
    client: Arc<dyn LlmClient>,
    config: ModelConfig,
    system_prompt: String,
    envelope: Option<&'static str>,
    _result: PhantomData<fn() -> T>,
}

impl<T> LlmWorker<T> {
    pub fn new(
        name: impl Into<String>,
        client: Arc<dyn LlmClient>,
        config: ModelConfig,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            config,
            system_prompt: system_prompt.into(),
            envelope: None,
            _result: PhantomData,
        }
    }

    /// Accept answers wrapped as `{"<key>": <result>}`.
    pub fn with_envelope(mut self, key: &'static str) -> Self {
        self.envelope = Some(key);
        self
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let mut stream = self
            .client
            .chat_stream(&self.config, messages)
            .await
            .map_err(|e| WayfarerError::worker(&self.name, e.to_string()))?;

        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            match delta.map_err(|e| WayfarerError::worker(&self.name, e.to_string()))? {
                StreamDelta::TextDelta(chunk) => text.push_str(&chunk),
                StreamDelta::Stop(StopReason::MaxTokens) => {
                    warn!(worker = %self.name, "Response hit max_tokens, output may be truncated");
                }
                StreamDelta::Stop(_) => {}
                StreamDelta::Usage {
                    input_tokens,
                    output_tokens,
                } => {
                    debug!(worker = %self.name, input_tokens, output_tokens, "Token usage");
                }
            }
        }
        Ok(text)
    }
}

impl<T> WorkerInvoker<T> for LlmWorker<T>
where
    T: DeserializeOwned + Validate + Send + 'static,
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
            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(ChatMessage::system(self.system_prompt.clone()));
            messages.extend(history.iter().cloned());
            messages.push(ChatMessage::user(prompt));

            let raw = self.complete(messages).await?;
            debug!(worker = %self.name, chars = raw.len(), "Worker answered");

            let result: T = parse_output(&raw, self.envelope)
                .map_err(|detail| WayfarerError::validation(&self.name, detail))?;
            result
                .validate()
                .map_err(|detail| WayfarerError::validation(&self.name, detail))?;

            let mut history = history;
            history.push(ChatMessage::user(prompt));
            history.push(ChatMessage::assistant_text(raw));
            Ok(WorkerOutput::new(result, history))
        })
    }
}
