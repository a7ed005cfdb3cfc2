//! Scripted in-memory model for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;

use crate::llm::{ChatMessage, LanguageModel, ModelError};
use crate::sse::{DeltaStream, StreamEvent};

/// What a scripted model does when called.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Stream these events.
    Stream(Vec<StreamEvent>),
    /// Stream a fragment, then drop the connection.
    Broken,
    /// Answer `complete` with this text.
    Reply(String),
    /// Fail with this HTTP status.
    Status(u16),
    /// Never answer.
    Hang,
}

impl Script {
    pub(crate) fn speech(text: &str) -> Self {
        Script::Stream(vec![StreamEvent::Delta(text.to_string()), StreamEvent::Done])
    }
}

/// A [`LanguageModel`] answering per model id from a fixed script.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl ScriptedModel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, model: &str, script: Script) -> Self {
        self.scripts.insert(model.to_string(), script);
        self
    }

    /// Model ids called so far, in order.
    pub(crate) fn called_models(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(model, _)| model.clone())
            .collect()
    }

    /// Messages of the most recent call.
    pub(crate) fn last_messages(&self) -> Vec<ChatMessage> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, messages)| messages.clone())
            .unwrap_or_default()
    }

    fn script(&self, model: &str, messages: &[ChatMessage]) -> Option<Script> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
        self.scripts.get(model).cloned()
    }
}

fn unscripted(model: &str) -> ModelError {
    ModelError::Status {
        status: 404,
        body: format!("no script for {model}"),
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn stream_complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<DeltaStream, ModelError> {
        match self.script(model, messages) {
            Some(Script::Stream(events)) => Ok(Box::pin(stream::iter(events.into_iter().map(Ok)))),
            Some(Script::Broken) => Ok(Box::pin(stream::iter(vec![
                Ok(StreamEvent::Delta("Honorable judges".into())),
                Err(ModelError::Transport("connection reset".into())),
            ]))),
            Some(Script::Status(status)) => Err(ModelError::Status {
                status,
                body: "error".into(),
            }),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ModelError::Transport("hung".into()))
            }
            Some(Script::Reply(_)) | None => Err(unscripted(model)),
        }
    }

    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ModelError> {
        match self.script(model, messages) {
            Some(Script::Reply(text)) => Ok(text),
            Some(Script::Status(status)) => Err(ModelError::Status {
                status,
                body: "error".into(),
            }),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ModelError::Transport("hung".into()))
            }
            _ => Err(unscripted(model)),
        }
    }
}
