//! Language-model access.
//!
//! [`LanguageModel`] is the seam the orchestrator talks to;
//! [`OpenAiCompatibleClient`] implements it for OpenAI-compatible
//! endpoints such as OpenRouter.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ModelsConfig;
use crate::error::DebateError;
use crate::sse::{DeltaStream, decode_stream};

/// Who authored a message, from the model's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A role-tagged message sent to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }
}

/// Failure of a single model call.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Model endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Malformed model output: {0}")]
    Malformed(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),
}

/// A chat-completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Start a streamed completion and return its fragments.
    async fn stream_complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<DeltaStream, ModelError>;

    /// Run a completion to the end and return the reply text.
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ModelError>;
}

#[derive(Serialize)]
struct StreamRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    temperature: f32,
    top_p: f32,
    repetition_penalty: f32,
}

/// Client for OpenAI-compatible chat completion APIs.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    api_base: String,
    api_key: String,
    temperature: f32,
    top_p: f32,
    repetition_penalty: f32,
    http: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub fn new(models: &ModelsConfig, api_key: impl Into<String>) -> Result<Self, DebateError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(models.attempt_timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DebateError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base: models.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            temperature: models.temperature,
            top_p: models.top_p,
            repetition_penalty: models.repetition_penalty,
            http,
        })
    }

    fn openai_client(&self) -> Client<OpenAIConfig> {
        let config = OpenAIConfig::new()
            .with_api_key(&self.api_key)
            .with_api_base(&self.api_base);
        Client::with_config(config).with_http_client(self.http.clone())
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    async fn stream_complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<DeltaStream, ModelError> {
        let body = StreamRequest {
            model,
            messages,
            stream: true,
            temperature: self.temperature,
            top_p: self.top_p,
            repetition_penalty: self.repetition_penalty,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_stream(response.bytes_stream()))
    }

    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ModelError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .temperature(self.temperature)
            .top_p(self.top_p)
            .messages(messages.iter().map(to_request_message).collect::<Vec<_>>())
            .build()?;

        let response = self.openai_client().chat().create(request).await?;
        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

fn to_request_message(message: &ChatMessage) -> ChatCompletionRequestMessage {
    let content = message.content.clone();
    match message.role {
        MessageRole::System => {
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: content.into(),
                name: None,
            })
        }
        MessageRole::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: content.into(),
            name: None,
        }),
        MessageRole::Assistant => {
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(content.into()),
                name: None,
                tool_calls: None,
                refusal: None,
                audio: None,
                function_call: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_wire_format() {
        let json = serde_json::to_value(ChatMessage::user("Is that true?")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "Is that true?"}));
    }

    #[test]
    fn test_stream_request_body() {
        let messages = [ChatMessage::system("rules"), ChatMessage::user("hi")];
        let body = StreamRequest {
            model: "m",
            messages: &messages,
            stream: true,
            temperature: 0.5,
            top_p: 0.9,
            repetition_penalty: 1.2,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_request_message_roles() {
        let assistant = to_request_message(&ChatMessage::new(MessageRole::Assistant, "mine"));
        assert!(matches!(assistant, ChatCompletionRequestMessage::Assistant(_)));
        let system = to_request_message(&ChatMessage::system("rules"));
        assert!(matches!(system, ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn test_client_trims_api_base() {
        let models = ModelsConfig {
            api_base: "https://openrouter.ai/api/v1/".into(),
            ..ModelsConfig::default()
        };
        let client = OpenAiCompatibleClient::new(&models, "key").unwrap();
        assert_eq!(client.api_base, "https://openrouter.ai/api/v1");
    }
}
