use crate::error::{EngineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One turn of the conversation handed to the persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The external text-generation collaborator. The engine only consumes
/// the returned text; everything about win/loss is decided by the
/// interpreter afterwards.
#[async_trait]
pub trait PersonaClient: Send + Sync {
    async fn reply(&self, transcript: &[ChatTurn]) -> Result<String>;
}

/// Sampling knobs for [`ChatPersona`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            api_key: String::new(),
            model: "deepseek-chat".to_string(),
            temperature: 0.85,
            max_tokens: 450,
        }
    }
}

/// Persona backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatPersona {
    http: reqwest::Client,
    config: PersonaConfig,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl ChatPersona {
    pub fn new(config: PersonaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl PersonaClient for ChatPersona {
    async fn reply(&self, transcript: &[ChatTurn]) -> Result<String> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages: transcript,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::persona(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::persona(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| EngineError::persona(format!("malformed response: {}", e)))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_else(|| "...".to_string());

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_turn_serializes_openai_shape() {
        let turn = ChatTurn::assistant("hello");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hello");
    }
}
