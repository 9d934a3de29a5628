// src/services/responder.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Produces a reply to `message` steered by a system-level `context`.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, context: &str, message: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<ChatMessage>,
}

/// Client for a local Ollama server's `/api/chat` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl ResponseGenerator for OllamaClient {
    async fn generate(&self, context: &str, message: &str) -> Result<String, GenerationError> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: context.to_string(),
                },
                ChatMessage {
                    role: Role::User,
                    content: message.to_string(),
                },
            ],
            stream: false,
        };

        let res = self.http.post(self.chat_url()).json(&body).send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response body>".to_string());
            return Err(GenerationError::Status { status, body });
        }

        let reply: OllamaChatResponse = res
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        reply
            .message
            .map(|m| m.content)
            .ok_or_else(|| GenerationError::Decode("missing field `message`".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_as_two_turn_exchange() {
        let req = OllamaChatRequest {
            model: "llama3.2",
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: "ctx".into(),
                },
                ChatMessage {
                    role: Role::User,
                    content: "hi".into(),
                },
            ],
            stream: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "llama3.2",
                "messages": [
                    {"role": "system", "content": "ctx"},
                    {"role": "user", "content": "hi"}
                ],
                "stream": false
            })
        );
    }

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3.2");
        assert_eq!(client.chat_url(), "http://localhost:11434/api/chat");
    }
}
