//! Local model provider speaking the Ollama `/api/chat` protocol (the
//! on-device tier).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LocalProviderSettings;
use crate::domain::TaskSource;
use crate::extract::{parse_extraction, RawTask};

use super::http::post_json;
use super::prompts::{chat_messages, extraction_messages, WireMessage};
use super::{AiProvider, CallBudget, ProviderError, ProviderRequest};

/// Model served by a local Ollama daemon
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            enabled: true,
        }
    }

    pub fn from_settings(settings: &LocalProviderSettings) -> Self {
        let mut provider = Self::new(settings.base_url.clone(), settings.model.clone());
        provider.enabled = settings.enabled;
        provider
    }

    async fn send(
        &self,
        messages: Vec<WireMessage>,
        format: Option<&str>,
        budget: CallBudget,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format,
        };

        let response: ChatResponse = post_json(&self.client, &url, None, &body, budget).await?;
        response
            .message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::Malformed("empty message from local model".to_string()))
    }
}

#[async_trait]
impl AiProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn tier(&self) -> TaskSource {
        TaskSource::Local
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    async fn extract(
        &self,
        request: &ProviderRequest,
        budget: CallBudget,
    ) -> Result<Vec<RawTask>, ProviderError> {
        let content = self
            .send(extraction_messages(request), Some("json"), budget)
            .await?;
        parse_extraction(&content).map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    async fn chat(&self, request: &ProviderRequest, budget: CallBudget) -> Result<String, ProviderError> {
        let reply = self.send(chat_messages(request), None, budget).await?;
        Ok(reply.trim().to_string())
    }
}
