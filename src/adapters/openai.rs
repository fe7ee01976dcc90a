//! OpenAI-compatible chat-completions provider (the remote tier).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RemoteProviderSettings;
use crate::domain::TaskSource;
use crate::extract::{parse_extraction, RawTask};

use super::http::post_json;
use super::prompts::{chat_messages, extraction_messages, WireMessage};
use super::{AiProvider, CallBudget, ProviderError, ProviderRequest};

const EXTRACTION_TEMPERATURE: f32 = 0.3;
const CHAT_MAX_TOKENS: u32 = 300;

/// Remote model reached over the chat-completions API
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    chat_temperature: f32,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            chat_temperature: 0.85,
        }
    }

    pub fn from_settings(settings: &RemoteProviderSettings) -> Self {
        let mut provider = Self::new(
            settings.base_url.clone(),
            settings.model.clone(),
            settings.api_key.clone(),
        );
        provider.chat_temperature = settings.temperature;
        provider
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn complete(
        &self,
        messages: Vec<WireMessage>,
        temperature: f32,
        max_tokens: Option<u32>,
        budget: CallBudget,
    ) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Unconfigured("missing API key".to_string()))?;

        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
        };

        let response: CompletionResponse =
            post_json(&self.client, &self.endpoint(), Some(api_key), &body, budget).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::Malformed("completion had no content".to_string()))
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn tier(&self) -> TaskSource {
        TaskSource::Remote
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn extract(
        &self,
        request: &ProviderRequest,
        budget: CallBudget,
    ) -> Result<Vec<RawTask>, ProviderError> {
        let content = self
            .complete(extraction_messages(request), EXTRACTION_TEMPERATURE, None, budget)
            .await?;
        parse_extraction(&content).map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    async fn chat(&self, request: &ProviderRequest, budget: CallBudget) -> Result<String, ProviderError> {
        let reply = self
            .complete(
                chat_messages(request),
                self.chat_temperature,
                Some(CHAT_MAX_TOKENS),
                budget,
            )
            .await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_slash() {
        let provider = OpenAiProvider::new("https://api.openai.com/v1/", "gpt-4o-mini", None);
        assert_eq!(provider.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_blank_key_is_unavailable() {
        let provider = OpenAiProvider::new("http://localhost", "m", Some("  ".to_string()));
        assert!(!provider.is_available());
        let provider = OpenAiProvider::new("http://localhost", "m", Some("sk-test".to_string()));
        assert!(provider.is_available());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_io() {
        let provider = OpenAiProvider::new("http://127.0.0.1:9", "m", None);
        let budget = CallBudget {
            first_response: std::time::Duration::from_millis(50),
            overall: std::time::Duration::from_millis(100),
        };
        let result = provider.extract(&ProviderRequest::new("buy milk"), budget).await;
        assert!(matches!(result, Err(ProviderError::Unconfigured(_))));
    }
}
