use std::sync::Arc;
use std::time::Duration;

use super::openai::OpenAiProvider;
use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest};
use crate::core::config::{LlmConfig, ModelSettings};
use crate::core::errors::ApiError;

/// Binds a provider to the configured default chat and embedding models.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    chat_model: String,
    embedding_model: String,
}

impl LlmService {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
        }
    }

    pub fn from_config(config: &LlmConfig, api_key: Option<String>) -> Result<Self, ApiError> {
        if api_key.is_none() {
            tracing::warn!("No API key configured; upstream calls will likely be rejected");
        }
        let provider = OpenAiProvider::new(
            &config.base_url,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self::new(
            Arc::new(provider),
            config.chat_model.clone(),
            config.embedding_model.clone(),
        ))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn health_check(&self) -> Result<bool, ApiError> {
        self.provider.health_check().await
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.chat_model.clone());
        tracing::debug!(
            "chat completion: provider={}, model={}, messages={}",
            self.provider.name(),
            model,
            request.messages.len()
        );
        self.provider.chat(request, &model).await
    }

    /// Sends `prompt` as a single user message.
    pub async fn complete(&self, prompt: &str, settings: &ModelSettings) -> Result<String, ApiError> {
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]).with_settings(settings);
        self.chat(request).await
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        tracing::debug!(
            "embedding {} input(s) with {}",
            inputs.len(),
            self.embedding_model
        );
        self.provider.embed(inputs, &self.embedding_model).await
    }

    pub async fn embed_one(&self, input: &str) -> Result<Vec<f32>, ApiError> {
        self.embed(&[input.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("embedding response was empty".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;

    #[tokio::test]
    async fn complete_uses_settings_model_or_default() {
        let provider = Arc::new(ScriptedProvider::with_replies(["one", "two"]));
        let service = LlmService::new(provider.clone(), "default-model", "embed-model");

        let first = service
            .complete("hello", &ModelSettings::new("gpt-3.5-turbo-16k", 0.1, Some(300)))
            .await
            .unwrap();
        let second = service.complete("again", &ModelSettings::default()).await.unwrap();

        assert_eq!(first, "one");
        assert_eq!(second, "two");

        let calls = provider.chat_calls();
        assert_eq!(calls[0].model_id, "gpt-3.5-turbo-16k");
        assert_eq!(calls[0].request.max_tokens, Some(300));
        assert_eq!(calls[0].request.messages, vec![ChatMessage::user("hello")]);
        assert_eq!(calls[1].model_id, "default-model");
    }

    #[tokio::test]
    async fn embed_one_returns_single_vector() {
        let provider = Arc::new(ScriptedProvider::default());
        let service = LlmService::new(provider.clone(), "chat", "embed");

        let vector = service.embed_one("abc").await.unwrap();

        assert!(!vector.is_empty());
        assert_eq!(provider.embed_call_count(), 1);
    }
}
