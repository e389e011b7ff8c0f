//! Test double for `LlmProvider`: replays queued chat replies, records every
//! request, and produces deterministic bag-of-bytes embeddings.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::ApiError;

pub const EMBEDDING_DIM: usize = 16;

#[derive(Debug, Clone)]
pub struct RecordedChat {
    pub request: ChatRequest,
    pub model_id: String,
}

impl RecordedChat {
    pub fn last_content(&self) -> &str {
        self.request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    chat_calls: Mutex<Vec<RecordedChat>>,
    embed_calls: AtomicUsize,
    embed_failure_marker: Option<String>,
}

impl ScriptedProvider {
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::default();
        for reply in replies {
            provider.push_reply(reply);
        }
        provider
    }

    /// Embedding requests containing `marker` in any input fail.
    pub fn failing_embeddings_for(marker: &str) -> Self {
        Self {
            embed_failure_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Err(message.into()));
    }

    pub fn chat_calls(&self) -> Vec<RecordedChat> {
        self.chat_calls.lock().unwrap().clone()
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_calls.lock().unwrap().len()
    }

    pub fn embed_call_count(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

pub fn fake_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; EMBEDDING_DIM];
    for byte in text.bytes() {
        vector[byte as usize % EMBEDDING_DIM] += 1.0;
    }
    vector
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        self.chat_calls.lock().unwrap().push(RecordedChat {
            request,
            model_id: model_id.to_string(),
        });

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ApiError::Upstream(message)),
            None => Err(ApiError::Upstream("no scripted reply left".to_string())),
        }
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(marker) = &self.embed_failure_marker {
            if inputs.iter().any(|input| input.contains(marker.as_str())) {
                return Err(ApiError::Upstream("embedding rejected".to_string()));
            }
        }

        Ok(inputs.iter().map(|input| fake_embedding(input)).collect())
    }
}
