//! Per-browser UI state: the current input text, the derived output and the
//! list of posted messages, newest first.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::apps::{AppKind, ChatApp};
use crate::core::errors::ApiError;

pub const PLACEHOLDER_OUTPUT: &str = "Answer will appear here.";
const TIMESTAMP_FORMAT: &str = "%B %d, %Y %I:%M %p";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub question_text: String,
    pub answer_text: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_lang: Option<String>,
}

impl Message {
    pub fn new(
        question_text: impl Into<String>,
        answer_text: impl Into<String>,
        to_lang: Option<String>,
    ) -> Self {
        Self {
            question_text: question_text.into(),
            answer_text: answer_text.into(),
            created_at: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            to_lang,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedOutput {
    version: u64,
    answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub id: String,
    pub app: AppKind,
    pub text: String,
    pub messages: Vec<Message>,
    pub version: u64,
    #[serde(skip)]
    cached: Option<CachedOutput>,
}

impl SessionState {
    pub fn new(app: AppKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            app,
            text: String::new(),
            messages: Vec::new(),
            version: 0,
            cached: None,
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.version += 1;
    }

    /// Derived output for the current text. Blank input never reaches the app;
    /// an answer is computed at most once per version.
    pub async fn output(&mut self, app: &dyn ChatApp) -> Result<String, ApiError> {
        if self.text.trim().is_empty() {
            return Ok(PLACEHOLDER_OUTPUT.to_string());
        }
        if let Some(cached) = &self.cached {
            if cached.version == self.version {
                return Ok(cached.answer.clone());
            }
        }

        let answer = app.answer(&self.text, &self.messages).await?;
        self.cached = Some(CachedOutput {
            version: self.version,
            answer: answer.clone(),
        });
        Ok(answer)
    }

    /// Prepends a message for the current text; earlier messages keep their order.
    pub async fn post(&mut self, app: &dyn ChatApp) -> Result<&Message, ApiError> {
        let answer = self.output(app).await?;
        let message = Message::new(
            self.text.clone(),
            answer,
            app.target_lang().map(str::to_string),
        );
        self.messages.insert(0, message);
        self.version += 1;
        Ok(&self.messages[0])
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.cached = None;
        self.version += 1;
    }
}

/// Sessions keyed by id. Each session sits behind its own lock so a slow
/// chain only blocks requests for the same session.
#[derive(Clone, Default)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, Arc<Mutex<SessionState>>>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, app: AppKind) -> SessionState {
        let session = SessionState::new(app);
        let snapshot = session.clone();
        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), Arc::new(Mutex::new(session)));
        tracing::debug!("Created {} session {}", app, snapshot.id);
        snapshot
    }

    /// Looks up a session, checking it belongs to `app`.
    pub async fn get(&self, app: AppKind, id: &str) -> Result<Arc<Mutex<SessionState>>, ApiError> {
        let session = self
            .sessions
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", id)))?;

        if session.lock().await.app != app {
            return Err(ApiError::NotFound(format!(
                "Session {} does not belong to {}",
                id, app
            )));
        }
        Ok(session)
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    pub async fn count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
