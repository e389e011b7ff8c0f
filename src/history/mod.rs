//! Flat-file chat history: one append-only file per conversation id.
//!
//! Each line is `user: <text>` or `bot: <text>`; backslashes and line breaks
//! inside a message are escaped so every entry stays on one line.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::core::errors::ApiError;

const USER_PREFIX: &str = "user: ";
const BOT_PREFIX: &str = "bot: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

impl Speaker {
    fn prefix(self) -> &'static str {
        match self {
            Speaker::User => USER_PREFIX,
            Speaker::Bot => BOT_PREFIX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub content: String,
}

#[derive(Clone)]
pub struct ChatHistoryStore {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ChatHistoryStore {
    pub async fn new(dir: PathBuf) -> Result<Self, ApiError> {
        fs::create_dir_all(&dir).await.map_err(|e| {
            ApiError::internal(format!(
                "Failed to create history dir {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self {
            dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn history_path(&self, conversation_id: &str) -> Result<PathBuf, ApiError> {
        validate_conversation_id(conversation_id)?;
        Ok(self.dir.join(format!("{}.txt", conversation_id)))
    }

    pub async fn log_user_message(&self, conversation_id: &str, message: &str) -> Result<(), ApiError> {
        self.append(conversation_id, &[(Speaker::User, message)]).await
    }

    pub async fn log_bot_message(&self, conversation_id: &str, message: &str) -> Result<(), ApiError> {
        self.append(conversation_id, &[(Speaker::Bot, message)]).await
    }

    /// Appends a user/bot pair in one write so concurrent turns never interleave.
    pub async fn log_turn(
        &self,
        conversation_id: &str,
        user_message: &str,
        bot_message: &str,
    ) -> Result<(), ApiError> {
        self.append(
            conversation_id,
            &[(Speaker::User, user_message), (Speaker::Bot, bot_message)],
        )
        .await
    }

    async fn append(&self, conversation_id: &str, entries: &[(Speaker, &str)]) -> Result<(), ApiError> {
        let path = self.history_path(conversation_id)?;

        let mut payload = String::new();
        for (speaker, content) in entries {
            payload.push_str(speaker.prefix());
            payload.push_str(&escape(content));
            payload.push('\n');
        }

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(ApiError::internal)?;
        file.write_all(payload.as_bytes())
            .await
            .map_err(ApiError::internal)?;
        file.flush().await.map_err(ApiError::internal)?;
        Ok(())
    }

    /// Whole history of a conversation, oldest first. Unknown ids are empty.
    pub async fn load(&self, conversation_id: &str) -> Result<Vec<HistoryEntry>, ApiError> {
        let path = self.history_path(conversation_id)?;
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(ApiError::internal(err)),
        };

        let mut entries = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let entry = if let Some(rest) = line.strip_prefix(USER_PREFIX) {
                HistoryEntry {
                    speaker: Speaker::User,
                    content: unescape(rest),
                }
            } else if let Some(rest) = line.strip_prefix(BOT_PREFIX) {
                HistoryEntry {
                    speaker: Speaker::Bot,
                    content: unescape(rest),
                }
            } else {
                tracing::warn!(
                    "Skipping malformed line {} in {}",
                    line_no + 1,
                    path.display()
                );
                continue;
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    /// History rendered for a prompt: one `user: ...` / `bot: ...` line per entry.
    pub async fn get_chat_history(&self, conversation_id: &str) -> Result<String, ApiError> {
        let entries = self.load(conversation_id).await?;
        Ok(render_history(&entries))
    }

    pub async fn clear(&self, conversation_id: &str) -> Result<bool, ApiError> {
        let path = self.history_path(conversation_id)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(ApiError::internal(err)),
        }
    }
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}{}", entry.speaker.prefix(), entry.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn validate_conversation_id(conversation_id: &str) -> Result<(), ApiError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("conversation id pattern is valid")
    });
    if pattern.is_match(conversation_id) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Invalid conversation id: {:?}",
            conversation_id
        )))
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, ChatHistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ChatHistoryStore::new(dir.path().join("chat_histories"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn turns_are_appended_and_read_back_in_order() {
        let (_dir, store) = store().await;

        store.log_turn("fa1010", "What is Kakao Sync?", "A sign-up service.").await.unwrap();
        store.log_user_message("fa1010", "Thanks").await.unwrap();
        store.log_bot_message("fa1010", "You're welcome").await.unwrap();

        let entries = store.load("fa1010").await.unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].speaker, Speaker::User);
        assert_eq!(entries[1].content, "A sign-up service.");
        assert_eq!(entries[3].speaker, Speaker::Bot);

        let rendered = store.get_chat_history("fa1010").await.unwrap();
        assert_eq!(
            rendered,
            "user: What is Kakao Sync?\nbot: A sign-up service.\nuser: Thanks\nbot: You're welcome"
        );
    }

    #[tokio::test]
    async fn multi_line_messages_round_trip() {
        let (_dir, store) = store().await;
        let answer = "line one\nline two with \\n literal\r\nend";

        store.log_turn("c1", "q", answer).await.unwrap();

        let raw = tokio::fs::read_to_string(store.history_path("c1").unwrap())
            .await
            .unwrap();
        assert_eq!(raw.lines().count(), 2);

        let entries = store.load("c1").await.unwrap();
        assert_eq!(entries[1].content, answer);
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty_and_clear_reports_presence() {
        let (_dir, store) = store().await;

        assert!(store.load("nobody").await.unwrap().is_empty());
        assert_eq!(store.get_chat_history("nobody").await.unwrap(), "");
        assert!(!store.clear("nobody").await.unwrap());

        store.log_user_message("somebody", "hi").await.unwrap();
        assert!(store.clear("somebody").await.unwrap());
        assert!(store.load("somebody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn path_like_ids_are_rejected() {
        let (_dir, store) = store().await;

        for id in ["../escape", "a/b", "", "with space", "dot.txt"] {
            assert!(matches!(
                store.log_user_message(id, "x").await,
                Err(ApiError::BadRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let (_dir, store) = store().await;
        let path = store.history_path("c2").unwrap();
        tokio::fs::write(&path, "user: hello\ngarbage\nbot: hi\n").await.unwrap();

        let entries = store.load("c2").await.unwrap();
        assert_eq!(entries.len(), 2);
    }
}
