//! Conversational front-ends. Each app owns a compiled prompt graph and turns
//! one input text into one answer.

pub mod advanced;
pub mod helper;
pub mod translator;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::graph::PromptTemplate;
use crate::session::Message;

pub use advanced::AdvancedHelperBot;
pub use helper::HelperBot;
pub use translator::Translator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppKind {
    HelperBot,
    AdvancedHelperBot,
    Translator,
}

impl AppKind {
    pub const ALL: [AppKind; 3] = [
        AppKind::HelperBot,
        AppKind::AdvancedHelperBot,
        AppKind::Translator,
    ];

    /// URL segment used by the HTTP routes.
    pub fn slug(&self) -> &'static str {
        match self {
            AppKind::HelperBot => "helper",
            AppKind::AdvancedHelperBot => "advanced",
            AppKind::Translator => "translator",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AppKind::HelperBot | AppKind::AdvancedHelperBot => "HelperBot 🗺",
            AppKind::Translator => "Translator 🗺",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            AppKind::HelperBot => "카카오싱크에 대해 물어보세요!",
            AppKind::AdvancedHelperBot => {
                "카카오 기능에 대해 물어보세요! (카카오소셜, 카카오싱크, 카카오톡채널)"
            }
            AppKind::Translator => "Translate things and post them as messages!",
        }
    }

    pub fn input_placeholder(&self) -> &'static str {
        match self {
            AppKind::Translator => "Text to translate",
            _ => "Text to question",
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for AppKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| ApiError::NotFound(format!("Unknown app: {}", s)))
    }
}

#[async_trait]
pub trait ChatApp: Send + Sync {
    fn kind(&self) -> AppKind;

    /// Language tag attached to posted messages.
    fn target_lang(&self) -> Option<&str> {
        None
    }

    /// `messages` is the session's list, newest first.
    async fn answer(&self, text: &str, messages: &[Message]) -> Result<String, ApiError>;
}

#[derive(Clone, Default)]
pub struct AppRegistry {
    apps: HashMap<AppKind, Arc<dyn ChatApp>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, app: Arc<dyn ChatApp>) {
        self.apps.insert(app.kind(), app);
    }

    pub fn get(&self, kind: AppKind) -> Result<Arc<dyn ChatApp>, ApiError> {
        self.apps
            .get(&kind)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("App not enabled: {}", kind)))
    }

    pub fn kinds(&self) -> Vec<AppKind> {
        AppKind::ALL
            .into_iter()
            .filter(|kind| self.apps.contains_key(kind))
            .collect()
    }
}

pub(crate) fn read_asset(paths: &AppPaths, raw: &str) -> anyhow::Result<String> {
    let path = paths.resolve(raw);
    read_file(&path)
}

pub(crate) fn load_template(paths: &AppPaths, raw: &str) -> anyhow::Result<PromptTemplate> {
    read_asset(paths, raw).map(|source| PromptTemplate::parse(&source))
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
