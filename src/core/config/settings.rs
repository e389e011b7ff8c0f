//! Typed view over the merged `config.yml` + `secrets.yaml` document.
//!
//! Every field has a default so an empty or partial config file still yields
//! a runnable configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub knowledge: KnowledgeConfig,
    pub history: HistoryConfig,
    pub helper_bot: HelperBotConfig,
    pub advanced_helper_bot: AdvancedHelperBotConfig,
    pub translator: TranslatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// File whose first line holds the API key.
    pub api_key_file: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            api_key_file: None,
            chat_model: "gpt-3.5-turbo".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Per-chain model overrides. Unset fields fall back to the provider defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    pub fn new(model: &str, temperature: f64, max_tokens: Option<u32>) -> Self {
        Self {
            model: Some(model.to_string()),
            temperature: Some(temperature),
            max_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub data_dir: String,
    pub persist_dir: String,
    pub collection: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub extensions: Vec<String>,
    pub top_k: usize,
    pub score_threshold: Option<f32>,
    pub embed_batch_size: usize,
    pub ingest_on_startup: bool,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            data_dir: "assets/data".to_string(),
            persist_dir: "upload".to_string(),
            collection: "bot_collection".to_string(),
            chunk_size: 1000,
            chunk_overlap: 100,
            extensions: ["py", "md", "ipynb", "txt"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            top_k: 4,
            score_threshold: None,
            embed_batch_size: 20,
            ingest_on_startup: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub dir: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: "chat_histories".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperBotConfig {
    pub model: ModelSettings,
    pub info_path: String,
    pub question_template: String,
    pub trim_template: String,
    pub kind_template: String,
}

impl Default for HelperBotConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings::new("gpt-3.5-turbo-16k", 0.1, Some(300)),
            info_path: "assets/kakao_sync.txt".to_string(),
            question_template: "assets/question_template.txt".to_string(),
            trim_template: "assets/trim_template.txt".to_string(),
            kind_template: "assets/kind_template.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedHelperBotConfig {
    pub model: ModelSettings,
    pub intent_list_path: String,
    pub parse_intent_template: String,
    pub response_template: String,
    pub history_response_template: String,
    pub search_marker: String,
    pub default_intent: String,
    pub default_conversation_id: String,
}

impl Default for AdvancedHelperBotConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings::new("gpt-3.5-turbo", 0.1, None),
            intent_list_path: "assets/prompt/intent.txt".to_string(),
            parse_intent_template: "assets/prompt/parse_intent.txt".to_string(),
            response_template: "assets/prompt/response_template.txt".to_string(),
            history_response_template: "assets/prompt/history_response_template.txt"
                .to_string(),
            search_marker: "Search".to_string(),
            default_intent: "default".to_string(),
            default_conversation_id: "fa1010".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub model: ModelSettings,
    pub source_lang: String,
    pub target_lang: String,
    /// Sentence-aligned examples keyed by language name.
    pub parallel_examples: BTreeMap<String, Vec<String>>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        let mut parallel_examples = BTreeMap::new();
        parallel_examples.insert(
            "Korean".to_string(),
            vec![
                "오늘 날씨 어때".to_string(),
                "딥러닝 기반의 AI기술이 인기를끌고 있다.".to_string(),
            ],
        );
        parallel_examples.insert(
            "English".to_string(),
            vec![
                "How is the weather today".to_string(),
                "Deep learning-based AI technology is gaining popularity.".to_string(),
            ],
        );
        parallel_examples.insert(
            "Japanese".to_string(),
            vec![
                "今日の天気はどうですか".to_string(),
                "ディープラーニングベースのAIテクノロジーが人気を集めています。".to_string(),
            ],
        );

        Self {
            model: ModelSettings::new("gpt-3.5-turbo", 0.3, None),
            source_lang: "Korean".to_string(),
            target_lang: "English".to_string(),
            parallel_examples,
        }
    }
}
