use std::sync::Arc;

use crate::apps::{AdvancedHelperBot, AppKind, AppRegistry, HelperBot, Translator};
use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::history::ChatHistoryStore;
use crate::llm::LlmService;
use crate::rag::{KnowledgeBase, SqliteVectorStore};
use crate::session::SessionManager;

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Everything except the session map is built once at startup:
/// - Configuration and paths
/// - LLM service bound to the configured provider
/// - Knowledge base (SQLite vector store) and chat-history files
/// - One compiled prompt graph per app
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<AppConfig>,
    pub llm: LlmService,
    pub knowledge: KnowledgeBase,
    pub history: ChatHistoryStore,
    pub sessions: SessionManager,
    pub apps: AppRegistry,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Loads the merged, validated configuration
    /// 2. Builds the LLM service from the resolved API key
    /// 3. Opens the vector store and history directory
    /// 4. Loads the app prompts and compiles their graphs
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let api_key = config.resolve_api_key(&settings);
        let llm = LlmService::from_config(&settings.llm, api_key)
            .map_err(|e| InitializationError::Llm(e.into()))?;

        Self::from_parts(paths, config, settings, llm).await
    }

    /// Builds the state around an already constructed LLM service.
    pub async fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: AppConfig,
        llm: LlmService,
    ) -> Result<Arc<Self>, InitializationError> {
        let persist_dir = paths.resolve(&settings.knowledge.persist_dir);
        let store = SqliteVectorStore::open(&persist_dir)
            .await
            .map_err(|e| InitializationError::Knowledge(e.into()))?;
        let knowledge = KnowledgeBase::new(Arc::new(store), llm.clone(), &settings.knowledge);

        let history = ChatHistoryStore::new(paths.resolve(&settings.history.dir))
            .await
            .map_err(|e| InitializationError::History(e.into()))?;

        let apps = build_apps(&paths, &settings, &llm, &knowledge, &history)?;
        tracing::info!(
            "Apps ready: {}",
            apps.kinds()
                .iter()
                .map(AppKind::slug)
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            llm,
            knowledge,
            history,
            sessions: SessionManager::new(),
            apps,
        }))
    }
}

fn build_apps(
    paths: &AppPaths,
    settings: &AppConfig,
    llm: &LlmService,
    knowledge: &KnowledgeBase,
    history: &ChatHistoryStore,
) -> Result<AppRegistry, InitializationError> {
    let failed = |app: AppKind| move |source: anyhow::Error| InitializationError::App { app, source };

    let mut apps = AppRegistry::new();
    apps.register(Arc::new(
        HelperBot::new(llm.clone(), &settings.helper_bot, paths)
            .map_err(failed(AppKind::HelperBot))?,
    ));
    apps.register(Arc::new(
        AdvancedHelperBot::new(
            llm.clone(),
            Arc::new(knowledge.clone()),
            history.clone(),
            &settings.advanced_helper_bot,
            paths,
        )
        .map_err(failed(AppKind::AdvancedHelperBot))?,
    ));
    apps.register(Arc::new(
        Translator::new(llm.clone(), &settings.translator).map_err(failed(AppKind::Translator))?,
    ));
    Ok(apps)
}
