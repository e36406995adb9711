//! Shared initialization logic for the HTTP server and CLI modes.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{GenerationBackend, OpenAiBackend};
use crate::config::{load_config, resolve_data_path, AppConfig};
use crate::server::AppState;
use crate::services::{BackendSuggestionService, Dispatcher, SuggestionService};
use crate::session::EditorSession;

/// Application context holding configuration and services.
///
/// Shared between the HTTP server and CLI commands.
pub struct AppContext {
    pub data_path: PathBuf,
    pub config: AppConfig,
    pub backend: Arc<dyn GenerationBackend>,
    pub suggestion_service: Arc<dyn SuggestionService>,
    pub dispatcher: Dispatcher,
}

impl AppContext {
    /// Initialize application context against the OpenAI-compatible backend.
    ///
    /// Data path priority: explicit path > SCENECRAFT_DATA_PATH env > ~/.scenecraft
    pub fn new(explicit_path: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let data_path = resolve_data_path(explicit_path);
        tracing::info!("Using data path: {}", data_path.display());

        let config = load_config(config_path, &data_path)?;
        if config.backend.api_key.is_none() {
            tracing::warn!("No API key configured; set OPENAI_API_KEY or backend.api_key");
        }

        let backend: Arc<dyn GenerationBackend> =
            Arc::new(OpenAiBackend::new(config.backend.clone())?);
        tracing::info!(
            "Generation backend: {} at {}",
            config.backend.model,
            config.backend.base_url
        );

        Ok(Self::with_backend(data_path, config, backend))
    }

    /// Wire services around an already constructed backend.
    pub fn with_backend(
        data_path: PathBuf,
        config: AppConfig,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        let suggestion_service: Arc<dyn SuggestionService> = Arc::new(
            BackendSuggestionService::new(backend.clone(), &config.backend),
        );
        let dispatcher = Dispatcher::new(
            backend.clone(),
            suggestion_service.clone(),
            config.backend.chat_temperature,
        );

        Self {
            data_path,
            config,
            backend,
            suggestion_service,
            dispatcher,
        }
    }

    /// A fresh seeded editing session.
    pub fn session(&self) -> EditorSession {
        EditorSession::new(self.dispatcher.clone(), &self.config.session)
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            dispatcher: self.dispatcher.clone(),
            suggestions: self.suggestion_service.clone(),
            backend_name: self.backend.name().to_string(),
        }
    }
}
