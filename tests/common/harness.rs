//! Test harness wiring the application context to a scripted backend.
//!
//! Every harness owns a temporary data directory so config loading never
//! touches the real home directory.

use std::sync::Arc;
use tempfile::TempDir;

use scenecraft::backend::ScriptedBackend;
use scenecraft::config::AppConfig;
use scenecraft::init::AppContext;
use scenecraft::models::Scene;
use scenecraft::session::{EditorSession, SessionState};

pub struct TestHarness {
    pub backend: Arc<ScriptedBackend>,
    pub ctx: AppContext,
    /// Temporary directory (kept alive while harness exists)
    pub temp_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_backend(ScriptedBackend::new(), config)
    }

    pub fn with_backend(backend: ScriptedBackend, config: AppConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let backend = Arc::new(backend);
        let ctx = AppContext::with_backend(temp_dir.path().to_path_buf(), config, backend.clone());
        Self {
            backend,
            ctx,
            temp_dir,
        }
    }

    /// A session holding exactly `scenes`, plus the greeting.
    pub fn session_with(&self, scenes: Vec<Scene>) -> EditorSession {
        let state = SessionState::with_scenes(scenes).expect("Scene ids must be unique");
        EditorSession::with_state(
            self.ctx.dispatcher.clone(),
            &self.ctx.config.session,
            state,
        )
    }
}

/// The single-scene fixture used throughout the scenarios.
pub fn intro_scene() -> Scene {
    Scene::with_id("s1", "Hi", "Intro")
}
