use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::pending::PendingEdit;
use super::store::{SceneStore, UndoRecord};
use crate::config::SessionConfig;
use crate::error::ErrorClass;
use crate::models::{
    ChatMessage, ConversationEntry, Scene, SceneField, Suggestion, GREETING, SEED_SCENES,
};
use crate::services::{mention_candidates, Dispatcher, TurnEvent};
use crate::ScriptError;

/// Content given to a scene added without explicit content.
pub const NEW_SCENE_CONTENT: &str = "New scene content";
/// Tag given to a scene added without an explicit tag.
pub const NEW_SCENE_TAG: &str = "Custom";

/// Everything an editing session mutates.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub store: SceneStore,
    pub pending: PendingEdit,
    pub conversation: Vec<ConversationEntry>,
}

impl SessionState {
    /// Greeting plus the default scenes.
    pub fn seeded() -> Self {
        Self::with_store(SceneStore::from_drafts(SEED_SCENES))
    }

    pub fn with_scenes(scenes: Vec<Scene>) -> Result<Self, ScriptError> {
        Ok(Self::with_store(SceneStore::with_scenes(scenes)?))
    }

    fn with_store(store: SceneStore) -> Self {
        Self {
            store,
            pending: PendingEdit::Empty,
            conversation: vec![ChatMessage::assistant(GREETING).into()],
        }
    }

    fn messages(&self) -> Vec<ChatMessage> {
        self.conversation.iter().map(|e| e.message.clone()).collect()
    }

    fn say(&mut self, text: impl Into<String>) {
        self.conversation.push(ChatMessage::assistant(text).into());
    }
}

/// Result of one chat turn as seen by the session's caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Narration streamed during the turn.
    pub reply: String,
    /// The suggestion now held pending, if the turn produced one.
    pub suggestion: Option<Suggestion>,
    /// Set when the turn failed; a substitute message was appended.
    pub failure: Option<ErrorClass>,
}

/// One user's editing session: scenes, undo log, pending slot, conversation.
///
/// Turns are serialized; store operations may run while a turn streams and
/// are visible to the next turn.
pub struct EditorSession {
    state: Arc<RwLock<SessionState>>,
    dispatcher: Dispatcher,
    turn_lock: Mutex<()>,
    turn_timeout: Duration,
}

impl EditorSession {
    pub fn new(dispatcher: Dispatcher, config: &SessionConfig) -> Self {
        Self::with_state(dispatcher, config, SessionState::seeded())
    }

    pub fn with_state(dispatcher: Dispatcher, config: &SessionConfig, state: SessionState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            dispatcher,
            turn_lock: Mutex::new(()),
            turn_timeout: config.turn_timeout(),
        }
    }

    /// Run one chat turn for `text`.
    ///
    /// Narration is passed to `on_text` as it arrives. Backend and directive
    /// failures do not surface as `Err`; they end the turn with a substitute
    /// assistant message instead. A timed-out turn is abandoned and leaves
    /// the pending slot untouched.
    pub async fn run_turn<F>(&self, text: &str, mut on_text: F) -> Result<TurnOutcome, ScriptError>
    where
        F: FnMut(&str) + Send,
    {
        if text.trim().is_empty() {
            return Err(ScriptError::Validation("Message cannot be empty".to_string()));
        }

        let _turn = self.turn_lock.lock().await;
        let (messages, candidates) = {
            let mut state = self.state.write().await;
            state.conversation.push(ChatMessage::user(text).into());
            (state.messages(), state.store.scenes().to_vec())
        };

        let mut reply = String::new();
        let mut suggestion = None;
        let consumed = tokio::time::timeout(self.turn_timeout, async {
            let mut events = self.dispatcher.dispatch(&messages, candidates).await?;
            while let Some(event) = events.next().await {
                match event? {
                    TurnEvent::Text(fragment) => {
                        on_text(&fragment);
                        reply.push_str(&fragment);
                    }
                    TurnEvent::Suggestion(s) => suggestion = Some(s),
                }
            }
            Ok::<(), ScriptError>(())
        })
        .await;

        let (failure, abandoned) = match consumed {
            Ok(Ok(())) => (None, false),
            Ok(Err(e)) => (Some(e), false),
            Err(_) => (
                Some(ScriptError::Timeout(format!(
                    "Turn exceeded {}s",
                    self.turn_timeout.as_secs()
                ))),
                true,
            ),
        };

        let mut state = self.state.write().await;
        if !reply.is_empty() {
            state.say(reply.clone());
        }
        if abandoned {
            suggestion = None;
        } else if let Some(s) = &suggestion {
            state.pending.offer(s.clone());
        }

        let failure = failure.map(|e| {
            let class = ErrorClass::classify(&e);
            warn!(?class, "Chat turn failed: {}", e);
            state.say(class.substitute_message());
            class
        });

        Ok(TurnOutcome {
            reply,
            suggestion,
            failure,
        })
    }

    /// Apply the pending suggestion. `Ok(None)` when nothing was pending.
    pub async fn approve(&self) -> Result<Option<Scene>, ScriptError> {
        let mut state = self.state.write().await;
        let SessionState {
            store, pending, ..
        } = &mut *state;
        let applied = pending.approve(store)?;
        if let Some(scene) = &applied {
            info!(scene_id = %scene.id, "Suggestion approved");
            state.say(format!("Applied the suggested changes to \"{}\".", scene.tag));
        }
        Ok(applied)
    }

    pub async fn dismiss(&self) -> Option<Suggestion> {
        self.state.write().await.pending.dismiss()
    }

    pub async fn undo(&self) -> Option<UndoRecord> {
        self.state.write().await.store.undo()
    }

    /// Append a new scene, filling defaults for missing content or tag.
    pub async fn add_scene(&self, content: Option<&str>, tag: Option<&str>) -> Result<Scene, ScriptError> {
        let scene = Scene::new(
            content.unwrap_or(NEW_SCENE_CONTENT),
            tag.unwrap_or(NEW_SCENE_TAG),
        );
        self.state.write().await.store.add(scene.clone())?;
        Ok(scene)
    }

    pub async fn delete_scene(&self, id: &str) -> Result<Scene, ScriptError> {
        self.state.write().await.store.delete(id)
    }

    pub async fn update_scene(&self, id: &str, field: SceneField, value: &str) -> Result<(), ScriptError> {
        self.state.write().await.store.update(id, field, value)
    }

    pub async fn scenes(&self) -> Vec<Scene> {
        self.state.read().await.store.scenes().to_vec()
    }

    pub async fn conversation(&self) -> Vec<ConversationEntry> {
        self.state.read().await.conversation.clone()
    }

    pub async fn pending(&self) -> Option<Suggestion> {
        self.state.read().await.pending.current().cloned()
    }

    pub async fn undo_depth(&self) -> usize {
        self.state.read().await.store.log().len()
    }

    /// Scenes whose tag or content contains `query`, ignoring case.
    pub async fn mention_candidates(&self, query: &str) -> Vec<Scene> {
        let state = self.state.read().await;
        mention_candidates(state.store.scenes(), query)
            .into_iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{call_fragments, BackendEvent, ScriptedBackend};
    use crate::config::BackendConfig;
    use crate::services::BackendSuggestionService;
    use pretty_assertions::assert_eq;

    fn session(backend: Arc<ScriptedBackend>) -> EditorSession {
        let config = BackendConfig::default();
        let suggestions = Arc::new(BackendSuggestionService::new(backend.clone(), &config));
        let dispatcher = Dispatcher::new(backend, suggestions, config.chat_temperature);
        let state =
            SessionState::with_scenes(vec![Scene::with_id("s1", "Hi", "Intro")]).unwrap();
        EditorSession::with_state(dispatcher, &SessionConfig::default(), state)
    }

    #[tokio::test]
    async fn test_seeded_session() {
        let backend = Arc::new(ScriptedBackend::new());
        let config = BackendConfig::default();
        let suggestions = Arc::new(BackendSuggestionService::new(backend.clone(), &config));
        let dispatcher = Dispatcher::new(backend, suggestions, config.chat_temperature);
        let session = EditorSession::new(dispatcher, &SessionConfig::default());

        let tags: Vec<_> = session.scenes().await.into_iter().map(|s| s.tag).collect();
        assert_eq!(tags, vec!["Intro", "Topic", "Outro"]);
        let conversation = session.conversation().await;
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation[0].message, ChatMessage::assistant(GREETING));
        assert_eq!(session.undo_depth().await, 0);
    }

    #[tokio::test]
    async fn test_turn_installs_pending_suggestion() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut events = vec![BackendEvent::Text("On it.".into())];
        events.extend(call_fragments("editScene", r#"{"sceneId":"s1"}"#, 5));
        backend.push_turn(events).await;
        backend
            .push_completion(r#"{"content":"Hey there!","reasoning":"more energy"}"#)
            .await;
        let session = session(backend);

        let mut streamed = Vec::new();
        let outcome = session
            .run_turn("@[Intro] make it punchier", |t| streamed.push(t.to_string()))
            .await
            .unwrap();

        assert_eq!(streamed, vec!["On it."]);
        assert_eq!(outcome.failure, None);
        let pending = session.pending().await.unwrap();
        assert_eq!(pending.suggestion.content, "Hey there!");

        let applied = session.approve().await.unwrap().unwrap();
        assert_eq!(applied.content, "Hey there!");
        assert_eq!(session.pending().await, None);
        let last = session.conversation().await.pop().unwrap();
        assert_eq!(last.message.content, "Applied the suggested changes to \"Intro\".");
    }

    #[tokio::test]
    async fn test_failed_turn_appends_substitute_message() {
        let backend = Arc::new(ScriptedBackend::new());
        backend
            .push_turn_results(vec![
                Ok(BackendEvent::Text("Partial".into())),
                Err(ScriptError::unavailable("connection reset")),
            ])
            .await;
        let session = session(backend);

        let outcome = session.run_turn("hello", |_| {}).await.unwrap();
        assert_eq!(outcome.failure, Some(ErrorClass::Offline));
        let messages: Vec<_> = session
            .conversation()
            .await
            .into_iter()
            .map(|e| e.message.content)
            .collect();
        assert_eq!(
            messages[1..],
            [
                "hello".to_string(),
                "Partial".to_string(),
                ErrorClass::Offline.substitute_message().to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let session = session(Arc::new(ScriptedBackend::new()));
        assert!(matches!(
            session.run_turn("   ", |_| {}).await,
            Err(ScriptError::Validation(_))
        ));
        assert_eq!(session.conversation().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_scene_defaults_and_undo() {
        let session = session(Arc::new(ScriptedBackend::new()));
        let scene = session.add_scene(None, None).await.unwrap();
        assert_eq!(scene.content, NEW_SCENE_CONTENT);
        assert_eq!(scene.tag, NEW_SCENE_TAG);
        assert_eq!(session.scenes().await.len(), 2);

        assert!(matches!(session.undo().await, Some(UndoRecord::Add { .. })));
        assert_eq!(session.scenes().await.len(), 1);
        assert_eq!(session.undo().await, None);
    }
}
