//! Conversational turn dispatch.
//!
//! A turn is one streamed backend call. Narration tokens are forwarded as
//! they arrive. Once the backend starts calling `editScene`, narration is
//! suppressed and the call's argument fragments are accumulated. When the
//! fragments stop and the buffer looks like a complete object, the directive
//! is parsed, its scene resolved against the turn's candidates, the rewrite
//! requested, and exactly one suggestion emitted. Then streaming resumes.
//!
//! ```text
//! StreamingText --call fragment--> AccumulatingDirective
//! AccumulatingDirective --fragments stop, buffer complete--> DispatchingEdit
//! DispatchingEdit --suggestion emitted--> StreamingText
//! any --stream end--> Done
//! ```

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, trace, warn, Instrument};
use uuid::Uuid;

use super::demux::TurnEvent;
use super::mention::{augment_with_scene_hint, resolve_mention};
use super::suggestion::SuggestionService;
use crate::backend::{
    BackendEvent, BackendEventStream, BackendMessage, ChatCompletionRequest, FunctionSpec,
    GenerationBackend, EDIT_SCENE_FUNCTION,
};
use crate::models::{ChatMessage, ChatRole, EditDirective, Scene, Suggestion};
use crate::ScriptError;

const CHAT_SYSTEM_PROMPT: &str = "You are a friendly AI video script editor assistant. When users mention a scene, \
I will provide you with the correct sceneId to use. Simply use the provided ID in your function call. \
If you are unsure of the sceneId, ask the user to provide the scene again.\n\n\
You can only edit ONE scene at a time.";

/// Capacity of a turn's output channel.
const TURN_CHANNEL_CAPACITY: usize = 64;

/// Output channel of one turn. Ends after the last event; a failure arrives
/// as a final `Err` item.
pub type TurnStream = ReceiverStream<Result<TurnEvent, ScriptError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    StreamingText,
    AccumulatingDirective,
    DispatchingEdit,
    Done,
}

/// Argument buffer of the directive currently being received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveAccumulator {
    name: String,
    arguments: String,
}

impl DirectiveAccumulator {
    pub fn push(&mut self, name: Option<&str>, fragment: &str) {
        if let Some(name) = name {
            self.name = name.to_string();
        }
        self.arguments.push_str(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.arguments.is_empty()
    }

    /// Named, and the trimmed arguments are delimited like one object.
    ///
    /// This is only a shape check; parsing happens afterwards.
    pub fn is_complete(&self) -> bool {
        let args = self.arguments.trim();
        !self.name.is_empty() && args.starts_with('{') && args.ends_with('}')
    }

    /// Parse the buffer into a directive and reset it.
    pub fn take_directive(&mut self) -> Result<EditDirective, ScriptError> {
        let DirectiveAccumulator { name, arguments } = std::mem::take(self);
        parse_directive(&name, &arguments)
    }
}

/// Validate a complete call and decode its arguments.
pub fn parse_directive(name: &str, arguments: &str) -> Result<EditDirective, ScriptError> {
    if name != EDIT_SCENE_FUNCTION {
        return Err(ScriptError::MalformedDirective(format!(
            "Unknown function '{}'",
            name
        )));
    }
    let directive: EditDirective = serde_json::from_str(arguments.trim())
        .map_err(|e| ScriptError::MalformedDirective(format!("Invalid arguments: {}", e)))?;
    if directive.scene_id.trim().is_empty() {
        return Err(ScriptError::MalformedDirective(
            "No sceneId provided".to_string(),
        ));
    }
    Ok(directive)
}

/// What the driver must do after feeding one backend event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Forward this narration immediately.
    Forward(String),
    /// A directive is complete; run the edit.
    Dispatch(EditDirective),
    /// Nothing to emit.
    Idle,
}

/// Per-turn state machine, free of I/O.
#[derive(Debug, Clone)]
pub struct TurnMachine {
    phase: TurnPhase,
    directive: DirectiveAccumulator,
}

impl Default for TurnMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnMachine {
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::StreamingText,
            directive: DirectiveAccumulator::default(),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn on_event(&mut self, event: BackendEvent) -> Result<Step, ScriptError> {
        match event {
            BackendEvent::CallFragment { name, arguments } => {
                // A newly named call right after a complete one starts a second directive.
                let closed = if name.is_some() && self.directive.is_complete() {
                    Some(self.directive.take_directive()?)
                } else {
                    None
                };
                if self.phase == TurnPhase::StreamingText {
                    debug!("Directive started");
                }
                self.directive.push(name.as_deref(), &arguments);
                match closed {
                    Some(directive) => {
                        self.phase = TurnPhase::DispatchingEdit;
                        Ok(Step::Dispatch(directive))
                    }
                    None => {
                        self.phase = TurnPhase::AccumulatingDirective;
                        Ok(Step::Idle)
                    }
                }
            }
            BackendEvent::Text(text) => match self.phase {
                TurnPhase::StreamingText => Ok(Step::Forward(text)),
                TurnPhase::AccumulatingDirective => {
                    trace!(len = text.len(), "Narration suppressed during directive");
                    self.try_complete()
                }
                TurnPhase::DispatchingEdit | TurnPhase::Done => Ok(Step::Idle),
            },
            BackendEvent::Finished { reason } => {
                debug!(reason = ?reason, "Backend finished");
                if self.phase == TurnPhase::AccumulatingDirective {
                    self.try_complete()
                } else {
                    Ok(Step::Idle)
                }
            }
        }
    }

    /// The edit for the last dispatched directive has been emitted.
    pub fn dispatched(&mut self) {
        if self.phase == TurnPhase::DispatchingEdit {
            self.phase = if self.directive.is_empty() {
                TurnPhase::StreamingText
            } else {
                TurnPhase::AccumulatingDirective
            };
        }
    }

    /// The backend stream ended. Returns a directive still waiting to be
    /// dispatched, or fails if one was left incomplete.
    pub fn on_end(&mut self) -> Result<Option<EditDirective>, ScriptError> {
        let pending = match self.phase {
            TurnPhase::AccumulatingDirective if self.directive.is_complete() => {
                Some(self.directive.take_directive()?)
            }
            TurnPhase::AccumulatingDirective if !self.directive.is_empty() => {
                return Err(ScriptError::MalformedDirective(
                    "Stream ended before the edit directive was complete".to_string(),
                ));
            }
            _ => None,
        };
        self.phase = TurnPhase::Done;
        Ok(pending)
    }

    /// Narration that arrives while a directive is buffered is never
    /// forwarded, whether or not it closes the directive.
    fn try_complete(&mut self) -> Result<Step, ScriptError> {
        if !self.directive.is_complete() {
            return Ok(Step::Idle);
        }
        let directive = self.directive.take_directive()?;
        self.phase = TurnPhase::DispatchingEdit;
        Ok(Step::Dispatch(directive))
    }
}

/// Orchestrates chat turns against the generation backend.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn GenerationBackend>,
    suggestions: Arc<dyn SuggestionService>,
    temperature: f32,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        suggestions: Arc<dyn SuggestionService>,
        temperature: f32,
    ) -> Self {
        Self {
            backend,
            suggestions,
            temperature,
        }
    }

    /// Build the backend request for a turn.
    ///
    /// User messages that mention a candidate scene get the scene-id hint
    /// appended; the caller's messages are left untouched.
    pub fn build_request(&self, messages: &[ChatMessage], candidates: &[Scene]) -> ChatCompletionRequest {
        let mut outbound = Vec::with_capacity(messages.len() + 1);
        outbound.push(BackendMessage::system(CHAT_SYSTEM_PROMPT));
        for msg in messages {
            let mut backend_msg = BackendMessage::from(msg);
            if msg.role == ChatRole::User {
                if let Some(scene_id) = resolve_mention(&msg.content, candidates) {
                    backend_msg.content = augment_with_scene_hint(&msg.content, scene_id);
                }
            }
            outbound.push(backend_msg);
        }

        ChatCompletionRequest {
            messages: outbound,
            functions: vec![FunctionSpec::edit_scene()],
            temperature: self.temperature,
            max_tokens: None,
        }
    }

    /// Start a turn.
    ///
    /// Fails directly when the backend cannot be reached. Otherwise returns
    /// the turn's output channel, fed by a background task; dropping the
    /// channel abandons the turn.
    pub async fn dispatch(
        &self,
        messages: &[ChatMessage],
        candidates: Vec<Scene>,
    ) -> Result<TurnStream, ScriptError> {
        let turn_id = Uuid::new_v4();
        let span = tracing::info_span!("turn", %turn_id);
        let request = self.build_request(messages, &candidates);

        let events = self
            .backend
            .stream_turn(request)
            .instrument(span.clone())
            .await?;

        let (tx, rx) = mpsc::channel(TURN_CHANNEL_CAPACITY);
        let suggestions = Arc::clone(&self.suggestions);

        tokio::spawn(
            async move {
                info!(candidates = candidates.len(), "Turn started");
                match drive_turn(events, &candidates, suggestions.as_ref(), &tx).await {
                    Ok(()) => info!("Turn complete"),
                    Err(e) => {
                        error!("Turn failed: {}", e);
                        let _ = tx.send(Err(e)).await;
                    }
                }
            }
            .instrument(span),
        );

        Ok(ReceiverStream::new(rx))
    }
}

type TurnSender = mpsc::Sender<Result<TurnEvent, ScriptError>>;

/// Consume the backend stream, emitting events until it ends.
///
/// Returns `Ok` early when the caller has dropped the channel.
async fn drive_turn(
    mut events: BackendEventStream,
    candidates: &[Scene],
    suggestions: &dyn SuggestionService,
    tx: &TurnSender,
) -> Result<(), ScriptError> {
    let mut machine = TurnMachine::new();

    while let Some(event) = events.next().await {
        match machine.on_event(event?)? {
            Step::Forward(text) => {
                if tx.send(Ok(TurnEvent::Text(text))).await.is_err() {
                    debug!("Turn abandoned by caller");
                    return Ok(());
                }
            }
            Step::Dispatch(directive) => {
                if !dispatch_edit(directive, candidates, suggestions, tx).await? {
                    return Ok(());
                }
                machine.dispatched();
            }
            Step::Idle => {}
        }
    }

    if let Some(directive) = machine.on_end()? {
        dispatch_edit(directive, candidates, suggestions, tx).await?;
    }
    Ok(())
}

/// Run one edit and emit its suggestion. Returns `false` if the caller is gone.
async fn dispatch_edit(
    directive: EditDirective,
    candidates: &[Scene],
    suggestions: &dyn SuggestionService,
    tx: &TurnSender,
) -> Result<bool, ScriptError> {
    let scene = candidates
        .iter()
        .find(|s| s.id == directive.scene_id)
        .ok_or_else(|| {
            warn!(scene_id = %directive.scene_id, "Directive names a scene outside the turn's candidates");
            ScriptError::SceneNotFound {
                id: directive.scene_id.clone(),
            }
        })?;

    info!(scene_id = %scene.id, tag = %scene.tag, "Dispatching edit");
    let rewrite = suggestions
        .request_edit(&scene.snapshot(), directive.instruction())
        .await?;
    let suggestion = Suggestion::new(scene, rewrite);

    Ok(tx.send(Ok(TurnEvent::Suggestion(suggestion))).await.is_ok())
}
