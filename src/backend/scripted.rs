//! In-process backend that replays scripted output.
//!
//! Each `stream_turn` call consumes the next scripted turn and each
//! `complete` call the next scripted completion. Every request is recorded
//! so callers can inspect exactly what would have been sent.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{BackendEvent, BackendEventStream, ChatCompletionRequest, GenerationBackend};
use crate::ScriptError;

type ScriptedTurn = Vec<Result<BackendEvent, ScriptError>>;

#[derive(Default)]
pub struct ScriptedBackend {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    completions: Mutex<VecDeque<Result<String, ScriptError>>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
    event_delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before delivering each streamed event.
    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = Some(delay);
        self
    }

    /// Queue a turn made of the given events.
    pub async fn push_turn(&self, events: Vec<BackendEvent>) {
        self.turns
            .lock()
            .await
            .push_back(events.into_iter().map(Ok).collect());
    }

    /// Queue a turn that may fail midway.
    pub async fn push_turn_results(&self, events: ScriptedTurn) {
        self.turns.lock().await.push_back(events);
    }

    /// Queue the raw text of the next completion.
    pub async fn push_completion(&self, text: impl Into<String>) {
        self.completions.lock().await.push_back(Ok(text.into()));
    }

    /// Queue a failing completion.
    pub async fn push_completion_error(&self, err: ScriptError) {
        self.completions.lock().await.push_back(Err(err));
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream_turn(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<BackendEventStream, ScriptError> {
        self.requests.lock().await.push(request);
        let events = self.turns.lock().await.pop_front().unwrap_or_default();
        let delay = self.event_delay;

        let stream = futures::stream::iter(events).then(move |event| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            event
        });
        Ok(stream.boxed())
    }

    async fn complete(&self, request: ChatCompletionRequest) -> Result<String, ScriptError> {
        self.requests.lock().await.push(request);
        self.completions
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ScriptError::unavailable("No scripted completion queued")))
    }
}

/// Split a JSON argument string into call fragments the way a streaming API
/// delivers them: the name on the first fragment, arguments in `chunk` pieces.
pub fn call_fragments(name: &str, arguments: &str, chunk: usize) -> Vec<BackendEvent> {
    let chars: Vec<char> = arguments.chars().collect();
    let mut events = vec![BackendEvent::CallFragment {
        name: Some(name.to_string()),
        arguments: String::new(),
    }];
    for piece in chars.chunks(chunk.max(1)) {
        events.push(BackendEvent::CallFragment {
            name: None,
            arguments: piece.iter().collect(),
        });
    }
    events
}
