//! Generation backend seam.
//!
//! The hosted language model is reached through `GenerationBackend`, which
//! offers the two calls the editor needs: a streamed conversational turn that
//! may invoke the `editScene` function, and a single-shot completion used for
//! the rewrite itself. `OpenAiBackend` talks to any OpenAI-compatible API;
//! `ScriptedBackend` replays canned output for tests.

pub mod openai;
pub mod scripted;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, ChatRole, EditDirective};
use crate::ScriptError;

pub use openai::OpenAiBackend;
pub use scripted::{call_fragments, ScriptedBackend};

/// Name of the function the turn call may invoke.
pub const EDIT_SCENE_FUNCTION: &str = "editScene";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendRole {
    System,
    User,
    Assistant,
}

/// A role-tagged message as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendMessage {
    pub role: BackendRole,
    pub content: String,
}

impl BackendMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: BackendRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: BackendRole::User,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for BackendMessage {
    fn from(msg: &ChatMessage) -> Self {
        let role = match msg.role {
            ChatRole::User => BackendRole::User,
            ChatRole::Assistant => BackendRole::Assistant,
        };
        Self {
            role,
            content: msg.content.clone(),
        }
    }
}

/// A function the backend may decide to call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl FunctionSpec {
    /// `editScene(sceneId: string, userPrompt?: string)`.
    pub fn edit_scene() -> Self {
        let mut parameters = serde_json::Value::from(schemars::schema_for!(EditDirective));
        if let Some(obj) = parameters.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
        }
        Self {
            name: EDIT_SCENE_FUNCTION.to_string(),
            description: "Improve a video script scene using its exact UUID from referencedScenes"
                .to_string(),
            parameters,
        }
    }
}

/// One request to the backend. The model name is a backend setting.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletionRequest {
    pub messages: Vec<BackendMessage>,
    /// Declared functions; the backend decides on its own whether to call one.
    pub functions: Vec<FunctionSpec>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// An incremental event of a streamed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// A fragment of narration text.
    Text(String),
    /// A fragment of a named function call. The name arrives once, arguments
    /// arrive in pieces to be concatenated.
    CallFragment {
        name: Option<String>,
        arguments: String,
    },
    /// The backend reported why it stopped.
    Finished { reason: Option<String> },
}

pub type BackendEventStream = BoxStream<'static, Result<BackendEvent, ScriptError>>;

/// Service trait for the hosted generation backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Start a streamed turn. Events are delivered in arrival order.
    async fn stream_turn(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<BackendEventStream, ScriptError>;

    /// Run a single-shot completion and return the raw text of the answer.
    async fn complete(&self, request: ChatCompletionRequest) -> Result<String, ScriptError>;
}
