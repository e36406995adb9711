//! Edit directives, rewrites and pending suggestions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::chat::ChatMessage;
use super::scene::{Scene, SceneSnapshot};

/// Instruction used when the backend's directive carries none.
pub const DEFAULT_INSTRUCTION: &str = "improve this scene";

/// Arguments of the backend's `editScene` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditDirective {
    /// Copy and paste the exact id value from the matching scene in referencedScenes
    pub scene_id: String,
    /// The user's specific instructions for modifying the scene
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
}

impl EditDirective {
    /// The instruction to forward to the edit call.
    pub fn instruction(&self) -> &str {
        self.user_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_INSTRUCTION)
    }
}

/// A proposed rewrite of one scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneRewrite {
    pub content: String,
    pub tag: String,
    pub reasoning: String,
}

/// A rewrite paired with the scene it was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub scene_id: String,
    pub original: SceneSnapshot,
    pub suggestion: SceneRewrite,
}

impl Suggestion {
    pub fn new(scene: &Scene, rewrite: SceneRewrite) -> Self {
        Self {
            scene_id: scene.id.clone(),
            original: scene.snapshot(),
            suggestion: rewrite,
        }
    }
}

/// Body of a turn submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub referenced_scenes: Vec<Scene>,
}

/// Body of an edit submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub scene_id: String,
    pub original_content: String,
    pub original_tag: String,
    #[serde(default)]
    pub user_prompt: Option<String>,
}
