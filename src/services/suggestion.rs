//! Scene rewrite requests against the generation backend.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::{BackendMessage, ChatCompletionRequest, GenerationBackend};
use crate::config::BackendConfig;
use crate::models::{SceneRewrite, SceneSnapshot, DEFAULT_INSTRUCTION};
use crate::ScriptError;

const EDIT_SYSTEM_PROMPT: &str = "You are an expert video script editor. Follow the user's specific instructions \
for improving the scene. If no specific instructions are given, make the content more engaging and impactful. \
Keep the original tag - only modify the content.";

/// Shape the backend is told to answer in.
#[derive(Debug, Deserialize)]
struct RewritePayload {
    content: String,
    reasoning: String,
}

/// Service trait for producing a rewrite of one scene.
#[async_trait]
pub trait SuggestionService: Send + Sync {
    /// Ask for a rewrite of `scene` following `instruction`.
    ///
    /// The returned tag is always the scene's original tag.
    async fn request_edit(
        &self,
        scene: &SceneSnapshot,
        instruction: &str,
    ) -> Result<SceneRewrite, ScriptError>;
}

/// `SuggestionService` backed by a single completion call.
pub struct BackendSuggestionService {
    backend: Arc<dyn GenerationBackend>,
    temperature: f32,
    max_tokens: u32,
}

impl BackendSuggestionService {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &BackendConfig) -> Self {
        Self {
            backend,
            temperature: config.edit_temperature,
            max_tokens: config.edit_max_tokens,
        }
    }

    /// Build the two-message exchange for one edit.
    pub fn build_request(&self, scene: &SceneSnapshot, instruction: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            messages: vec![
                BackendMessage::system(EDIT_SYSTEM_PROMPT),
                BackendMessage::user(edit_user_prompt(scene, instruction)),
            ],
            functions: Vec::new(),
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
        }
    }
}

#[async_trait]
impl SuggestionService for BackendSuggestionService {
    async fn request_edit(
        &self,
        scene: &SceneSnapshot,
        instruction: &str,
    ) -> Result<SceneRewrite, ScriptError> {
        let instruction = match instruction.trim() {
            "" => DEFAULT_INSTRUCTION,
            trimmed => trimmed,
        };
        debug!(tag = %scene.tag, instruction, "Requesting scene rewrite");

        let raw = self
            .backend
            .complete(self.build_request(scene, instruction))
            .await?;

        let rewrite = parse_rewrite(&raw, &scene.tag).inspect_err(|e| {
            warn!("Rejected rewrite from {}: {}", self.backend.name(), e);
        })?;
        Ok(rewrite)
    }
}

/// User-role prompt carrying the instruction, the tag as context and the
/// current content, followed by the demanded answer shape.
pub fn edit_user_prompt(scene: &SceneSnapshot, instruction: &str) -> String {
    format!(
        "{instruction}\n\n\
Scene to modify:\n\
Tag (for context): {tag}\n\
Content: {content}\n\n\
Respond in this format only:\n\
{{\n  \"content\": \"modified content\",\n  \"reasoning\": \"explanation of changes\"\n}}",
        instruction = instruction,
        tag = scene.tag,
        content = scene.content,
    )
}

/// Parse the backend's raw answer and pin the tag to the original.
pub fn parse_rewrite(raw: &str, original_tag: &str) -> Result<SceneRewrite, ScriptError> {
    let payload: RewritePayload = serde_json::from_str(raw.trim()).map_err(|e| {
        ScriptError::MalformedBackendResponse(format!(
            "Expected {{\"content\", \"reasoning\"}} object: {}",
            e
        ))
    })?;
    Ok(SceneRewrite {
        content: payload.content,
        tag: original_tag.to_string(),
        reasoning: payload.reasoning,
    })
}
