//! Builders for scripted backend turns.

use scenecraft::backend::{call_fragments, BackendEvent};
use serde_json::json;

/// Fluent builder for the event sequence of one streamed turn.
pub struct TurnScript {
    events: Vec<BackendEvent>,
    chunk: usize,
}

impl TurnScript {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            chunk: 4,
        }
    }

    /// Size of the argument pieces directives are split into.
    pub fn chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.events.push(BackendEvent::Text(text.into()));
        self
    }

    /// An `editScene` call for `scene_id`, streamed in fragments.
    pub fn directive(self, scene_id: &str, user_prompt: Option<&str>) -> Self {
        let mut args = json!({ "sceneId": scene_id });
        if let Some(prompt) = user_prompt {
            args["userPrompt"] = json!(prompt);
        }
        self.raw_call("editScene", &args.to_string())
    }

    /// A call with raw argument text.
    pub fn raw_call(mut self, name: &str, arguments: &str) -> Self {
        self.events
            .extend(call_fragments(name, arguments, self.chunk));
        self
    }

    pub fn finish(mut self, reason: &str) -> Self {
        self.events.push(BackendEvent::Finished {
            reason: Some(reason.to_string()),
        });
        self
    }

    pub fn build(self) -> Vec<BackendEvent> {
        self.events
    }
}

/// The edit call's answer for a rewrite.
pub fn rewrite_json(content: &str, reasoning: &str) -> String {
    json!({ "content": content, "reasoning": reasoning }).to_string()
}
