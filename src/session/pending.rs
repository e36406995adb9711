//! The single pending-suggestion slot.

use tracing::{info, warn};

use super::store::SceneStore;
use crate::models::{Scene, SceneSnapshot, Suggestion};
use crate::ScriptError;

/// At most one suggestion awaiting approval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PendingEdit {
    #[default]
    Empty,
    Pending(Suggestion),
}

impl PendingEdit {
    pub fn is_pending(&self) -> bool {
        matches!(self, PendingEdit::Pending(_))
    }

    pub fn current(&self) -> Option<&Suggestion> {
        match self {
            PendingEdit::Pending(s) => Some(s),
            PendingEdit::Empty => None,
        }
    }

    /// Hold a new suggestion, replacing any held one (last write wins).
    ///
    /// Returns the suggestion that was discarded.
    pub fn offer(&mut self, suggestion: Suggestion) -> Option<Suggestion> {
        match std::mem::replace(self, PendingEdit::Pending(suggestion)) {
            PendingEdit::Pending(previous) => {
                info!(scene_id = %previous.scene_id, "Replacing pending suggestion");
                Some(previous)
            }
            PendingEdit::Empty => None,
        }
    }

    /// Drop the held suggestion without touching the store. No-op when empty.
    pub fn dismiss(&mut self) -> Option<Suggestion> {
        match std::mem::take(self) {
            PendingEdit::Pending(s) => Some(s),
            PendingEdit::Empty => None,
        }
    }

    /// Apply the held suggestion to `store` and return the updated scene.
    ///
    /// `Ok(None)` when nothing is pending. If the target scene has been
    /// deleted meanwhile the slot is still cleared and `StaleSuggestion`
    /// is returned.
    pub fn approve(&mut self, store: &mut SceneStore) -> Result<Option<Scene>, ScriptError> {
        let PendingEdit::Pending(suggestion) = std::mem::take(self) else {
            return Ok(None);
        };

        let rewrite = suggestion.suggestion;
        let snapshot = SceneSnapshot {
            content: rewrite.content,
            tag: rewrite.tag,
        };
        match store.replace(&suggestion.scene_id, snapshot) {
            Ok(()) => Ok(store.get(&suggestion.scene_id).cloned()),
            Err(ScriptError::SceneNotFound { id }) => {
                warn!(scene_id = %id, "Approved suggestion targets a deleted scene");
                Err(ScriptError::StaleSuggestion { scene_id: id })
            }
            Err(e) => Err(e),
        }
    }
}
