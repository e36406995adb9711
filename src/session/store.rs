//! Ordered scene collection with a single-step undo log.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Scene, SceneField, SceneSnapshot};
use crate::ScriptError;

/// Captured inverse of one mutating store operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum UndoRecord {
    Add {
        scene: Scene,
    },
    Delete {
        scene: Scene,
    },
    Update {
        scene_id: String,
        old: SceneSnapshot,
        new: SceneSnapshot,
    },
}

/// Append-only action log. Popping is destructive; there is no redo.
#[derive(Debug, Clone, Default)]
pub struct UndoLog {
    records: Vec<UndoRecord>,
}

impl UndoLog {
    pub fn push(&mut self, record: UndoRecord) {
        self.records.push(record);
    }

    pub fn pop(&mut self) -> Option<UndoRecord> {
        self.records.pop()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&UndoRecord> {
        self.records.last()
    }
}

/// Scenes in script order. Every mutation appends exactly one undo record.
#[derive(Debug, Clone, Default)]
pub struct SceneStore {
    scenes: Vec<Scene>,
    log: UndoLog,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing scenes without recording them in the log.
    pub fn with_scenes(scenes: Vec<Scene>) -> Result<Self, ScriptError> {
        let mut store = Self::new();
        for scene in scenes {
            store.ensure_unique(&scene.id)?;
            store.scenes.push(scene);
        }
        Ok(store)
    }

    /// Start from `(content, tag)` drafts. Every draft gets a fresh id, so
    /// there is nothing to reject.
    pub fn from_drafts<'a>(drafts: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            scenes: drafts
                .into_iter()
                .map(|(content, tag)| Scene::new(content, tag))
                .collect(),
            log: UndoLog::default(),
        }
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn get(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn log(&self) -> &UndoLog {
        &self.log
    }

    /// Append a scene at the end.
    pub fn add(&mut self, scene: Scene) -> Result<(), ScriptError> {
        self.ensure_unique(&scene.id)?;
        self.log.push(UndoRecord::Add {
            scene: scene.clone(),
        });
        debug!(scene_id = %scene.id, tag = %scene.tag, "Scene added");
        self.scenes.push(scene);
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<Scene, ScriptError> {
        let index = self.position(id)?;
        let scene = self.scenes.remove(index);
        self.log.push(UndoRecord::Delete {
            scene: scene.clone(),
        });
        debug!(scene_id = %id, "Scene deleted");
        Ok(scene)
    }

    /// Set one field of a scene.
    pub fn update(&mut self, id: &str, field: SceneField, value: impl Into<String>) -> Result<(), ScriptError> {
        let index = self.position(id)?;
        let scene = &mut self.scenes[index];
        let old = scene.snapshot();
        scene.set_field(field, value.into());
        let new = scene.snapshot();
        self.log.push(UndoRecord::Update {
            scene_id: id.to_string(),
            old,
            new,
        });
        debug!(scene_id = %id, %field, "Scene updated");
        Ok(())
    }

    /// Overwrite content and tag together as a single undoable update.
    pub fn replace(&mut self, id: &str, snapshot: SceneSnapshot) -> Result<(), ScriptError> {
        let index = self.position(id)?;
        let scene = &mut self.scenes[index];
        let old = scene.snapshot();
        scene.restore(&snapshot);
        self.log.push(UndoRecord::Update {
            scene_id: id.to_string(),
            old,
            new: snapshot,
        });
        Ok(())
    }

    /// Invert the most recent record. Returns it, or `None` if the log was empty.
    ///
    /// A deleted scene comes back at the end of the list, not its old position.
    pub fn undo(&mut self) -> Option<UndoRecord> {
        let record = self.log.pop()?;
        match &record {
            UndoRecord::Add { scene } => {
                self.scenes.retain(|s| s.id != scene.id);
            }
            UndoRecord::Delete { scene } => {
                if self.get(&scene.id).is_none() {
                    self.scenes.push(scene.clone());
                }
            }
            UndoRecord::Update { scene_id, old, .. } => {
                if let Some(scene) = self.scenes.iter_mut().find(|s| &s.id == scene_id) {
                    scene.restore(old);
                }
            }
        }
        debug!(remaining = self.log.len(), "Undo applied");
        Some(record)
    }

    fn position(&self, id: &str) -> Result<usize, ScriptError> {
        self.scenes
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| ScriptError::SceneNotFound { id: id.to_string() })
    }

    fn ensure_unique(&self, id: &str) -> Result<(), ScriptError> {
        if self.get(id).is_some() {
            return Err(ScriptError::Conflict(format!(
                "Scene id '{}' already exists",
                id
            )));
        }
        Ok(())
    }
}
