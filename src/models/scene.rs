//! Scene entity.
//!
//! A scene is one tagged block of script text. Its `id` is assigned once at
//! creation and is the only handle chat messages and suggestions use to point
//! at it; `content` and `tag` are freely editable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ScriptError;

/// A scene in the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub content: String,
    pub tag: String,
}

impl Scene {
    /// Create a scene with a freshly generated id.
    pub fn new(content: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: new_scene_id(),
            content: content.into(),
            tag: tag.into(),
        }
    }

    /// Create a scene with a caller-chosen id.
    pub fn with_id(id: impl Into<String>, content: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            tag: tag.into(),
        }
    }

    /// The editable part of the scene, without its id.
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            content: self.content.clone(),
            tag: self.tag.clone(),
        }
    }

    pub fn field(&self, field: SceneField) -> &str {
        match field {
            SceneField::Content => &self.content,
            SceneField::Tag => &self.tag,
        }
    }

    pub(crate) fn set_field(&mut self, field: SceneField, value: String) {
        match field {
            SceneField::Content => self.content = value,
            SceneField::Tag => self.tag = value,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: &SceneSnapshot) {
        self.content = snapshot.content.clone();
        self.tag = snapshot.tag.clone();
    }
}

/// Content and tag of a scene at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub content: String,
    pub tag: String,
}

/// The mutable fields of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneField {
    Content,
    Tag,
}

impl fmt::Display for SceneField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneField::Content => write!(f, "content"),
            SceneField::Tag => write!(f, "tag"),
        }
    }
}

impl FromStr for SceneField {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "content" => Ok(SceneField::Content),
            "tag" => Ok(SceneField::Tag),
            other => Err(ScriptError::Validation(format!(
                "Invalid scene field '{}': expected 'content' or 'tag'",
                other
            ))),
        }
    }
}

/// Generate an opaque scene identifier.
pub fn new_scene_id() -> String {
    Uuid::new_v4().to_string()
}

/// `(content, tag)` of the scenes every new session starts with.
pub const SEED_SCENES: [(&str, &str); 3] = [
    ("Welcome to our channel!", "Intro"),
    ("In this video, we'll be exploring...", "Topic"),
    ("Don't forget to like and subscribe!", "Outro"),
];

/// The seed scenes, each with a fresh id.
pub fn seed_scenes() -> Vec<Scene> {
    SEED_SCENES
        .iter()
        .map(|(content, tag)| Scene::new(*content, *tag))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scenes_get_distinct_ids() {
        let a = Scene::new("a", "A");
        let b = Scene::new("a", "A");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_field_parsing() {
        assert_eq!("content".parse::<SceneField>().unwrap(), SceneField::Content);
        assert_eq!(" TAG ".parse::<SceneField>().unwrap(), SceneField::Tag);
        assert!("title".parse::<SceneField>().is_err());
    }

    #[test]
    fn test_set_and_restore() {
        let mut scene = Scene::with_id("s1", "Hi", "Intro");
        let before = scene.snapshot();
        scene.set_field(SceneField::Tag, "Opening".into());
        assert_eq!(scene.field(SceneField::Tag), "Opening");
        scene.restore(&before);
        assert_eq!(scene.snapshot(), before);
    }

    #[test]
    fn test_seed_tags() {
        let tags: Vec<String> = seed_scenes().into_iter().map(|s| s.tag).collect();
        assert_eq!(tags, vec!["Intro", "Topic", "Outro"]);
    }
}
