//! Scene mention extraction.
//!
//! A chat message can point at a scene with `@[Tag]` or `@Scene "Tag"`.
//! Only the first mention counts, and the bracket form wins over the quoted
//! form. Resolution is an exact tag match against the turn's candidates; the
//! first candidate with that tag is returned even when tags repeat.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::Scene;

static BRACKET_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\[(.*?)\]").expect("bracket mention pattern is valid"));

static QUOTED_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@Scene "([^"]+)""#).expect("quoted mention pattern is valid"));

/// Return the tag named by the first mention in `message`, if any.
pub fn extract_mention(message: &str) -> Option<&str> {
    if let Some(caps) = BRACKET_MENTION.captures(message) {
        return caps.get(1).map(|m| m.as_str());
    }
    QUOTED_MENTION
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Resolve the scene a message refers to.
///
/// Returns `None` for mention-free messages and for mentions whose tag no
/// candidate carries. Never fails.
pub fn resolve_mention<'a>(message: &str, candidates: &'a [Scene]) -> Option<&'a str> {
    let tag = extract_mention(message)?;
    let found = candidates.iter().find(|s| s.tag == tag).map(|s| s.id.as_str());
    if found.is_none() {
        tracing::debug!(tag, "Mention did not match any candidate scene");
    }
    found
}

/// Append the machine-readable scene hint to a backend-bound message.
pub fn augment_with_scene_hint(content: &str, scene_id: &str) -> String {
    format!("{}\n[Use sceneId: {}]", content, scene_id)
}

/// Scenes whose tag or content contains `query`, ignoring case.
///
/// Backs mention autocomplete; an empty query matches every scene.
pub fn mention_candidates<'a>(scenes: &'a [Scene], query: &str) -> Vec<&'a Scene> {
    let needle = query.to_lowercase();
    scenes
        .iter()
        .filter(|s| {
            s.tag.to_lowercase().contains(&needle) || s.content.to_lowercase().contains(&needle)
        })
        .collect()
}
