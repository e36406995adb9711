//! Output framing of a chat turn.
//!
//! A turn produces narration text and, per edit directive, one structured
//! suggestion. Internally these travel as `TurnEvent`s. On the HTTP body
//! they share one byte stream: text goes out raw, a suggestion goes out as a
//! JSON envelope. Readers tell them apart with `classify_fragment`, which is
//! the only place the "does it look like JSON" rule lives.

use serde::{Deserialize, Serialize};

use crate::models::Suggestion;

/// One item of a turn's output channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Text(String),
    Suggestion(Suggestion),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
enum Envelope {
    Suggestion(Suggestion),
}

/// Serialize an event for the shared byte stream.
pub fn encode_event(event: &TurnEvent) -> String {
    match event {
        TurnEvent::Text(text) => text.clone(),
        TurnEvent::Suggestion(suggestion) => {
            serde_json::to_string(&Envelope::Suggestion(suggestion.clone()))
                .unwrap_or_else(|e| {
                    tracing::error!("Failed to encode suggestion: {}", e);
                    String::new()
                })
        }
    }
}

/// Interpret one fragment read from the shared byte stream.
///
/// A fragment that is a complete suggestion envelope is a suggestion;
/// anything else, including JSON of another shape, is narration.
pub fn classify_fragment(fragment: &str) -> TurnEvent {
    let trimmed = fragment.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Ok(Envelope::Suggestion(suggestion)) = serde_json::from_str::<Envelope>(trimmed) {
            return TurnEvent::Suggestion(suggestion);
        }
    }
    TurnEvent::Text(fragment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Scene, SceneRewrite};
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn suggestion() -> Suggestion {
        Suggestion::new(
            &Scene::with_id("s1", "Hi", "Intro"),
            SceneRewrite {
                content: "Hey there!".into(),
                tag: "Intro".into(),
                reasoning: "more energy".into(),
            },
        )
    }

    #[test]
    fn test_suggestion_envelope_text() {
        assert_snapshot!(
            encode_event(&TurnEvent::Suggestion(suggestion())),
            @r#"{"type":"suggestion","content":{"sceneId":"s1","original":{"content":"Hi","tag":"Intro"},"suggestion":{"content":"Hey there!","tag":"Intro","reasoning":"more energy"}}}"#
        );
    }

    #[test]
    fn test_text_passes_through_raw() {
        let event = TurnEvent::Text("Sure, ".into());
        assert_eq!(encode_event(&event), "Sure, ");
        assert_eq!(classify_fragment("Sure, "), event);
    }

    #[test]
    fn test_envelope_is_recognised() {
        let wire = encode_event(&TurnEvent::Suggestion(suggestion()));
        assert_eq!(
            classify_fragment(&format!("  {}\n", wire)),
            TurnEvent::Suggestion(suggestion())
        );
    }

    #[test]
    fn test_other_json_stays_text() {
        let fragment = r#"{"note":"braces in prose"}"#;
        assert_eq!(
            classify_fragment(fragment),
            TurnEvent::Text(fragment.to_string())
        );
        assert_eq!(
            classify_fragment("{ not json }"),
            TurnEvent::Text("{ not json }".into())
        );
    }
}
