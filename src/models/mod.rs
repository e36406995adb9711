pub mod chat;
pub mod scene;
pub mod suggestion;

pub use chat::{ChatMessage, ChatRole, ConversationEntry, GREETING};
pub use scene::{new_scene_id, seed_scenes, Scene, SEED_SCENES, SceneField, SceneSnapshot};
pub use suggestion::{
    EditDirective, EditRequest, SceneRewrite, Suggestion, TurnRequest, DEFAULT_INSTRUCTION,
};
