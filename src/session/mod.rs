mod pending;
mod state;
mod store;

pub use pending::PendingEdit;
pub use state::{EditorSession, SessionState, TurnOutcome, NEW_SCENE_CONTENT, NEW_SCENE_TAG};
pub use store::{SceneStore, UndoLog, UndoRecord};
