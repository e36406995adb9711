pub mod builders;
pub mod harness;

// Re-export commonly used test utilities
pub use builders::{rewrite_json, TurnScript};
pub use harness::{intro_scene, TestHarness};
