//! CLI command handlers.

pub mod chat;
pub mod edit;
pub mod serve;
