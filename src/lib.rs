pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod init;
pub mod models;
pub mod server;
pub mod services;
pub mod session;

pub use error::{ErrorClass, ScriptError};
