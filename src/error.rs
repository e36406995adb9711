use thiserror::Error;

/// Custom error type for scenecraft operations.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A scene id was referenced that the store or turn candidates do not hold.
    #[error("Scene not found: '{id}'")]
    SceneNotFound { id: String },

    /// A scene with the same id already exists in the store.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend's edit directive could not be turned into a valid request.
    #[error("Malformed directive: {0}")]
    MalformedDirective(String),

    /// The backend answered, but not in the structured shape that was demanded.
    #[error("Malformed backend response: {0}")]
    MalformedBackendResponse(String),

    /// The generation backend could not be reached or answered with a failure status.
    #[error("Backend unavailable: {message}")]
    BackendUnavailable {
        message: String,
        status: Option<u16>,
    },

    /// The backend call or the whole turn exceeded its time budget.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Approve was attempted for a scene that no longer exists.
    #[error("Stale suggestion: scene '{scene_id}' no longer exists")]
    StaleSuggestion { scene_id: String },

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScriptError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        ScriptError::BackendUnavailable {
            message: message.into(),
            status: None,
        }
    }
}

impl From<reqwest::Error> for ScriptError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScriptError::Timeout(err.to_string())
        } else if err.is_decode() {
            ScriptError::MalformedBackendResponse(err.to_string())
        } else {
            ScriptError::BackendUnavailable {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ScriptError {
    fn from(err: serde_json::Error) -> Self {
        ScriptError::MalformedBackendResponse(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for ScriptError {
    fn from(err: std::io::Error) -> Self {
        ScriptError::Config(format!("I/O error: {}", err))
    }
}

/// Coarse classification used to pick the user-visible failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Timeout,
    Offline,
    Server,
    Other,
}

impl ErrorClass {
    pub fn classify(err: &ScriptError) -> Self {
        match err {
            ScriptError::Timeout(_) => ErrorClass::Timeout,
            ScriptError::BackendUnavailable {
                status: Some(code), ..
            } if *code >= 500 => ErrorClass::Server,
            ScriptError::BackendUnavailable { status: None, .. } => ErrorClass::Offline,
            _ => ErrorClass::Other,
        }
    }

    /// The single assistant message shown in place of a failed turn.
    pub fn substitute_message(self) -> &'static str {
        match self {
            ErrorClass::Timeout => {
                "Sorry, that took too long to answer. Please try sending your message again."
            }
            ErrorClass::Offline => {
                "I couldn't reach the assistant service. Check your connection and resend your message."
            }
            ErrorClass::Server => {
                "The assistant service is having trouble right now. Please try again in a moment."
            }
            ErrorClass::Other => "Sorry, something went wrong while handling that request.",
        }
    }
}
