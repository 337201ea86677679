use thiserror::Error;

/// Failure raised while evaluating console input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvalError {
    message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure loading a helper library
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("no loader configured")]
    NoLoader,

    #[error("unknown library `{0}`")]
    UnknownLibrary(String),

    #[error("library not found at {0}")]
    NotFound(String),

    #[error("load cancelled")]
    Cancelled,
}
