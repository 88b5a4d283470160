use std::io;
use thiserror::Error;

/// Application-wide error type, consolidating all possible errors into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// A model or tokenizer could not be resolved or materialized at startup.
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Classification was invoked before any model finished loading.
    #[error("Classification engine not loaded")]
    EngineNotLoaded,

    /// A conversation arrived with no messages; it is skipped, not fatal.
    #[error("Conversation '{0}' has no messages")]
    EmptyConversation(String),

    /// Batch input is not valid structured data (e.g., unparsable JSON).
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A single model forward pass failed (tokenization, tensor, device).
    #[error("Inference error: {0}")]
    Inference(String),

    /// Represents data validation errors (e.g., invalid input format).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Represents configuration-related errors (e.g., incoherent settings).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents unexpected internal errors that indicate a bug.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Represents errors from operations that did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Operation timed out: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedInput(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation errors: {}", err))
    }
}

impl From<candle_core::Error> for AppError {
    fn from(err: candle_core::Error) -> Self {
        AppError::Inference(format!("Tensor error: {}", err))
    }
}

impl From<hf_hub::api::sync::ApiError> for AppError {
    fn from(err: hf_hub::api::sync::ApiError) -> Self {
        AppError::ModelLoad(format!("Hub error: {}", err))
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::Io(io::Error::other(format!("Zip error: {}", err)))
    }
}
