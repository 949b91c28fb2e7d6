use thiserror::Error;

/// Errors surfaced by the editor's fallible entry points. Generation and
/// per-slide media failures are reported through the event stream instead;
/// they never tear down the session.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Project-store failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;
