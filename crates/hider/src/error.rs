//! Error types for the hider engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HiderError {
    #[error("DOM error: {0}")]
    Dom(#[from] dom::DomError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cannot migrate site record: {0}")]
    Migration(String),

    #[error("Invalid hide mode: {0}")]
    InvalidHideMode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Picker already injected into this page")]
    AlreadyInjected,
}

pub type Result<T> = std::result::Result<T, HiderError>;
