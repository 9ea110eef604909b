use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NestviewError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
    #[error("Failed to initialize document: {0}")]
    DocumentInitializationError(String),
    #[error("Isolation toggle failed: {0}")]
    ToggleFailed(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}
