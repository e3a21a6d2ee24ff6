//! Configuration errors

use std::path::PathBuf;

/// Errors that can occur while loading engine settings or local config files
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML settings {path}: {message}")]
    Yaml { path: PathBuf, message: String },

    #[error("Failed to parse JSON config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a JSON object in {0}")]
    NotAnObject(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
