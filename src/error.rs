//! Error types for the metablock generator

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{path} not found")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported meta file format: {ext}")]
    UnsupportedFormat { ext: String },

    #[error("Meta file {path} must contain a mapping at the top level")]
    NotAMapping { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unknown script manager: {0}")]
    UnknownScriptManager(String),

    #[error("The script manager {manager} doesn't support metaKey: {key}")]
    UnknownMetaKey { key: String, manager: String },

    #[error("Invalid metaValue for {key}: {message}")]
    InvalidMetaValue { key: String, message: String },
}

impl Error {
    /// True for failures raised by the error policy rather than by the
    /// configuration source.
    pub fn is_policy_failure(&self) -> bool {
        matches!(self, Error::UnknownMetaKey { .. } | Error::InvalidMetaValue { .. })
    }
}
