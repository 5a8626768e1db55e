use thiserror::Error;

use std::path::PathBuf;

use crate::bundle::ValueKind;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse bundle {path}: {source}")]
    BundleParse {
        path: PathBuf,
        #[source]
        source: BundleSyntaxError,
    },

    #[error("invalid --set entry '{entry}': {reason}")]
    InvalidOverride { entry: String, reason: String },

    #[error("restriction key {key} holds a {found} value, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("invalid URL filter '{entry}': {reason}")]
    InvalidUrlFilter { entry: String, reason: String },

    #[error("invalid managed bookmarks: {reason}")]
    InvalidBookmarks { reason: String },

    #[error("failed to render report: {0}")]
    Render(String),
}

/// Syntax error in a bundle file, by file format
#[derive(Debug, Error)]
pub enum BundleSyntaxError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
