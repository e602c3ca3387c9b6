//! Error types for meshsync.
//!
//! Errors fall into four families that decide how far they travel:
//! configuration errors abort a run before anything is written, record-level
//! errors are caught by the phase that produced them, remote protocol errors
//! never leave an adapter call, and everything else is fatal to the run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for meshsync.
#[derive(Debug, Error)]
pub enum MeshError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Authentication failed against {provider}: {message}")]
    Authentication { provider: String, message: String },

    // Record-level errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{kind} #{id} not found")]
    NotFound { kind: String, id: i64 },

    // Remote provider errors
    #[error("Remote protocol error (status {status:?}): {message}")]
    RemoteProtocol {
        status: Option<u16>,
        message: String,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    // Storage errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    // Operator errors
    #[error("Operator input closed while asking for the {question}")]
    InputClosed { question: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for meshsync operations.
pub type Result<T> = std::result::Result<T, MeshError>;

impl From<std::io::Error> for MeshError {
    fn from(err: std::io::Error) -> Self {
        MeshError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MeshError {
    fn from(err: serde_json::Error) -> Self {
        MeshError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for MeshError {
    fn from(err: rusqlite::Error) -> Self {
        MeshError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for MeshError {
    fn from(err: reqwest::Error) -> Self {
        MeshError::Network {
            message: err.to_string(),
            cause: err.url().map(|u| u.to_string()),
        }
    }
}

impl MeshError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        MeshError::Config {
            message: message.into(),
        }
    }

    /// Shorthand for a validation error on a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MeshError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MeshError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Errors that must abort a run before any record is written.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MeshError::Config { .. } | MeshError::Authentication { .. }
        )
    }

    /// Errors that concern a single record and are recovered by skipping it.
    ///
    /// Database errors count here because constraint violations on insert
    /// are reported by SQLite, not by the validators.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            MeshError::Validation { .. } | MeshError::NotFound { .. } | MeshError::Database { .. }
        )
    }
}
