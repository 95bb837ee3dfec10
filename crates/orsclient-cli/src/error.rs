//! Error types and handling for the CLI
//!
//! This module provides error types and utilities for handling
//! various failure modes in the CLI application.

use orsclient_core::ErrorKind;
use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from orsclient-core library
    #[error("{0}")]
    Core(#[from] orsclient_core::Error),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {}", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Invalid argument value
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// Provider not found
    #[error("Provider '{}' not found in {}", name, config.display())]
    ProviderNotFound { name: String, config: PathBuf },

    /// A batch stopped early because of an error that applies to every job
    #[error("Batch aborted at job '{job}': {source}")]
    BatchAborted {
        job: String,
        #[source]
        source: orsclient_core::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create an invalid arguments error
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Core(e) | Self::BatchAborted { source: e, .. } => core_exit_code(e.kind()),
            Self::Io(_) => 1,
            Self::FileNotFound { .. } => 4,
            Self::InvalidArgs(_) => 6,
            Self::ProviderNotFound { .. } => 7,
            Self::InvalidFormat { .. } => 8,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Other { .. } => 1,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::InvalidArgs(_))
    }
}

/// Exit code for a core error kind
pub fn core_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Api => 2,
        ErrorKind::GenericServer => 3,
        ErrorKind::Configuration => 5,
        ErrorKind::InvalidKey => 9,
        ErrorKind::Transport => 10,
        ErrorKind::Timeout => 11,
        ErrorKind::Cancelled => 130,
        ErrorKind::OverQueryLimit | ErrorKind::Json | ErrorKind::Io => 1,
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    let label = match error {
        Error::Core(e) | Error::BatchAborted { source: e, .. } => format!("{}:", e.kind()),
        _ => "Error:".to_string(),
    };

    if use_color {
        use colored::Colorize;
        format!("{} {}", label.red().bold(), error)
    } else {
        format!("{} {}", label, error)
    }
}
