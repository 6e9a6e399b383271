//! Error types for probing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while probing a media file.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Failed to parse prober output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for probe operations.
pub type ProbeOutcome<T> = Result<T, ProbeError>;
