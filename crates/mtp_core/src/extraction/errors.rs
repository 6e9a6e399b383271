//! Error types for extraction.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that end an extraction job.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Extraction of track {audio_index} failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        audio_index: usize,
        exit_code: i32,
        stderr: String,
    },

    #[error("I/O error during extraction: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output file missing or empty: {0}")]
    OutputMissing(PathBuf),

    #[error("Extraction task ended abnormally: {0}")]
    TaskAborted(String),
}

impl ExtractionError {
    /// Short text for a track's error field.
    ///
    /// For a failed encoder run this is the captured diagnostic output.
    pub fn diagnostic(&self) -> String {
        match self {
            ExtractionError::CommandFailed {
                exit_code, stderr, ..
            } => {
                if stderr.trim().is_empty() {
                    format!("encoder exited with code {}", exit_code)
                } else {
                    stderr.clone()
                }
            }
            other => other.to_string(),
        }
    }

    /// Whether the encoder never started.
    pub fn is_spawn_error(&self) -> bool {
        matches!(self, ExtractionError::Spawn { .. })
    }
}

/// Result type for extraction operations.
pub type ExtractionOutcome<T> = Result<T, ExtractionError>;

/// A progress line that could not be interpreted. Skipped, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressParseError {
    #[error("progress line has no '=' separator: {0:?}")]
    MissingSeparator(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_is_stderr_for_failed_runs() {
        let err = ExtractionError::CommandFailed {
            audio_index: 1,
            exit_code: 1,
            stderr: "Invalid stream".to_string(),
        };
        assert_eq!(err.diagnostic(), "Invalid stream");
    }

    #[test]
    fn diagnostic_falls_back_to_exit_code() {
        let err = ExtractionError::CommandFailed {
            audio_index: 0,
            exit_code: 69,
            stderr: "  \n".to_string(),
        };
        assert_eq!(err.diagnostic(), "encoder exited with code 69");
    }
}
