//! Player error type.

use thiserror::Error;

use crate::mixer::MixerError;
use crate::probe::ProbeError;

/// Errors returned by player commands. None of them are fatal.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Mixer(#[from] MixerError),

    #[error("Failed to create session directory: {0}")]
    Session(#[source] std::io::Error),

    #[error("No file is open")]
    NoSession,

    #[error("No audio track #{0}")]
    UnknownTrack(usize),
}

/// Result type for player commands.
pub type PlayerResult<T> = Result<T, PlayerError>;
