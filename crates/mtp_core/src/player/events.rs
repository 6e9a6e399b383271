//! Events published to the front-end.

use crate::logging::LogLine;
use crate::models::{ProbeResult, TrackLifecycle};

/// Outward notification from the player.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A file finished probing (track list) or could not be opened (message).
    ProbeCompleted(Result<ProbeResult, String>),
    /// Extraction progress of one track, in `[0, 1]`.
    TrackProgress { audio_index: usize, progress: f64 },
    /// A track changed lifecycle state.
    TrackStateChanged {
        audio_index: usize,
        lifecycle: TrackLifecycle,
        error: Option<String>,
    },
    /// Diagnostic line for the log panel.
    Log(LogLine),
}
