//! Per-track playback record and lifecycle state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Upper bound of the per-track volume (percent).
pub const MAX_VOLUME: u8 = 200;

/// Lifecycle of one audio track within a file session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackLifecycle {
    /// Never extracted, disabled.
    #[default]
    Idle,
    /// Enable requested with no cached decode; an encoder job is in flight.
    Extracting,
    /// Decoded output cached, track enabled and mixed.
    Ready,
    /// Was ready, then disabled by the user. Decode retained.
    DisabledCached,
    /// Extraction failed. Enabling again retries.
    Failed,
}

impl std::fmt::Display for TrackLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackLifecycle::Idle => write!(f, "idle"),
            TrackLifecycle::Extracting => write!(f, "extracting"),
            TrackLifecycle::Ready => write!(f, "ready"),
            TrackLifecycle::DisabledCached => write!(f, "disabled (cached)"),
            TrackLifecycle::Failed => write!(f, "failed"),
        }
    }
}

/// Mutable state of one audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Dense audio index this record belongs to.
    pub audio_index: usize,
    /// Whether the user wants this track audible.
    pub enabled: bool,
    /// Mute flag (independent of volume).
    pub muted: bool,
    /// Volume in percent, `0..=MAX_VOLUME`.
    pub volume: u8,
    /// Current lifecycle state.
    pub lifecycle: TrackLifecycle,
    /// Extraction progress in `[0, 1]`.
    pub progress: f64,
    /// Last extraction error, if any.
    pub error: Option<String>,
    /// Decoded PCM file, set once per session on first successful extraction.
    pub decoded_path: Option<PathBuf>,
}

impl TrackRecord {
    /// Create a fresh idle record.
    pub fn new(audio_index: usize, volume: u8) -> Self {
        Self {
            audio_index,
            enabled: false,
            muted: false,
            volume: volume.min(MAX_VOLUME),
            lifecycle: TrackLifecycle::Idle,
            progress: 0.0,
            error: None,
            decoded_path: None,
        }
    }

    /// Linear gain applied by the mixer: `0` when muted, else `volume / 100`.
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            f32::from(self.volume) / 100.0
        }
    }

    /// Whether this track participates in mixing and clock sync.
    pub fn is_mixing(&self) -> bool {
        self.enabled && self.lifecycle == TrackLifecycle::Ready
    }
}
