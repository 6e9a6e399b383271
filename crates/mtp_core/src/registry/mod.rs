//! Track registry: per-track state and the lifecycle state machine.
//!
//! The registry is pure data. Each transition returns an action telling the
//! caller what side effect to perform (start a job, attach a mix chain...),
//! so the rules here are testable without processes or audio devices.
//!
//! ```text
//! Idle/Failed --enable--> Extracting --ok--> Ready <--enable-- DisabledCached
//!                             |                |                    ^
//!                             +--err--> Failed +------disable-------+
//! ```

use std::path::{Path, PathBuf};

use crate::models::{ProbeResult, TrackLifecycle, TrackRecord, MAX_VOLUME};

/// What the caller must do after an enable request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnableAction {
    /// No cached decode: spawn an extraction job.
    StartExtraction,
    /// A job for this track is already in flight; wait for it.
    AwaitingExtraction,
    /// Decode is cached: attach (or resume) its mix chain.
    Attach(PathBuf),
    /// Already enabled and mixed.
    AlreadyActive,
}

/// What the caller must do after a disable request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableAction {
    /// Pause the track's mix chain.
    Detach,
    /// Job still running; its result will be cached but not mixed.
    Deferred,
    /// Nothing was playing.
    NoOp,
}

/// Outcome of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Track is enabled: attach the decode to the mixer.
    Mix(PathBuf),
    /// Track was disabled meanwhile: decode is cached only.
    CacheOnly,
}

/// Owns one `TrackRecord` per probed audio track, indexed by `audio_index`.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    records: Vec<TrackRecord>,
}

impl TrackRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all records with fresh idle ones for `probe`'s tracks.
    pub fn seed(&mut self, probe: &ProbeResult, default_volume: u8) {
        self.records = probe
            .audio_tracks
            .iter()
            .map(|t| TrackRecord::new(t.audio_index, default_volume))
            .collect();
    }

    /// Drop every record (session closed).
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no tracks are registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for one track.
    pub fn record(&self, audio_index: usize) -> Option<&TrackRecord> {
        self.records.get(audio_index)
    }

    /// All records in audio-index order.
    pub fn records(&self) -> &[TrackRecord] {
        &self.records
    }

    /// Handle a user enable request.
    ///
    /// Never yields `StartExtraction` for a track that has a cached decode or
    /// a job in flight.
    pub fn request_enable(&mut self, audio_index: usize) -> Option<EnableAction> {
        let record = self.records.get_mut(audio_index)?;

        let action = match record.lifecycle {
            TrackLifecycle::Ready if record.enabled => EnableAction::AlreadyActive,
            TrackLifecycle::Extracting => {
                record.enabled = true;
                EnableAction::AwaitingExtraction
            }
            _ => match record.decoded_path.clone() {
                Some(path) => {
                    record.enabled = true;
                    record.error = None;
                    record.lifecycle = TrackLifecycle::Ready;
                    EnableAction::Attach(path)
                }
                None => {
                    record.enabled = true;
                    record.error = None;
                    record.progress = 0.0;
                    record.lifecycle = TrackLifecycle::Extracting;
                    EnableAction::StartExtraction
                }
            },
        };
        Some(action)
    }

    /// Handle a user disable request.
    pub fn request_disable(&mut self, audio_index: usize) -> Option<DisableAction> {
        let record = self.records.get_mut(audio_index)?;
        let was_enabled = record.enabled;
        record.enabled = false;

        let action = match record.lifecycle {
            TrackLifecycle::Ready => {
                record.lifecycle = TrackLifecycle::DisabledCached;
                DisableAction::Detach
            }
            TrackLifecycle::Extracting if was_enabled => DisableAction::Deferred,
            _ => DisableAction::NoOp,
        };
        Some(action)
    }

    /// Record a progress fraction for an in-flight job.
    ///
    /// Returns the stored value when it advanced. Ignored unless the track is
    /// extracting; values never decrease.
    pub fn apply_progress(&mut self, audio_index: usize, fraction: f64) -> Option<f64> {
        let record = self.records.get_mut(audio_index)?;
        if record.lifecycle != TrackLifecycle::Extracting || !fraction.is_finite() {
            return None;
        }

        let fraction = fraction.clamp(0.0, 1.0);
        if fraction <= record.progress {
            return None;
        }
        record.progress = fraction;
        Some(fraction)
    }

    /// Finish a job successfully.
    ///
    /// Returns `None` if the track was not extracting (stale result).
    pub fn complete_extraction(&mut self, audio_index: usize, path: &Path) -> Option<Completion> {
        let record = self.records.get_mut(audio_index)?;
        if record.lifecycle != TrackLifecycle::Extracting {
            return None;
        }

        record.progress = 1.0;
        record.error = None;
        let cached = record
            .decoded_path
            .get_or_insert_with(|| path.to_path_buf())
            .clone();

        if record.enabled {
            record.lifecycle = TrackLifecycle::Ready;
            Some(Completion::Mix(cached))
        } else {
            record.lifecycle = TrackLifecycle::DisabledCached;
            Some(Completion::CacheOnly)
        }
    }

    /// Finish a job with an error. Returns false for a stale result.
    pub fn fail_extraction(&mut self, audio_index: usize, message: impl Into<String>) -> bool {
        match self.records.get_mut(audio_index) {
            Some(record) if record.lifecycle == TrackLifecycle::Extracting => {
                record.lifecycle = TrackLifecycle::Failed;
                record.enabled = false;
                record.error = Some(message.into());
                true
            }
            _ => false,
        }
    }

    /// Mark a track failed outside extraction (e.g. its decode cannot be played).
    ///
    /// A cached decode is kept so re-enabling retries the attach.
    pub fn mark_failed(&mut self, audio_index: usize, message: impl Into<String>) -> bool {
        match self.records.get_mut(audio_index) {
            Some(record) => {
                record.lifecycle = TrackLifecycle::Failed;
                record.enabled = false;
                record.error = Some(message.into());
                true
            }
            None => false,
        }
    }

    /// Set volume (clamped to `0..=MAX_VOLUME`). Returns the new gain.
    pub fn set_volume(&mut self, audio_index: usize, volume: u32) -> Option<f32> {
        let record = self.records.get_mut(audio_index)?;
        record.volume = volume.min(u32::from(MAX_VOLUME)) as u8;
        Some(record.gain())
    }

    /// Set the mute flag. Returns the new gain.
    pub fn set_muted(&mut self, audio_index: usize, muted: bool) -> Option<f32> {
        let record = self.records.get_mut(audio_index)?;
        record.muted = muted;
        Some(record.gain())
    }

    /// Flip the mute flag. Returns the new flag.
    pub fn toggle_muted(&mut self, audio_index: usize) -> Option<bool> {
        let record = self.records.get_mut(audio_index)?;
        record.muted = !record.muted;
        Some(record.muted)
    }

    /// Current gain of one track.
    pub fn gain(&self, audio_index: usize) -> Option<f32> {
        self.records.get(audio_index).map(TrackRecord::gain)
    }

    /// Tracks that are enabled and ready: the set the mixer and
    /// synchronizer operate on.
    pub fn mixing_indices(&self) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| r.is_mixing())
            .map(|r| r.audio_index)
            .collect()
    }
}
