//! Data models for the multi-track player.
//!
//! This module contains the core data structures shared by every component:
//! - Probe output (audio track descriptors, file-level metadata)
//! - Per-track playback records and their lifecycle state

mod media;
mod track;

// Re-export all public types
pub use media::{channel_layout_str, AudioTrackDescriptor, ProbeResult};
pub use track::{TrackLifecycle, TrackRecord, MAX_VOLUME};
