//! Media-related data structures (probe results, audio track descriptors).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One audio elementary stream found in the source container.
///
/// `audio_index` is the stable public identity of the track. It is dense
/// (0..N-1) and assigned in stream-scan order, independent of the
/// container's native stream numbering kept in `stream_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrackDescriptor {
    /// Dense audio index (0-based, scan order).
    pub audio_index: usize,
    /// Native container stream index (informational only).
    pub stream_index: Option<usize>,
    /// Codec name as reported by the prober (e.g., "aac", "ac3").
    pub codec_name: Option<String>,
    /// Number of audio channels.
    pub channels: Option<u32>,
    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Bit rate in bits/second.
    pub bit_rate: Option<u64>,
    /// Stream tags (language, title, handler name...).
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl AudioTrackDescriptor {
    /// Create a descriptor with only the identity fields set.
    pub fn new(audio_index: usize, stream_index: Option<usize>) -> Self {
        Self {
            audio_index,
            stream_index,
            codec_name: None,
            channels: None,
            sample_rate: None,
            bit_rate: None,
            tags: BTreeMap::new(),
        }
    }

    /// Language tag, if the container declares one.
    pub fn language(&self) -> Option<&str> {
        self.tags.get("language").map(String::as_str)
    }

    /// Title tag, if the container declares one.
    pub fn title(&self) -> Option<&str> {
        self.tags.get("title").map(String::as_str)
    }

    /// Build a one-line description for the track panel.
    pub fn display_name(&self) -> String {
        let codec = self.codec_name.as_deref().unwrap_or("unknown");
        let lang = self.language().unwrap_or("und");
        let title = self
            .title()
            .map(|t| format!(" '{}'", t))
            .unwrap_or_default();

        let base_info = format!("#{} {} ({}){}", self.audio_index, codec, lang, title);
        let mut details = Vec::new();

        if let Some(sr) = self.sample_rate {
            details.push(format!("{} Hz", sr));
        }

        if let Some(ch) = self.channels {
            let layout = channel_layout_str(ch);
            if layout.is_empty() {
                details.push(format!("{} ch", ch));
            } else {
                details.push(format!("{} ch ({})", ch, layout));
            }
        }

        if let Some(br) = self.bit_rate {
            details.push(format!("{} kb/s", br / 1000));
        }

        if details.is_empty() {
            base_info
        } else {
            format!("{} | {}", base_info, details.join(", "))
        }
    }
}

/// Get channel layout string from channel count.
pub fn channel_layout_str(channels: u32) -> &'static str {
    match channels {
        1 => "Mono",
        2 => "Stereo",
        6 => "5.1",
        8 => "7.1",
        _ => "",
    }
}

/// Structured result of probing one media file.
///
/// Created once per opened file and replaced wholesale on the next open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Path of the probed file.
    pub file_path: PathBuf,
    /// Total duration in seconds, if the prober reported a usable value.
    pub duration: Option<f64>,
    /// Short format name(s) (e.g., "matroska,webm").
    pub format_name: Option<String>,
    /// Long format name (e.g., "Matroska / WebM").
    pub format_long_name: Option<String>,
    /// Audio tracks in audio-index order.
    pub audio_tracks: Vec<AudioTrackDescriptor>,
}

impl ProbeResult {
    /// Get an audio track by its dense audio index.
    pub fn audio_track(&self, audio_index: usize) -> Option<&AudioTrackDescriptor> {
        self.audio_tracks.get(audio_index)
    }

    /// Duration usable as a progress denominator (strictly positive).
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Number of audio tracks.
    pub fn track_count(&self) -> usize {
        self.audio_tracks.len()
    }
}
