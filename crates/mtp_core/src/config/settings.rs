//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::MAX_VOLUME;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Per-file session storage.
    #[serde(default)]
    pub session: SessionSettings,

    /// Clock synchronization tuning.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Playback defaults.
    #[serde(default)]
    pub playback: PlaybackSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.tools.prober.trim().is_empty() {
            return Err("tools.prober must not be empty".to_string());
        }
        if self.tools.encoder.trim().is_empty() {
            return Err("tools.encoder must not be empty".to_string());
        }
        if self.session.temp_prefix.is_empty() {
            return Err("session.temp_prefix must not be empty".to_string());
        }
        if self.sync.interval_ms == 0 {
            return Err("sync.interval_ms must be >= 1".to_string());
        }
        if self.sync.soft_threshold_secs < 0.0
            || self.sync.soft_threshold_secs >= self.sync.hard_threshold_secs
        {
            return Err(
                "sync.soft_threshold_secs must be >= 0 and below sync.hard_threshold_secs"
                    .to_string(),
            );
        }
        if !(self.sync.soft_rate_bias > 0.0 && self.sync.soft_rate_bias < 1.0) {
            return Err("sync.soft_rate_bias must be within (0, 1)".to_string());
        }
        if self.playback.default_volume > MAX_VOLUME {
            return Err(format!(
                "playback.default_volume must be <= {}",
                MAX_VOLUME
            ));
        }
        if !(self.playback.min_rate > 0.0 && self.playback.min_rate <= self.playback.max_rate) {
            return Err("playback.min_rate must be > 0 and <= playback.max_rate".to_string());
        }
        if self.playback.default_rate < self.playback.min_rate
            || self.playback.default_rate > self.playback.max_rate
        {
            return Err("playback.default_rate must lie within [min_rate, max_rate]".to_string());
        }
        if self.logging.progress_step == 0 {
            return Err("logging.progress_step must be >= 1".to_string());
        }
        Ok(())
    }
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Prober executable (stream metadata as JSON).
    #[serde(default = "default_prober")]
    pub prober: String,

    /// Encoder executable (decodes one audio stream to PCM).
    #[serde(default = "default_encoder")]
    pub encoder: String,
}

fn default_prober() -> String {
    "ffprobe".to_string()
}

fn default_encoder() -> String {
    "ffmpeg".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            prober: default_prober(),
            encoder: default_encoder(),
        }
    }
}

/// Session temp storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Name prefix of the per-file temp directory.
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,

    /// Root under which session directories are created.
    /// Empty means the OS temp directory.
    #[serde(default)]
    pub temp_root: String,
}

fn default_temp_prefix() -> String {
    "mtp-session-".to_string()
}

impl SessionSettings {
    /// Resolve the directory session folders are created in.
    pub fn resolved_temp_root(&self) -> PathBuf {
        if self.temp_root.trim().is_empty() {
            std::env::temp_dir()
        } else {
            PathBuf::from(&self.temp_root)
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            temp_prefix: default_temp_prefix(),
            temp_root: String::new(),
        }
    }
}

/// Drift-correction tuning for the clock synchronizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Correction tick interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Drift magnitude above which a track is hard-resynced (seconds).
    #[serde(default = "default_hard_threshold")]
    pub hard_threshold_secs: f64,

    /// Drift magnitude above which a soft rate bias is applied (seconds).
    #[serde(default = "default_soft_threshold")]
    pub soft_threshold_secs: f64,

    /// Fixed rate bias used for soft correction (0.03 = ±3%).
    #[serde(default = "default_soft_rate_bias")]
    pub soft_rate_bias: f64,
}

fn default_interval_ms() -> u64 {
    250
}

fn default_hard_threshold() -> f64 {
    0.25
}

fn default_soft_threshold() -> f64 {
    0.08
}

fn default_soft_rate_bias() -> f64 {
    0.03
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            hard_threshold_secs: default_hard_threshold(),
            soft_threshold_secs: default_soft_threshold(),
            soft_rate_bias: default_soft_rate_bias(),
        }
    }
}

/// Playback defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Volume given to freshly probed tracks (percent).
    #[serde(default = "default_volume")]
    pub default_volume: u8,

    /// Nominal playback rate at startup.
    #[serde(default = "default_rate")]
    pub default_rate: f32,

    /// Lowest accepted playback rate.
    #[serde(default = "default_min_rate")]
    pub min_rate: f32,

    /// Highest accepted playback rate.
    #[serde(default = "default_max_rate")]
    pub max_rate: f32,
}

fn default_volume() -> u8 {
    100
}

fn default_rate() -> f32 {
    1.0
}

fn default_min_rate() -> f32 {
    0.25
}

fn default_max_rate() -> f32 {
    4.0
}

impl PlaybackSettings {
    /// Clamp a requested rate into the configured bounds.
    pub fn clamp_rate(&self, rate: f32) -> f32 {
        if rate.is_finite() {
            rate.clamp(self.min_rate, self.max_rate)
        } else {
            self.default_rate
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            default_rate: default_rate(),
            min_rate: default_min_rate(),
            max_rate: default_max_rate(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level for the application log.
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format (progress filtered to steps).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Number of encoder diagnostic lines kept for error messages.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_true() -> bool {
    true
}

fn default_progress_step() -> u32 {
    20
}

fn default_error_tail() -> u32 {
    20
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            progress_step: default_progress_step(),
            error_tail: default_error_tail(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Tools,
    Session,
    Sync,
    Playback,
    Logging,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Tools,
        ConfigSection::Session,
        ConfigSection::Sync,
        ConfigSection::Playback,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Tools => "tools",
            ConfigSection::Session => "session",
            ConfigSection::Sync => "sync",
            ConfigSection::Playback => "playback",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section in a generated file.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Tools => "# External prober/encoder executables",
            ConfigSection::Session => "# Per-file temp storage for decoded audio",
            ConfigSection::Sync => "# Audio-to-video clock synchronization",
            ConfigSection::Playback => "# Playback defaults",
            ConfigSection::Logging => "# Logging configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[tools]"));
        assert!(toml.contains("[sync]"));
        assert!(toml.contains("interval_ms = 250"));
    }

    #[test]
    fn default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[tools]\nencoder = \"/opt/ffmpeg/bin/ffmpeg\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.tools.encoder, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(parsed.tools.prober, "ffprobe");
        assert_eq!(parsed.sync.interval_ms, 250);
        assert!((parsed.sync.soft_rate_bias - 0.03).abs() < 1e-12);
        assert_eq!(parsed.playback.default_volume, 100);
    }

    #[test]
    fn validate_rejects_inverted_thresholds() {
        let mut settings = Settings::default();
        settings.sync.soft_threshold_secs = 0.3;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_loud_default_volume() {
        let mut settings = Settings::default();
        settings.playback.default_volume = 201;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn clamp_rate_respects_bounds() {
        let playback = PlaybackSettings::default();
        assert_eq!(playback.clamp_rate(10.0), 4.0);
        assert_eq!(playback.clamp_rate(0.0), 0.25);
        assert_eq!(playback.clamp_rate(f32::NAN), 1.0);
    }
}
