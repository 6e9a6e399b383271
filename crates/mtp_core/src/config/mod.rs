//! Configuration management for the multi-track player.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use mtp_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Encoder: {}", config.settings().tools.encoder);
//!
//! config.settings_mut().sync.interval_ms = 200;
//! config.update_section(ConfigSection::Sync).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, LoggingSettings, PlaybackSettings, SessionSettings, Settings, SyncSettings,
    ToolSettings,
};
