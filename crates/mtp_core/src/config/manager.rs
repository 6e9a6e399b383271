//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only modified section is changed)
//! - Validation on load (unknown tables and missing keys trigger a rewrite)
//! - Preserves comments and formatting with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
///
/// Handles loading, saving, and atomic section-level updates.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to the current settings.
    ///
    /// Note: Changes made here are only in memory until `save()` or
    /// `update_section()` is called.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file.
    ///
    /// Returns error if file doesn't exist or fails validation.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate().map_err(ConfigError::Invalid)?;
        self.settings = settings;
        Ok(())
    }

    /// Load config from file, creating with defaults if it doesn't exist.
    ///
    /// Also cleans up the config, saving if changes were made.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = self.parse_and_clean(&content)?;
            settings.validate().map_err(ConfigError::Invalid)?;
            self.settings = settings;

            if was_modified {
                self.save()?;
            }
        } else {
            if let Some(parent) = self.config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Get the logs folder path.
    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.logging.logs_folder)
    }

    /// Parse config content and detect whether it needs rewriting.
    ///
    /// Returns the settings and whether any modifications were made.
    fn parse_and_clean(&self, content: &str) -> ConfigResult<(Settings, bool)> {
        let doc: DocumentMut = content.parse()?;

        // Missing fields pick up their defaults here
        let settings: Settings = toml::from_str(content)?;

        let has_unknown = doc.iter().any(|(key, _)| {
            !ConfigSection::ALL
                .iter()
                .any(|section| section.table_name() == key)
        });

        let has_missing = ConfigSection::ALL.iter().any(|section| {
            match (doc.get(section.table_name()), self.section_keys(&settings, *section)) {
                (Some(Item::Table(table)), Ok(keys)) => {
                    keys.iter().any(|k| !table.contains_key(k))
                }
                _ => true,
            }
        });

        Ok((settings, has_unknown || has_missing))
    }

    /// Keys a fully populated section would contain.
    fn section_keys(&self, settings: &Settings, section: ConfigSection) -> ConfigResult<Vec<String>> {
        let doc: DocumentMut = section_toml(settings, section)?.parse()?;
        Ok(doc.iter().map(|(k, _)| k.to_string()).collect())
    }

    /// Save the entire config atomically.
    ///
    /// Writes to a temp file first, then renames to ensure atomic write.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Update a specific section atomically.
    ///
    /// This re-reads the file from disk, updates only the specified section,
    /// and writes back atomically. Other sections keep their on-disk content.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_doc: DocumentMut = section_toml(&self.settings, section)?.parse()?;
        let section_table = section_doc.as_table().clone();

        doc[section.table_name()] = Item::Table(section_table);

        self.atomic_write(&doc.to_string())?;

        Ok(())
    }

    /// Generate config content with helpful comments.
    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();

        output.push_str("# Multi-Track Player Configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n\n",
        );

        for (i, section) in ConfigSection::ALL.iter().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            output.push_str(section.comment());
            output.push('\n');
            output.push_str(&format!("[{}]\n", section.table_name()));
            for line in section_toml(&self.settings, *section)?.lines() {
                output.push_str(line);
                output.push('\n');
            }
        }

        Ok(output)
    }

    /// Write content to config file atomically.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Temp file in the same directory so the rename stays atomic
        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

/// Serialize one section's body (without the table header).
fn section_toml(settings: &Settings, section: ConfigSection) -> ConfigResult<String> {
    let body = match section {
        ConfigSection::Tools => toml::to_string_pretty(&settings.tools)?,
        ConfigSection::Session => toml::to_string_pretty(&settings.session)?,
        ConfigSection::Sync => toml::to_string_pretty(&settings.sync)?,
        ConfigSection::Playback => toml::to_string_pretty(&settings.playback)?,
        ConfigSection::Logging => toml::to_string_pretty(&settings.logging)?,
    };
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[tools]"));
        assert!(content.contains("[sync]"));
        assert!(content.contains("[logging]"));
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        fs::write(&config_path, "[tools]\nencoder = \"/usr/local/bin/ffmpeg\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().tools.encoder, "/usr/local/bin/ffmpeg");

        // Missing sections were filled in on disk
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[playback]"));
        assert!(content.contains("/usr/local/bin/ffmpeg"));
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");
        fs::write(&config_path, "[sync]\ninterval_ms = 0\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        let result = manager.load();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        manager.settings_mut().logging.compact = false;
        manager.settings_mut().tools.encoder = "not-written".to_string();

        manager.update_section(ConfigSection::Logging).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("compact = false"));
        assert!(!content.contains("not-written"));
        assert!(content.contains("[tools]"));
    }

    #[test]
    fn atomic_write_creates_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let temp_path = config_path.with_extension("toml.tmp");
        assert!(!temp_path.exists());
    }
}
