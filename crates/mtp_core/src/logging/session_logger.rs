//! Per-session diagnostic logger with event-channel output.
//!
//! Each opened file gets diagnostics that:
//! - Go to the application `tracing` subscriber
//! - Are forwarded as `PlayerEvent::Log` lines to the front-end
//! - Support compact mode with per-track progress filtering
//! - Keep a tail buffer of external-tool output for error diagnosis

use std::collections::{HashMap, VecDeque};

use chrono::Local;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use super::types::{LogConfig, LogLevel, LogLine, MessagePrefix};
use crate::player::PlayerEvent;

/// Diagnostic logger shared by the player's components.
pub struct SessionLogger {
    /// Label prepended to tracing output (usually the file name).
    label: Mutex<String>,
    /// Outward event channel.
    events: Option<UnboundedSender<PlayerEvent>>,
    /// Logging configuration.
    config: LogConfig,
    /// Last progress percentage logged per audio index (compact filtering).
    last_progress: Mutex<HashMap<usize, u32>>,
    /// Most recent external-tool output lines.
    tail_buffer: Mutex<VecDeque<String>>,
}

impl SessionLogger {
    /// Create a new session logger.
    ///
    /// # Arguments
    /// * `config` - Logging configuration
    /// * `events` - Optional channel receiving `PlayerEvent::Log` lines
    pub fn new(config: LogConfig, events: Option<UnboundedSender<PlayerEvent>>) -> Self {
        Self {
            label: Mutex::new(String::new()),
            events,
            last_progress: Mutex::new(HashMap::new()),
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
        }
    }

    /// Start a new session: set the label and forget progress history.
    pub fn begin_session(&self, label: impl Into<String>) {
        *self.label.lock() = label.into();
        self.last_progress.lock().clear();
        self.tail_buffer.lock().clear();
    }

    /// Current session label.
    pub fn label(&self) -> String {
        self.label.lock().clone()
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        self.trace_event(level, message);

        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        if let Some(ref events) = self.events {
            let _ = events.send(PlayerEvent::Log(LogLine {
                level,
                message: formatted,
            }));
        }
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Log a warning message.
    pub fn warn(&self, message: &str) {
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    /// Log an error message.
    pub fn error(&self, message: &str) {
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log an external command being executed.
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        self.log(LogLevel::Debug, &msg);
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        let msg = MessagePrefix::Phase.format(phase_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a success message.
    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Log extraction progress for one track (filtered in compact mode).
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, audio_index: usize, fraction: f64) -> bool {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32;

        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);
            let previous = last.get(&audio_index).copied();

            // Only log at step intervals (e.g., 0%, 20%, 40%, ...)
            let current_step = (percent / step) * step;
            if let Some(prev) = previous {
                let last_step = (prev / step) * step;
                if current_step <= last_step && (percent < 100 || prev >= 100) {
                    return false;
                }
            }
            last.insert(audio_index, percent);
        }

        let msg = format!("Track #{} extraction: {}%", audio_index, percent);
        self.log(LogLevel::Info, &msg);
        true
    }

    /// Record a line of external-tool output.
    ///
    /// In compact mode, these only go to the tail buffer.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail > 0 {
                if buffer.len() >= self.config.error_tail {
                    buffer.pop_front();
                }
                buffer.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        self.log(LogLevel::Debug, &format!("{}{}", prefix, line));
    }

    /// Emit the tail buffer as error lines (typically after a failure).
    pub fn show_tail(&self, header: &str) {
        let lines: Vec<String> = self.tail_buffer.lock().drain(..).collect();
        if lines.is_empty() {
            return;
        }

        self.log(LogLevel::Error, &format!("[{}/tail]", header));
        for line in &lines {
            self.log(LogLevel::Error, line);
        }
    }

    /// Format a message with timestamp (if enabled).
    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    /// Mirror a message into the tracing subscriber.
    fn trace_event(&self, level: LogLevel, message: &str) {
        let label = self.label.lock();
        match level {
            LogLevel::Trace => tracing::trace!(session = %label, "{}", message),
            LogLevel::Debug => tracing::debug!(session = %label, "{}", message),
            LogLevel::Info => tracing::info!(session = %label, "{}", message),
            LogLevel::Warn => tracing::warn!(session = %label, "{}", message),
            LogLevel::Error => tracing::error!(session = %label, "{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<PlayerEvent>) -> Vec<LogLine> {
        let mut lines = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let PlayerEvent::Log(line) = event {
                lines.push(line);
            }
        }
        lines
    }

    #[test]
    fn forwards_lines_to_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        };
        let logger = SessionLogger::new(config, Some(tx));

        logger.info("Opened file");
        logger.error("Invalid stream");

        let lines = drain(&mut rx);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "Opened file");
        assert_eq!(lines[1].level, LogLevel::Error);
        assert_eq!(lines[1].message, "[ERROR] Invalid stream");
    }

    #[test]
    fn level_filter_drops_debug() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let logger = SessionLogger::new(LogConfig::default(), Some(tx));

        logger.debug("noisy");
        logger.command("ffmpeg -y -i in.mkv");

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn compact_mode_filters_progress_per_track() {
        let logger = SessionLogger::new(LogConfig::default(), None);

        assert!(logger.progress(0, 0.05));
        assert!(!logger.progress(0, 0.10));
        assert!(!logger.progress(0, 0.15));
        assert!(logger.progress(0, 0.20));
        assert!(!logger.progress(0, 0.25));

        // Other tracks have their own history
        assert!(logger.progress(1, 0.10));

        assert!(logger.progress(0, 1.0));
        assert!(!logger.progress(0, 1.0));
    }

    #[test]
    fn tail_buffer_keeps_latest_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = LogConfig {
            error_tail: 2,
            show_timestamps: false,
            ..LogConfig::default()
        };
        let logger = SessionLogger::new(config, Some(tx));

        logger.output_line("first", true);
        logger.output_line("second", true);
        logger.output_line("Invalid stream", true);
        assert!(drain(&mut rx).is_empty());

        logger.show_tail("track 1");
        let lines = drain(&mut rx);
        let texts: Vec<&str> = lines.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(texts, vec!["[track 1/tail]", "second", "Invalid stream"]);

        // Drained after showing
        logger.show_tail("track 1");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn begin_session_resets_progress_history() {
        let logger = SessionLogger::new(LogConfig::default(), None);
        assert!(logger.progress(0, 0.5));
        assert!(!logger.progress(0, 0.5));

        logger.begin_session("movie.mkv");
        assert!(logger.progress(0, 0.5));
        assert_eq!(logger.label(), "movie.mkv");
    }
}
