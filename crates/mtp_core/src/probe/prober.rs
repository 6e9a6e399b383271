//! Prober process invocation.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use super::errors::{ProbeError, ProbeOutcome};
use super::parse::parse_probe_output;
use crate::models::ProbeResult;

/// Runs the external prober and parses its JSON report.
#[derive(Debug, Clone)]
pub struct Prober {
    program: String,
}

impl Prober {
    /// Create a prober using the given executable (name or path).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The executable this prober runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build the prober argument list for `path`.
    pub fn args(path: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_streams".to_string(),
            "-show_format".to_string(),
            path.to_string_lossy().to_string(),
        ]
    }

    /// Probe a media file.
    ///
    /// Suspends the caller until the prober exits; other tasks keep running.
    pub async fn probe(&self, path: &Path) -> ProbeOutcome<ProbeResult> {
        if !path.exists() {
            return Err(ProbeError::FileNotFound(path.to_path_buf()));
        }

        let args = Self::args(path);
        tracing::debug!("$ {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                tool: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ProbeError::CommandFailed {
                tool: self.program.clone(),
                exit_code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let result = parse_probe_output(&output.stdout, path)?;
        tracing::info!(
            "Probed {}: {} audio track(s), duration {:?}",
            path.display(),
            result.track_count(),
            result.duration
        );
        Ok(result)
    }
}
