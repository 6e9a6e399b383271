//! Encoder process supervision for one audio track.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{JoinError, JoinHandle};

use super::errors::{ExtractionError, ExtractionOutcome};
use super::progress::ProgressParser;

/// Read size for the progress pipe.
const CHUNK_SIZE: usize = 4096;

/// Everything a spawned extraction needs, owned so the task is `'static`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionJob {
    /// Session generation the job belongs to.
    pub generation: u64,
    /// Dense audio index of the track being decoded.
    pub audio_index: usize,
    /// Source media file.
    pub source: PathBuf,
    /// Decoded PCM output path.
    pub output: PathBuf,
    /// Total duration for progress fractions, if known.
    pub total_duration: Option<f64>,
}

/// Message from an extraction task to the player.
#[derive(Debug)]
pub enum JobEvent {
    /// A new, higher progress fraction.
    Progress {
        generation: u64,
        audio_index: usize,
        fraction: f64,
    },
    /// The job ended. Sent exactly once per job.
    Finished {
        generation: u64,
        audio_index: usize,
        result: ExtractionOutcome<PathBuf>,
    },
}

impl JobEvent {
    /// Session generation of the originating job.
    pub fn generation(&self) -> u64 {
        match self {
            JobEvent::Progress { generation, .. } | JobEvent::Finished { generation, .. } => {
                *generation
            }
        }
    }

    /// Audio index of the originating job.
    pub fn audio_index(&self) -> usize {
        match self {
            JobEvent::Progress { audio_index, .. } | JobEvent::Finished { audio_index, .. } => {
                *audio_index
            }
        }
    }
}

/// Build the encoder argument list: one audio stream to stereo 48 kHz s16 PCM.
pub fn encoder_args(job: &ExtractionJob) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        job.source.to_string_lossy().to_string(),
        "-map".to_string(),
        format!("0:a:{}", job.audio_index),
        "-vn".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "-ar".to_string(),
        "48000".to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        job.output.to_string_lossy().to_string(),
    ]
}

/// Spawns encoder runs and reports their progress on a channel.
#[derive(Debug, Clone)]
pub struct Extractor {
    program: String,
    stderr_tail: usize,
    events: UnboundedSender<JobEvent>,
}

impl Extractor {
    /// Create an extractor.
    ///
    /// # Arguments
    /// * `program` - Encoder executable
    /// * `stderr_tail` - Number of stderr lines kept for the failure message
    /// * `events` - Channel receiving progress and completion events
    pub fn new(
        program: impl Into<String>,
        stderr_tail: usize,
        events: UnboundedSender<JobEvent>,
    ) -> Self {
        Self {
            program: program.into(),
            stderr_tail: stderr_tail.max(1),
            events,
        }
    }

    /// The encoder executable.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run `job` on the runtime. A `Finished` event is sent when it ends.
    pub fn start(&self, job: ExtractionJob) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let worker = this.clone();
            let worker_job = job.clone();
            let joined = tokio::spawn(async move { worker.run(&worker_job).await }).await;
            let result = join_outcome(joined);
            match &result {
                Ok(path) => tracing::info!(
                    "Track {} extracted to {}",
                    job.audio_index,
                    path.display()
                ),
                Err(e) => tracing::warn!("Track {} extraction failed: {}", job.audio_index, e),
            }
            // Receiver gone means the player shut down
            let _ = this.events.send(JobEvent::Finished {
                generation: job.generation,
                audio_index: job.audio_index,
                result,
            });
        })
    }

    /// Run the encoder for `job` to completion.
    ///
    /// Progress fractions are sent as they are parsed. Resolves to the output
    /// path on success.
    pub async fn run(&self, job: &ExtractionJob) -> ExtractionOutcome<PathBuf> {
        let args = encoder_args(job);
        tracing::debug!("$ {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExtractionError::Spawn {
                tool: self.program.clone(),
                source,
            })?;

        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(collect_tail(stderr, self.stderr_tail)));

        if let Some(mut stdout) = child.stdout.take() {
            let mut parser = ProgressParser::new(job.total_duration);
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                let n = stdout.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                for fraction in parser.feed(&buf[..n]) {
                    self.send_progress(job, fraction);
                }
            }
            for fraction in parser.finish() {
                self.send_progress(job, fraction);
            }
        }

        let status = child.wait().await?;

        let stderr = match stderr_task {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(ExtractionError::CommandFailed {
                audio_index: job.audio_index,
                exit_code: status.code().unwrap_or(-1),
                stderr,
            });
        }

        verify_output(&job.output).await?;
        Ok(job.output.clone())
    }

    fn send_progress(&self, job: &ExtractionJob, fraction: f64) {
        let _ = self.events.send(JobEvent::Progress {
            generation: job.generation,
            audio_index: job.audio_index,
            fraction,
        });
    }
}

/// A panicked or cancelled run still ends the job with an error.
fn join_outcome(
    joined: Result<ExtractionOutcome<PathBuf>, JoinError>,
) -> ExtractionOutcome<PathBuf> {
    joined.unwrap_or_else(|e| Err(ExtractionError::TaskAborted(e.to_string())))
}

/// Read a stream to the end, keeping the last `limit` non-empty lines.
async fn collect_tail<R: AsyncRead + Unpin>(reader: R, limit: usize) -> String {
    let mut lines = BufReader::new(reader).lines();
    let mut tail = VecDeque::with_capacity(limit);

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if tail.len() >= limit {
            tail.pop_front();
        }
        tail.push_back(line.to_string());
    }

    Vec::from(tail).join("\n")
}

/// The output must exist and contain data.
async fn verify_output(path: &Path) -> ExtractionOutcome<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(ExtractionError::OutputMissing(path.to_path_buf())),
    }
}
