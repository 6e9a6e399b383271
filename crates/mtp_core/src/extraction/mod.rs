//! Extraction coordinator.
//!
//! Decodes one audio track at a time into a PCM file by running the external
//! encoder:
//!
//! - **Encoder invocation**: `encoder_args` maps `audio_index` to `-map 0:a:<n>`
//!   and writes stereo 48 kHz signed 16-bit PCM
//! - **Progress**: `ProgressParser` turns the encoder's `key=value` stream into
//!   bounded, non-decreasing fractions
//! - **Events**: each job reports `JobEvent`s tagged with its session generation
//!
//! Deduplication (one live job per audio index) is the track registry's job;
//! this module runs whatever it is handed.
//!
//! # Usage
//!
//! ```ignore
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let extractor = Extractor::new("ffmpeg", 20, tx);
//! extractor.start(ExtractionJob {
//!     generation: 1,
//!     audio_index: 0,
//!     source: "/media/movie.mkv".into(),
//!     output: session.track_output_path(0),
//!     total_duration: Some(1421.5),
//! });
//! while let Some(event) = rx.recv().await { /* ... */ }
//! ```

mod encoder;
mod errors;
mod progress;

pub use encoder::{encoder_args, ExtractionJob, Extractor, JobEvent};
pub use errors::{ExtractionError, ExtractionOutcome, ProgressParseError};
pub use progress::{parse_progress_line, ProgressLine, ProgressParser};
