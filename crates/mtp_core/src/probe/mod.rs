//! Probe coordinator.
//!
//! Invokes the external prober on a media file and turns its JSON report
//! into a [`ProbeResult`](crate::models::ProbeResult) holding only the audio
//! streams, each with a dense `audio_index`.

mod errors;
mod parse;
mod prober;

pub use errors::{ProbeError, ProbeOutcome};
pub use parse::parse_probe_output;
pub use prober::Prober;
