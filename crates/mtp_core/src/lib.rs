//! MTP Core - Backend logic for the multi-track player
//!
//! Plays any subset of a video file's audio tracks, each decoded once to PCM
//! by an external encoder, mixed with independent volume/mute, and kept
//! locked to the video's playback clock.
//!
//! This crate contains all logic with zero UI dependencies. Front-ends drive
//! a [`player::Player`] and listen to its [`player::PlayerEvent`]s.

pub mod config;
pub mod extraction;
pub mod logging;
pub mod mixer;
pub mod models;
pub mod player;
pub mod probe;
pub mod registry;
pub mod session;
pub mod sync;

#[cfg(test)]
mod testing;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
