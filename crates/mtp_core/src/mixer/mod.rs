//! Mixer: one playback chain per enabled, decoded track.
//!
//! A chain is a playback source bound to a decoded file plus a gain stage.
//! All chains feed one shared output, so enabled tracks are summed. Chains
//! live in an arena indexed by `audio_index` and are created lazily on first
//! attach. Disabling pauses a chain; it is only destroyed on `teardown`.

mod rodio_output;

pub use rodio_output::{RodioChain, RodioOutput};

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from the audio output layer.
#[derive(Error, Debug)]
pub enum MixerError {
    #[error("Audio output unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to open decoded audio {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Seek failed: {0}")]
    Seek(String),
}

/// One playback source plus gain stage connected to the shared output.
///
/// Times are in seconds of source position.
pub trait PlaybackChain {
    /// Start (or resume) playback.
    fn start(&mut self) -> Result<(), MixerError>;
    /// Pause playback, keeping position.
    fn pause(&mut self);
    /// Whether the chain is paused.
    fn is_paused(&self) -> bool;
    /// Current source position.
    fn position(&self) -> f64;
    /// Jump to a source position.
    fn seek(&mut self, secs: f64) -> Result<(), MixerError>;
    /// Set the playback rate (1.0 = nominal).
    fn set_speed(&mut self, speed: f32);
    /// Current playback rate.
    fn speed(&self) -> f32;
    /// Set the linear gain.
    fn set_gain(&mut self, gain: f32);
    /// Current linear gain.
    fn gain(&self) -> f32;
}

/// Opens decoded files as paused chains on the shared output.
pub trait ChainFactory {
    type Chain: PlaybackChain;

    /// Open `path` into a new, paused chain.
    fn open(&self, path: &Path) -> Result<Self::Chain, MixerError>;
}

/// Live chain of one track.
#[derive(Debug)]
pub struct MixNode<C> {
    /// Track this chain plays.
    pub audio_index: usize,
    /// Decoded file the chain reads.
    pub path: PathBuf,
    /// The chain itself.
    pub chain: C,
}

/// Arena of mix chains indexed by `audio_index`.
pub struct Mixer<F: ChainFactory> {
    factory: F,
    nodes: Vec<Option<MixNode<F::Chain>>>,
}

impl<F: ChainFactory> Mixer<F> {
    /// Create an empty mixer on top of `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            nodes: Vec::new(),
        }
    }

    /// Attach a decoded track, creating its chain on first use.
    ///
    /// An existing chain for the same file is reused (re-enable resumes
    /// without rebuilding). The returned chain is paused.
    pub fn attach(
        &mut self,
        audio_index: usize,
        path: &Path,
        gain: f32,
    ) -> Result<&mut F::Chain, MixerError> {
        if self.nodes.len() <= audio_index {
            self.nodes.resize_with(audio_index + 1, || None);
        }

        let reusable = matches!(&self.nodes[audio_index], Some(node) if node.path == path);
        if !reusable {
            let chain = self.factory.open(path)?;
            tracing::debug!("Created mix chain for track {}", audio_index);
            if let Some(old) = self.nodes[audio_index].replace(MixNode {
                audio_index,
                path: path.to_path_buf(),
                chain,
            }) {
                let mut old_chain = old.chain;
                old_chain.pause();
            }
        }

        match self.nodes[audio_index].as_mut() {
            Some(node) => {
                node.chain.set_gain(gain);
                Ok(&mut node.chain)
            }
            None => Err(MixerError::DeviceUnavailable(format!(
                "no chain for track {}",
                audio_index
            ))),
        }
    }

    /// Pause a track's chain. Returns false if it has none.
    pub fn pause_track(&mut self, audio_index: usize) -> bool {
        match self.node_mut(audio_index) {
            Some(node) => {
                node.chain.pause();
                true
            }
            None => false,
        }
    }

    /// Apply a new gain immediately. Returns false if the track has no chain.
    pub fn set_gain(&mut self, audio_index: usize, gain: f32) -> bool {
        match self.node_mut(audio_index) {
            Some(node) => {
                node.chain.set_gain(gain);
                true
            }
            None => false,
        }
    }

    /// Whether a chain exists for this track.
    pub fn has_chain(&self, audio_index: usize) -> bool {
        matches!(self.nodes.get(audio_index), Some(Some(_)))
    }

    /// Node of one track.
    pub fn node(&self, audio_index: usize) -> Option<&MixNode<F::Chain>> {
        self.nodes.get(audio_index).and_then(Option::as_ref)
    }

    /// Mutable node of one track.
    pub fn node_mut(&mut self, audio_index: usize) -> Option<&mut MixNode<F::Chain>> {
        self.nodes.get_mut(audio_index).and_then(Option::as_mut)
    }

    /// Chains of the given tracks, in arena order. Tracks without a chain are skipped.
    pub fn active_nodes_mut<'a>(
        &'a mut self,
        indices: &'a [usize],
    ) -> impl Iterator<Item = &'a mut MixNode<F::Chain>> + 'a {
        self.nodes
            .iter_mut()
            .filter_map(Option::as_mut)
            .filter(move |node| indices.contains(&node.audio_index))
    }

    /// Number of live chains.
    pub fn chain_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Destroy one track's chain.
    pub fn remove(&mut self, audio_index: usize) {
        if let Some(slot) = self.nodes.get_mut(audio_index) {
            if let Some(mut node) = slot.take() {
                node.chain.pause();
            }
        }
    }

    /// Stop and destroy every chain.
    pub fn teardown(&mut self) {
        for mut node in self.nodes.drain(..).flatten() {
            node.chain.pause();
        }
    }
}
