//! `rodio` backend: one `Sink` per track on a shared output stream.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

use super::{ChainFactory, MixerError, PlaybackChain};

/// Default audio device. Every chain's sink connects to its mixer.
pub struct RodioOutput {
    stream: OutputStream,
}

impl RodioOutput {
    /// Open the system default output device.
    pub fn open_default() -> Result<Self, MixerError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| MixerError::DeviceUnavailable(e.to_string()))?;
        // rodio prints to stderr when the stream is dropped
        stream.log_on_drop(false);
        Ok(Self { stream })
    }
}

impl ChainFactory for RodioOutput {
    type Chain = RodioChain;

    fn open(&self, path: &Path) -> Result<RodioChain, MixerError> {
        RodioChain::new(Sink::connect_new(self.stream.mixer()), path)
    }
}

fn decode(path: &Path) -> Result<Decoder<BufReader<File>>, MixerError> {
    let file = File::open(path).map_err(|source| MixerError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    // `try_from` records the byte length, which makes the decoder seekable
    Decoder::try_from(file).map_err(|e| MixerError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Chain backed by a `rodio::Sink`; the sink volume is the gain stage.
///
/// `Sink::get_pos` advances at output speed, not source speed. Source time is
/// kept as an anchor pair taken at the last seek or speed change:
/// `source_anchor + (get_pos - sink_anchor) * speed`.
pub struct RodioChain {
    sink: Sink,
    path: PathBuf,
    source_anchor: f64,
    sink_anchor: f64,
}

impl RodioChain {
    /// Queue the decoded file on `sink`, paused at the start.
    fn new(sink: Sink, path: &Path) -> Result<Self, MixerError> {
        sink.pause();
        let mut chain = Self {
            sink,
            path: path.to_path_buf(),
            source_anchor: 0.0,
            sink_anchor: 0.0,
        };
        chain.requeue()?;
        Ok(chain)
    }

    fn requeue(&mut self) -> Result<(), MixerError> {
        self.sink.append(decode(&self.path)?);
        self.source_anchor = 0.0;
        self.sink_anchor = 0.0;
        Ok(())
    }

    fn sink_pos(&self) -> f64 {
        self.sink.get_pos().as_secs_f64()
    }

    fn current_speed(&self) -> f64 {
        f64::from(self.sink.speed()).max(f64::EPSILON)
    }
}

impl PlaybackChain for RodioChain {
    fn start(&mut self) -> Result<(), MixerError> {
        if self.sink.empty() {
            // Source ran out; queue it again from the start
            self.requeue()?;
        }
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn position(&self) -> f64 {
        let elapsed = self.sink_pos() - self.sink_anchor;
        (self.source_anchor + elapsed * self.current_speed()).max(0.0)
    }

    fn seek(&mut self, secs: f64) -> Result<(), MixerError> {
        if self.sink.empty() {
            self.requeue()?;
        }
        let target = secs.max(0.0);
        // The sink scales seek targets by its speed
        let sink_target = target / self.current_speed();
        self.sink
            .try_seek(Duration::from_secs_f64(sink_target))
            .map_err(|e| MixerError::Seek(e.to_string()))?;
        self.source_anchor = target;
        self.sink_anchor = sink_target;
        Ok(())
    }

    fn set_speed(&mut self, speed: f32) {
        if speed == self.sink.speed() {
            return;
        }
        self.source_anchor = self.position();
        self.sink_anchor = self.sink_pos();
        self.sink.set_speed(speed);
    }

    fn speed(&self) -> f32 {
        self.sink.speed()
    }

    fn set_gain(&mut self, gain: f32) {
        self.sink.set_volume(gain);
    }

    fn gain(&self) -> f32 {
        self.sink.volume()
    }
}
