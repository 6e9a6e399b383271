//! Test doubles shared by unit tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::mixer::{ChainFactory, MixerError, PlaybackChain};
use crate::sync::MasterClock;

/// In-memory chain. Position only moves on seek.
#[derive(Debug, Clone)]
pub struct FakeChain {
    pub path: PathBuf,
    pub paused: bool,
    pub position: f64,
    pub speed: f32,
    pub gain: f32,
    pub fail_start: bool,
    pub fail_seek: bool,
}

impl FakeChain {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            paused: true,
            position: 0.0,
            speed: 1.0,
            gain: 1.0,
            fail_start: false,
            fail_seek: false,
        }
    }
}

impl PlaybackChain for FakeChain {
    fn start(&mut self) -> Result<(), MixerError> {
        if self.fail_start {
            return Err(MixerError::DeviceUnavailable("start refused".to_string()));
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn seek(&mut self, secs: f64) -> Result<(), MixerError> {
        if self.fail_seek {
            return Err(MixerError::Seek("not seekable".to_string()));
        }
        self.position = secs.max(0.0);
        Ok(())
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    fn gain(&self) -> f32 {
        self.gain
    }
}

#[derive(Debug, Default)]
struct FactoryState {
    opened: usize,
    fail_next_open: bool,
}

/// Factory handing out `FakeChain`s; clones share counters.
#[derive(Debug, Clone, Default)]
pub struct FakeFactory {
    state: Rc<RefCell<FactoryState>>,
}

impl FakeFactory {
    /// Number of chains opened so far.
    pub fn opened(&self) -> usize {
        self.state.borrow().opened
    }

    /// Make the next `open` fail.
    pub fn fail_next_open(&self) {
        self.state.borrow_mut().fail_next_open = true;
    }
}

impl ChainFactory for FakeFactory {
    type Chain = FakeChain;

    fn open(&self, path: &Path) -> Result<FakeChain, MixerError> {
        let mut state = self.state.borrow_mut();
        if std::mem::take(&mut state.fail_next_open) {
            return Err(MixerError::Decode {
                path: path.to_path_buf(),
                message: "unsupported format".to_string(),
            });
        }
        state.opened += 1;
        Ok(FakeChain::new(path))
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    time: f64,
    playing: bool,
    rate: f32,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            time: 0.0,
            playing: false,
            rate: 1.0,
        }
    }
}

impl ManualClock {
    pub fn set_time(&mut self, secs: f64) {
        self.time = secs;
    }
}

impl MasterClock for ManualClock {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, secs: f64) {
        self.time = secs.max(0.0);
    }

    fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    fn rate(&self) -> f32 {
        self.rate
    }
}

/// Write an executable `/bin/sh` script standing in for an external tool.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
