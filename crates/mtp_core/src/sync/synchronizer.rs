//! Periodic drift correction and global transport.

use std::time::Duration;

use super::clock::MasterClock;
use super::drift::{drift_correction, Correction};
use crate::config::{PlaybackSettings, SyncSettings};
use crate::mixer::{ChainFactory, Mixer, MixerError, PlaybackChain};

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Clock was paused; nothing ran.
    pub idle: bool,
    /// Tracks jumped to the master position.
    pub hard: usize,
    /// Tracks given a biased rate.
    pub soft: usize,
    /// Tracks at nominal rate.
    pub nominal: usize,
}

impl TickReport {
    /// Number of tracks examined.
    pub fn examined(&self) -> usize {
        self.hard + self.soft + self.nominal
    }
}

/// Keeps enabled tracks aligned to the master clock.
///
/// Owns the clock. Chains are borrowed from the mixer per call; `active` is
/// the set of enabled, ready tracks.
pub struct ClockSynchronizer<C: MasterClock> {
    clock: C,
    settings: SyncSettings,
    playback: PlaybackSettings,
    nominal_rate: f32,
}

impl<C: MasterClock> ClockSynchronizer<C> {
    /// Create a synchronizer; the clock is set to the default rate.
    pub fn new(mut clock: C, settings: SyncSettings, playback: PlaybackSettings) -> Self {
        let nominal_rate = playback.clamp_rate(playback.default_rate);
        clock.set_rate(nominal_rate);
        Self {
            clock,
            settings,
            playback,
            nominal_rate,
        }
    }

    /// Tick period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.settings.interval_ms.max(1))
    }

    /// The master clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Mutable access to the master clock.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// User-selected rate.
    pub fn nominal_rate(&self) -> f32 {
        self.nominal_rate
    }

    /// Whether global playback is active.
    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    /// Master position in seconds.
    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    /// Run one correction pass. No-op while paused.
    pub fn tick<F: ChainFactory>(&mut self, mixer: &mut Mixer<F>, active: &[usize]) -> TickReport {
        if !self.clock.is_playing() {
            return TickReport {
                idle: true,
                ..TickReport::default()
            };
        }

        let master = self.clock.current_time();
        let nominal = self.nominal_rate;
        let mut report = TickReport::default();

        for node in mixer.active_nodes_mut(active) {
            let chain = &mut node.chain;
            let drift = chain.position() - master;

            match drift_correction(drift, nominal, &self.settings) {
                Correction::HardResync => {
                    tracing::debug!(
                        "Track {} drift {:+.3}s, resyncing to {:.3}s",
                        node.audio_index,
                        drift,
                        master
                    );
                    if let Err(e) = chain.seek(master) {
                        tracing::warn!("Track {} resync failed: {}", node.audio_index, e);
                    }
                    chain.set_speed(nominal);
                    report.hard += 1;
                }
                Correction::Soft(rate) => {
                    if chain.speed() != rate {
                        tracing::trace!(
                            "Track {} drift {:+.3}s, rate {:.3}",
                            node.audio_index,
                            drift,
                            rate
                        );
                        chain.set_speed(rate);
                    }
                    report.soft += 1;
                }
                Correction::Nominal => {
                    if chain.speed() != nominal {
                        chain.set_speed(nominal);
                    }
                    report.nominal += 1;
                }
            }
        }

        report
    }

    /// Resume the clock, then align and start each track in turn.
    ///
    /// Tracks are started one at a time with a yield in between. A failing
    /// track is reported and the rest still start.
    pub async fn play<F: ChainFactory>(
        &mut self,
        mixer: &mut Mixer<F>,
        active: &[usize],
    ) -> Vec<(usize, MixerError)> {
        self.clock.play();
        let nominal = self.nominal_rate;
        let mut failures = Vec::new();

        for &audio_index in active {
            let Some(node) = mixer.node_mut(audio_index) else {
                continue;
            };
            let master = self.clock.current_time();
            let chain = &mut node.chain;
            chain.set_speed(nominal);
            let started = chain.seek(master).and_then(|()| chain.start());
            if let Err(e) = started {
                tracing::warn!("Track {} failed to start: {}", audio_index, e);
                failures.push((audio_index, e));
            }
            tokio::task::yield_now().await;
        }

        failures
    }

    /// Pause the clock and every active track.
    pub fn pause<F: ChainFactory>(&mut self, mixer: &mut Mixer<F>, active: &[usize]) {
        self.clock.pause();
        for node in mixer.active_nodes_mut(active) {
            node.chain.pause();
        }
    }

    /// Reposition everything. Tracks resume only if playback was active.
    pub fn seek<F: ChainFactory>(
        &mut self,
        secs: f64,
        mixer: &mut Mixer<F>,
        active: &[usize],
    ) -> Vec<(usize, MixerError)> {
        let was_playing = self.clock.is_playing();

        for node in mixer.active_nodes_mut(active) {
            node.chain.pause();
        }

        self.clock.seek(secs);
        let target = self.clock.current_time();
        let mut failures = Vec::new();

        for node in mixer.active_nodes_mut(active) {
            let chain = &mut node.chain;
            let mut result = chain.seek(target);
            if result.is_ok() && was_playing {
                result = chain.start();
            }
            if let Err(e) = result {
                tracing::warn!("Track {} seek failed: {}", node.audio_index, e);
                failures.push((node.audio_index, e));
            }
        }

        failures
    }

    /// Apply a new nominal rate (clamped) to the clock and every active track.
    ///
    /// Supersedes any soft-correction bias. Returns the applied rate.
    pub fn set_rate<F: ChainFactory>(
        &mut self,
        rate: f32,
        mixer: &mut Mixer<F>,
        active: &[usize],
    ) -> f32 {
        let rate = self.playback.clamp_rate(rate);
        self.nominal_rate = rate;
        self.clock.set_rate(rate);
        for node in mixer.active_nodes_mut(active) {
            node.chain.set_speed(rate);
        }
        rate
    }

    /// Bring one chain in line with the master: position, nominal rate, and
    /// running state.
    pub fn align_track<P: PlaybackChain>(&self, chain: &mut P) -> Result<(), MixerError> {
        chain.set_speed(self.nominal_rate);
        chain.seek(self.clock.current_time())?;
        if self.clock.is_playing() {
            chain.start()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFactory, ManualClock};
    use std::path::Path;

    fn setup(tracks: usize) -> (ClockSynchronizer<ManualClock>, Mixer<FakeFactory>, Vec<usize>) {
        let sync = ClockSynchronizer::new(
            ManualClock::default(),
            SyncSettings::default(),
            PlaybackSettings::default(),
        );
        let mut mixer = Mixer::new(FakeFactory::default());
        for i in 0..tracks {
            let path = format!("/s/track_{}.wav", i);
            mixer.attach(i, Path::new(&path), 1.0).unwrap();
        }
        (sync, mixer, (0..tracks).collect())
    }

    fn chain(mixer: &Mixer<FakeFactory>, idx: usize) -> &crate::testing::FakeChain {
        &mixer.node(idx).unwrap().chain
    }

    #[tokio::test]
    async fn tick_hard_resyncs_lagging_track() {
        let (mut sync, mut mixer, active) = setup(1);
        sync.play(&mut mixer, &active).await;

        sync.clock_mut().set_time(10.30);
        {
            let c = &mut mixer.node_mut(0).unwrap().chain;
            c.position = 10.00;
            c.speed = 1.03;
        }

        let report = sync.tick(&mut mixer, &active);
        assert_eq!(report.hard, 1);
        assert!((chain(&mixer, 0).position - 10.30).abs() < 1e-9);
        assert_eq!(chain(&mixer, 0).speed, 1.0);
    }

    #[tokio::test]
    async fn tick_soft_corrects_opposite_to_drift() {
        let (mut sync, mut mixer, active) = setup(2);
        sync.play(&mut mixer, &active).await;
        sync.clock_mut().set_time(20.0);
        mixer.node_mut(0).unwrap().chain.position = 20.1;
        mixer.node_mut(1).unwrap().chain.position = 19.9;

        let report = sync.tick(&mut mixer, &active);
        assert_eq!(report.soft, 2);
        assert!(chain(&mixer, 0).speed < 1.0);
        assert!(chain(&mixer, 1).speed > 1.0);
        // Soft correction never moves position
        assert_eq!(chain(&mixer, 0).position, 20.1);
    }

    #[tokio::test]
    async fn tick_at_rest_is_idempotent() {
        let (mut sync, mut mixer, active) = setup(1);
        sync.play(&mut mixer, &active).await;
        sync.clock_mut().set_time(5.0);
        mixer.node_mut(0).unwrap().chain.position = 5.05;
        mixer.node_mut(0).unwrap().chain.speed = 0.97;

        for _ in 0..5 {
            let report = sync.tick(&mut mixer, &active);
            assert_eq!(report.nominal, 1);
            assert_eq!(chain(&mixer, 0).speed, 1.0);
            assert_eq!(chain(&mixer, 0).position, 5.05);
        }
    }

    #[test]
    fn tick_is_noop_while_paused() {
        let (mut sync, mut mixer, active) = setup(1);
        mixer.node_mut(0).unwrap().chain.position = 99.0;

        let report = sync.tick(&mut mixer, &active);
        assert!(report.idle);
        assert_eq!(report.examined(), 0);
        assert_eq!(chain(&mixer, 0).position, 99.0);
    }

    #[tokio::test]
    async fn tick_ignores_inactive_chains() {
        let (mut sync, mut mixer, _) = setup(2);
        let active = vec![1];
        sync.play(&mut mixer, &active).await;
        sync.clock_mut().set_time(8.0);
        mixer.node_mut(0).unwrap().chain.position = 0.0;

        let report = sync.tick(&mut mixer, &active);
        assert_eq!(report.examined(), 1);
        assert_eq!(chain(&mixer, 0).position, 0.0);
    }

    #[tokio::test]
    async fn play_aligns_and_starts_all_tracks_despite_failure() {
        let (mut sync, mut mixer, active) = setup(3);
        sync.clock_mut().set_time(42.0);
        mixer.node_mut(1).unwrap().chain.fail_start = true;

        let failures = sync.play(&mut mixer, &active).await;

        assert!(sync.is_playing());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        for idx in [0, 2] {
            assert!(!chain(&mixer, idx).paused);
            assert_eq!(chain(&mixer, idx).position, 42.0);
        }
    }

    #[tokio::test]
    async fn pause_stops_clock_and_tracks() {
        let (mut sync, mut mixer, active) = setup(2);
        sync.play(&mut mixer, &active).await;

        sync.pause(&mut mixer, &active);
        assert!(!sync.is_playing());
        assert!(chain(&mixer, 0).paused);
        assert!(chain(&mixer, 1).paused);
    }

    #[tokio::test]
    async fn seek_while_playing_resumes() {
        let (mut sync, mut mixer, active) = setup(1);
        sync.play(&mut mixer, &active).await;

        let failures = sync.seek(90.0, &mut mixer, &active);
        assert!(failures.is_empty());
        assert_eq!(sync.current_time(), 90.0);
        assert_eq!(chain(&mixer, 0).position, 90.0);
        assert!(!chain(&mixer, 0).paused);
    }

    #[test]
    fn seek_while_paused_stays_paused() {
        let (mut sync, mut mixer, active) = setup(1);

        sync.seek(30.0, &mut mixer, &active);
        assert_eq!(chain(&mixer, 0).position, 30.0);
        assert!(chain(&mixer, 0).paused);
        assert!(!sync.is_playing());
    }

    #[tokio::test]
    async fn set_rate_overrides_soft_bias_and_clamps() {
        let (mut sync, mut mixer, active) = setup(1);
        sync.play(&mut mixer, &active).await;
        mixer.node_mut(0).unwrap().chain.speed = 1.03;

        assert_eq!(sync.set_rate(1.5, &mut mixer, &active), 1.5);
        assert_eq!(chain(&mixer, 0).speed, 1.5);
        assert_eq!(sync.clock().rate(), 1.5);

        assert_eq!(sync.set_rate(100.0, &mut mixer, &active), 4.0);
        assert_eq!(sync.nominal_rate(), 4.0);
    }

    #[tokio::test]
    async fn align_track_matches_master() {
        let (mut sync, mut mixer, active) = setup(1);
        sync.play(&mut mixer, &active).await;
        sync.clock_mut().set_time(12.0);

        mixer.attach(5, Path::new("/s/track_5.wav"), 1.0).unwrap();
        let node = mixer.node_mut(5).unwrap();
        sync.align_track(&mut node.chain).unwrap();

        assert_eq!(node.chain.position, 12.0);
        assert!(!node.chain.paused);
    }
}
