//! Player controller: wires probe, registry, extraction, mixer and sync.

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::errors::{PlayerError, PlayerResult};
use super::events::PlayerEvent;
use crate::config::Settings;
use crate::extraction::{encoder_args, ExtractionJob, Extractor, JobEvent};
use crate::logging::{LogConfig, SessionLogger};
use crate::mixer::{ChainFactory, Mixer, MixerError};
use crate::models::{ProbeResult, TrackLifecycle, TrackRecord};
use crate::probe::Prober;
use crate::registry::{Completion, DisableAction, EnableAction, TrackRegistry};
use crate::session::SessionDir;
use crate::sync::{ClockSynchronizer, MasterClock, TickReport};

/// Multi-track player bound to one master clock and one audio output.
///
/// Owned by a single task. Extraction runs in spawned tasks that report back
/// through `next_job_event`; the owner feeds those into `handle_job_event`.
pub struct Player<C: MasterClock, F: ChainFactory> {
    settings: Settings,
    prober: Prober,
    extractor: Extractor,
    job_rx: UnboundedReceiver<JobEvent>,
    events: UnboundedSender<PlayerEvent>,
    logger: SessionLogger,
    registry: TrackRegistry,
    mixer: Mixer<F>,
    sync: ClockSynchronizer<C>,
    session: Option<SessionDir>,
    probe: Option<ProbeResult>,
    generation: u64,
}

impl<C: MasterClock, F: ChainFactory> Player<C, F> {
    /// Create a player. `events` receives every outward notification.
    pub fn new(settings: Settings, clock: C, factory: F, events: UnboundedSender<PlayerEvent>) -> Self {
        let (job_tx, job_rx) = mpsc::unbounded_channel();

        let log_config = LogConfig {
            level: settings.logging.level,
            compact: settings.logging.compact,
            progress_step: settings.logging.progress_step,
            show_timestamps: true,
            error_tail: settings.logging.error_tail as usize,
        };

        Self {
            prober: Prober::new(settings.tools.prober.clone()),
            extractor: Extractor::new(
                settings.tools.encoder.clone(),
                settings.logging.error_tail as usize,
                job_tx,
            ),
            job_rx,
            logger: SessionLogger::new(log_config, Some(events.clone())),
            events,
            registry: TrackRegistry::new(),
            mixer: Mixer::new(factory),
            sync: ClockSynchronizer::new(clock, settings.sync.clone(), settings.playback.clone()),
            session: None,
            probe: None,
            generation: 0,
            settings,
        }
    }

    /// Open a media file, replacing the current session.
    ///
    /// On probe failure no session remains and
    /// `PlayerEvent::ProbeCompleted(Err(..))` is published.
    pub async fn open_file(&mut self, path: &Path) -> PlayerResult<&ProbeResult> {
        self.close_session();
        self.generation += 1;

        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.logger.begin_session(label);
        self.logger.phase("Probe");
        self.logger.command(&format!(
            "{} {}",
            self.prober.program(),
            Prober::args(path).join(" ")
        ));

        let probe = match self.prober.probe(path).await {
            Ok(probe) => probe,
            Err(e) => {
                self.logger.error(&e.to_string());
                self.emit(PlayerEvent::ProbeCompleted(Err(e.to_string())));
                return Err(e.into());
            }
        };

        let session = match SessionDir::create(
            &self.settings.session.resolved_temp_root(),
            &self.settings.session.temp_prefix,
            self.generation,
        ) {
            Ok(session) => session,
            Err(e) => {
                let err = PlayerError::Session(e);
                self.logger.error(&err.to_string());
                self.emit(PlayerEvent::ProbeCompleted(Err(err.to_string())));
                return Err(err);
            }
        };

        self.registry
            .seed(&probe, self.settings.playback.default_volume);
        self.logger.info(&format!(
            "{}: {} audio track(s)",
            path.display(),
            probe.track_count()
        ));
        for track in &probe.audio_tracks {
            self.logger.info(&track.display_name());
        }

        self.session = Some(session);
        self.emit(PlayerEvent::ProbeCompleted(Ok(probe.clone())));
        Ok(self.probe.insert(probe))
    }

    /// Enable a track: extract it if needed, otherwise attach its cached decode.
    pub fn enable_track(&mut self, audio_index: usize) -> PlayerResult<()> {
        if self.session.is_none() {
            return Err(PlayerError::NoSession);
        }
        let action = self
            .registry
            .request_enable(audio_index)
            .ok_or(PlayerError::UnknownTrack(audio_index))?;

        match action {
            EnableAction::StartExtraction => {
                self.start_extraction(audio_index)?;
                self.notify_state(audio_index);
            }
            EnableAction::AwaitingExtraction => {
                self.logger
                    .info(&format!("Track #{} is already extracting", audio_index));
            }
            EnableAction::Attach(path) => {
                let result = self.attach(audio_index, &path);
                self.notify_state(audio_index);
                result?;
            }
            EnableAction::AlreadyActive => {}
        }
        Ok(())
    }

    /// Disable a track. Its decode stays cached; a running job keeps running.
    pub fn disable_track(&mut self, audio_index: usize) -> PlayerResult<()> {
        let action = self
            .registry
            .request_disable(audio_index)
            .ok_or(PlayerError::UnknownTrack(audio_index))?;

        match action {
            DisableAction::Detach => {
                self.mixer.pause_track(audio_index);
                self.notify_state(audio_index);
            }
            DisableAction::Deferred => {
                self.logger.info(&format!(
                    "Track #{} disabled; extraction continues for the cache",
                    audio_index
                ));
            }
            DisableAction::NoOp => {}
        }
        Ok(())
    }

    /// Enable if disabled, disable if enabled.
    pub fn toggle_track(&mut self, audio_index: usize) -> PlayerResult<()> {
        let enabled = self
            .registry
            .record(audio_index)
            .map(|r| r.enabled)
            .ok_or(PlayerError::UnknownTrack(audio_index))?;

        if enabled {
            self.disable_track(audio_index)
        } else {
            self.enable_track(audio_index)
        }
    }

    /// Set a track's volume in percent (clamped to 0..=200).
    pub fn set_volume(&mut self, audio_index: usize, volume: u32) -> PlayerResult<()> {
        let gain = self
            .registry
            .set_volume(audio_index, volume)
            .ok_or(PlayerError::UnknownTrack(audio_index))?;
        self.mixer.set_gain(audio_index, gain);
        Ok(())
    }

    /// Set a track's mute flag.
    pub fn set_muted(&mut self, audio_index: usize, muted: bool) -> PlayerResult<()> {
        let gain = self
            .registry
            .set_muted(audio_index, muted)
            .ok_or(PlayerError::UnknownTrack(audio_index))?;
        self.mixer.set_gain(audio_index, gain);
        Ok(())
    }

    /// Flip a track's mute flag. Returns the new flag.
    pub fn toggle_mute(&mut self, audio_index: usize) -> PlayerResult<bool> {
        let muted = self
            .registry
            .toggle_muted(audio_index)
            .ok_or(PlayerError::UnknownTrack(audio_index))?;
        if let Some(gain) = self.registry.gain(audio_index) {
            self.mixer.set_gain(audio_index, gain);
        }
        Ok(muted)
    }

    /// Resume the clock and start every mixing track.
    pub async fn play(&mut self) {
        let active = self.registry.mixing_indices();
        let failures = self.sync.play(&mut self.mixer, &active).await;
        self.report_failures("start", failures);
    }

    /// Pause the clock and every mixing track.
    pub fn pause(&mut self) {
        let active = self.registry.mixing_indices();
        self.sync.pause(&mut self.mixer, &active);
    }

    /// Play if paused, pause if playing.
    pub async fn toggle_play(&mut self) {
        if self.sync.is_playing() {
            self.pause();
        } else {
            self.play().await;
        }
    }

    /// Move the master clock and all mixing tracks to `secs`.
    pub fn seek(&mut self, secs: f64) {
        let active = self.registry.mixing_indices();
        let failures = self.sync.seek(secs, &mut self.mixer, &active);
        self.report_failures("seek", failures);
    }

    /// Change the nominal playback rate. Returns the applied (clamped) rate.
    pub fn set_rate(&mut self, rate: f32) -> f32 {
        let active = self.registry.mixing_indices();
        self.sync.set_rate(rate, &mut self.mixer, &active)
    }

    /// Run one drift-correction pass.
    pub fn tick(&mut self) -> TickReport {
        let active = self.registry.mixing_indices();
        self.sync.tick(&mut self.mixer, &active)
    }

    /// Period at which `tick` should be called.
    pub fn sync_interval(&self) -> Duration {
        self.sync.interval()
    }

    /// Wait for the next event from an extraction task.
    pub async fn next_job_event(&mut self) -> Option<JobEvent> {
        self.job_rx.recv().await
    }

    /// Apply an extraction event. Events from a closed session are dropped.
    pub fn handle_job_event(&mut self, event: JobEvent) {
        if self.session.is_none() || event.generation() != self.generation {
            tracing::debug!(
                "Discarding event for track {} from closed session {}",
                event.audio_index(),
                event.generation()
            );
            return;
        }

        match event {
            JobEvent::Progress {
                audio_index,
                fraction,
                ..
            } => {
                if let Some(progress) = self.registry.apply_progress(audio_index, fraction) {
                    self.logger.progress(audio_index, progress);
                    self.emit(PlayerEvent::TrackProgress {
                        audio_index,
                        progress,
                    });
                }
            }
            JobEvent::Finished {
                audio_index,
                result: Ok(path),
                ..
            } => self.finish_extraction(audio_index, &path),
            JobEvent::Finished {
                audio_index,
                result: Err(e),
                ..
            } => {
                let diagnostic = e.diagnostic();
                for line in diagnostic.lines() {
                    self.logger.output_line(line, true);
                }
                if self.registry.fail_extraction(audio_index, diagnostic) {
                    self.logger.error(&format!("Track #{}: {}", audio_index, e));
                    self.logger.show_tail(&format!("track {}", audio_index));
                    self.notify_state(audio_index);
                }
            }
        }
    }

    /// Drop the current session: chains, decoded files and track state.
    pub fn cleanup(&mut self) {
        if self.session.is_some() {
            self.logger.info("Session cleaned up");
        }
        self.close_session();
    }

    /// Stop playback and release everything.
    pub fn shutdown(&mut self) {
        self.close_session();
        self.sync.clock_mut().pause();
    }

    /// All track records.
    pub fn tracks(&self) -> &[TrackRecord] {
        self.registry.records()
    }

    /// One track record.
    pub fn track(&self, audio_index: usize) -> Option<&TrackRecord> {
        self.registry.record(audio_index)
    }

    /// Probe result of the open file.
    pub fn probe_result(&self) -> Option<&ProbeResult> {
        self.probe.as_ref()
    }

    /// Temp directory of the open session.
    pub fn session_path(&self) -> Option<&Path> {
        self.session.as_ref().map(SessionDir::path)
    }

    /// Whether global playback is active.
    pub fn is_playing(&self) -> bool {
        self.sync.is_playing()
    }

    /// Master clock position in seconds.
    pub fn position(&self) -> f64 {
        self.sync.current_time()
    }

    /// Current nominal rate.
    pub fn rate(&self) -> f32 {
        self.sync.nominal_rate()
    }

    /// The mixer.
    pub fn mixer(&self) -> &Mixer<F> {
        &self.mixer
    }

    /// One line per track for the track panel.
    pub fn status_lines(&self) -> Vec<String> {
        self.registry
            .records()
            .iter()
            .map(|record| {
                let name = self
                    .probe
                    .as_ref()
                    .and_then(|p| p.audio_track(record.audio_index))
                    .map(|t| t.display_name())
                    .unwrap_or_else(|| format!("#{}", record.audio_index));

                let mut line = format!("{} [{}] vol {}%", name, record.lifecycle, record.volume);
                if record.muted {
                    line.push_str(" muted");
                }
                if record.lifecycle == TrackLifecycle::Extracting {
                    line.push_str(&format!(" {:.0}%", record.progress * 100.0));
                }
                if let Some(ref err) = record.error {
                    line.push_str(&format!(" error: {}", err));
                }
                line
            })
            .collect()
    }

    fn start_extraction(&mut self, audio_index: usize) -> PlayerResult<()> {
        let session = self.session.as_ref().ok_or(PlayerError::NoSession)?;
        let probe = self.probe.as_ref().ok_or(PlayerError::NoSession)?;

        let job = ExtractionJob {
            generation: self.generation,
            audio_index,
            source: probe.file_path.clone(),
            output: session.track_output_path(audio_index),
            total_duration: probe.duration_secs(),
        };

        self.logger.phase(&format!("Extract track #{}", audio_index));
        self.logger.command(&format!(
            "{} {}",
            self.extractor.program(),
            encoder_args(&job).join(" ")
        ));
        self.extractor.start(job);
        Ok(())
    }

    fn finish_extraction(&mut self, audio_index: usize, path: &Path) {
        match self.registry.complete_extraction(audio_index, path) {
            Some(Completion::Mix(cached)) => {
                self.emit(PlayerEvent::TrackProgress {
                    audio_index,
                    progress: 1.0,
                });
                self.logger
                    .success(&format!("Track #{} ready", audio_index));
                if let Err(e) = self.attach(audio_index, &cached) {
                    tracing::warn!("Track {} could not be mixed: {}", audio_index, e);
                }
                self.notify_state(audio_index);
            }
            Some(Completion::CacheOnly) => {
                self.emit(PlayerEvent::TrackProgress {
                    audio_index,
                    progress: 1.0,
                });
                self.logger.success(&format!(
                    "Track #{} decoded (cached, not enabled)",
                    audio_index
                ));
                self.notify_state(audio_index);
            }
            None => {}
        }
    }

    /// Attach a decoded track to the mixer and align it with the clock.
    /// Failures mark only this track as failed.
    fn attach(&mut self, audio_index: usize, path: &Path) -> Result<(), MixerError> {
        let gain = self.registry.gain(audio_index).unwrap_or(1.0);
        let result = self
            .mixer
            .attach(audio_index, path, gain)
            .and_then(|chain| self.sync.align_track(chain));

        if let Err(ref e) = result {
            self.mixer.remove(audio_index);
            self.registry.mark_failed(audio_index, e.to_string());
            self.logger
                .error(&format!("Track #{}: {}", audio_index, e));
        }
        result
    }

    /// A track whose chain could not start or seek leaves the mix as `Failed`.
    /// Its decode stays cached, so enabling it again re-attaches.
    fn report_failures(&mut self, what: &str, failures: Vec<(usize, MixerError)>) {
        for (audio_index, e) in failures {
            let message = format!("{} failed: {}", what, e);
            self.mixer.remove(audio_index);
            self.registry.mark_failed(audio_index, message.clone());
            self.logger
                .error(&format!("Track #{} {}", audio_index, message));
            self.notify_state(audio_index);
        }
    }

    fn notify_state(&self, audio_index: usize) {
        if let Some(record) = self.registry.record(audio_index) {
            self.emit(PlayerEvent::TrackStateChanged {
                audio_index,
                lifecycle: record.lifecycle,
                error: record.error.clone(),
            });
        }
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }

    fn close_session(&mut self) {
        self.mixer.teardown();
        self.sync.clock_mut().pause();
        self.sync.clock_mut().seek(0.0);
        self.registry.clear();
        self.probe = None;
        if let Some(session) = self.session.take() {
            session.close();
        }
        // Any job still running now belongs to a dead generation
        self.generation += 1;
    }
}
