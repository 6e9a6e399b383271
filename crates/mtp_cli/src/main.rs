//! Multi-track player - console entry point
//!
//! Thin front-end over `mtp_core`. It handles:
//! - Configuration loading
//! - Application-level logging initialization
//! - Audio output and master clock setup
//! - The command/event loop

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use mtp_core::config::ConfigManager;
use mtp_core::logging::{init_tracing, init_tracing_with_file, LogLevel};
use mtp_core::mixer::{ChainFactory, RodioOutput};
use mtp_core::player::{Player, PlayerEvent};
use mtp_core::sync::{MasterClock, WallClock};

mod commands;

use commands::{parse_command, Command, HELP};

/// Default config path: .config/settings.toml (relative to current working directory)
fn default_config_path() -> PathBuf {
    PathBuf::from(".config").join("settings.toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (needed for logs directory path)
    let config_path = default_config_path();
    let mut config_manager = ConfigManager::new(&config_path);

    if let Err(e) = config_manager.load_or_create() {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
    }
    let settings = config_manager.settings().clone();

    let logs_dir = config_manager.logs_folder();
    let _log_guard = match init_tracing_with_file(settings.logging.level, &logs_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to open log folder {}: {}", logs_dir.display(), e);
            init_tracing(settings.logging.level);
            None
        }
    };

    tracing::info!("Multi-track player starting");
    tracing::info!("Config: {}", config_path.display());
    tracing::info!("Core version: {}", mtp_core::version());

    let media = std::env::args_os().nth(1).map(PathBuf::from);

    let output = RodioOutput::open_default().context("Failed to open audio output")?;
    let clock = WallClock::new(settings.playback.default_rate);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut player = Player::new(settings, clock, output, event_tx);

    match media {
        Some(path) => {
            if let Err(e) = player.open_file(&path).await {
                eprintln!("Could not open {}: {}", path.display(), e);
            }
        }
        None => println!("No file given; use 'open <file>'."),
    }
    println!("{}", HELP);

    let mut ticker = tokio::time::interval(player.sync_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = player.tick();
                if report.hard > 0 {
                    tracing::debug!("Resynced {} track(s) at {:.3}s", report.hard, player.position());
                }
            }
            Some(job) = player.next_job_event() => player.handle_job_event(job),
            Some(event) = event_rx.recv() => print_event(&event),
            line = lines.next_line() => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => run_command(&mut player, command).await,
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read stdin: {}", e);
                    break;
                }
            },
        }
    }

    player.shutdown();
    tracing::info!("Multi-track player exiting");
    Ok(())
}

async fn run_command<C: MasterClock, F: ChainFactory>(player: &mut Player<C, F>, command: Command) {
    let result = match command {
        Command::Open(path) => player.open_file(&path).await.map(|_| ()),
        Command::Enable(idx) => player.enable_track(idx),
        Command::Disable(idx) => player.disable_track(idx),
        Command::Toggle(idx) => player.toggle_track(idx),
        Command::Volume(idx, volume) => player.set_volume(idx, volume),
        Command::Mute(idx) => player.set_muted(idx, true),
        Command::Unmute(idx) => player.set_muted(idx, false),
        Command::Play => {
            player.play().await;
            Ok(())
        }
        Command::Pause => {
            player.pause();
            Ok(())
        }
        Command::TogglePlay => {
            player.toggle_play().await;
            Ok(())
        }
        Command::Seek(secs) => {
            player.seek(secs);
            Ok(())
        }
        Command::Rate(rate) => {
            let applied = player.set_rate(rate);
            println!("rate {:.2}", applied);
            Ok(())
        }
        Command::Status => {
            print_status(player);
            Ok(())
        }
        Command::Cleanup => {
            player.cleanup();
            Ok(())
        }
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
        // Handled by the loop
        Command::Quit => Ok(()),
    };

    if let Err(e) = result {
        println!("error: {}", e);
    }
}

fn print_status<C: MasterClock, F: ChainFactory>(player: &Player<C, F>) {
    match player.probe_result() {
        Some(probe) => println!(
            "{} | {} | {:.2}s / {} | rate {:.2}",
            probe.file_path.display(),
            if player.is_playing() { "playing" } else { "paused" },
            player.position(),
            probe
                .duration
                .map(|d| format!("{:.2}s", d))
                .unwrap_or_else(|| "?".to_string()),
            player.rate()
        ),
        None => println!("no file open"),
    }
    for line in player.status_lines() {
        println!("  {}", line);
    }
}

fn print_event(event: &PlayerEvent) {
    match event {
        PlayerEvent::ProbeCompleted(Ok(probe)) => {
            println!(
                "opened {} ({} audio track(s))",
                probe.file_path.display(),
                probe.track_count()
            );
            for track in &probe.audio_tracks {
                println!("  {}", track.display_name());
            }
        }
        PlayerEvent::ProbeCompleted(Err(message)) => println!("open failed: {}", message),
        PlayerEvent::TrackProgress { .. } => {
            // Stepped progress arrives through the log lines
        }
        PlayerEvent::TrackStateChanged {
            audio_index,
            lifecycle,
            error,
        } => match error {
            Some(err) => println!("track #{}: {} ({})", audio_index, lifecycle, err),
            None => println!("track #{}: {}", audio_index, lifecycle),
        },
        PlayerEvent::Log(line) if line.level >= LogLevel::Info => println!("{}", line.message),
        PlayerEvent::Log(_) => {}
    }
}
