//! Console command parsing.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// One line typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open(PathBuf),
    Enable(usize),
    Disable(usize),
    Toggle(usize),
    Volume(usize, u32),
    Mute(usize),
    Unmute(usize),
    Play,
    Pause,
    TogglePlay,
    Seek(f64),
    Rate(f32),
    Status,
    Cleanup,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  open <file>          open another media file
  enable|disable|toggle <track>
  vol <track> <0-200>  set track volume (percent)
  mute|unmute <track>
  play | pause | p     transport (p toggles)
  seek <seconds>
  rate <factor>        playback rate, e.g. 1.25
  status               list tracks
  cleanup              drop decoded audio for the open file
  help | quit";

/// Parse one input line. Empty lines are `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "open" | "o" => {
            if rest.is_empty() {
                bail!("usage: open <file>");
            }
            Command::Open(PathBuf::from(rest.join(" ")))
        }
        "enable" | "e" => Command::Enable(track_arg(&rest)?),
        "disable" | "d" => Command::Disable(track_arg(&rest)?),
        "toggle" | "t" => Command::Toggle(track_arg(&rest)?),
        "vol" | "volume" | "v" => {
            let track = track_arg(&rest)?;
            let volume = rest
                .get(1)
                .context("usage: vol <track> <0-200>")?
                .parse::<u32>()
                .context("volume must be a whole number")?;
            Command::Volume(track, volume)
        }
        "mute" | "m" => Command::Mute(track_arg(&rest)?),
        "unmute" | "u" => Command::Unmute(track_arg(&rest)?),
        "play" => Command::Play,
        "pause" => Command::Pause,
        "p" => Command::TogglePlay,
        "seek" | "s" => {
            let secs = rest
                .first()
                .context("usage: seek <seconds>")?
                .parse::<f64>()
                .context("seek target must be a number of seconds")?;
            if !secs.is_finite() || secs < 0.0 {
                bail!("seek target must be >= 0");
            }
            Command::Seek(secs)
        }
        "rate" | "r" => {
            let rate = rest
                .first()
                .context("usage: rate <factor>")?
                .parse::<f32>()
                .context("rate must be a number")?;
            Command::Rate(rate)
        }
        "status" | "ls" => Command::Status,
        "cleanup" => Command::Cleanup,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => bail!("unknown command '{}' (try 'help')", other),
    };
    Ok(Some(command))
}

fn track_arg(rest: &[&str]) -> Result<usize> {
    rest.first()
        .context("missing track number")?
        .trim_start_matches('#')
        .parse::<usize>()
        .context("track must be a number")
}
