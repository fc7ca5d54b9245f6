//! Control commands typed on stdin.
//!
//! Any line starting with `:` is a command; everything else is transcript
//! text.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `:wpm N` | set speed (clamped to 5..=30) |
//! | `:mode word\|char` | set encoding mode |
//! | `:status` | print player status as JSON |
//! | `:clear` | drop every queued word |
//! | `:save` | write current speed and mode to the settings file |
//! | `:help` | list commands |
//! | `:quit` | stop playback and exit |

use anyhow::{anyhow, bail, Context, Result};
use morsecast_core::Mode;
use tracing::info;

use crate::settings::{clamp_wpm, parse_mode, save_settings};
use crate::state::AppState;

pub const COMMAND_PREFIX: char = ':';

const HELP: &str = "commands: :wpm N | :mode word|char | :status | :clear | :save | :help | :quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Wpm(u32),
    Mode(Mode),
    Status,
    Clear,
    Save,
    Help,
    Quit,
}

/// What the input loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn is_command(line: &str) -> bool {
    line.trim_start().starts_with(COMMAND_PREFIX)
}

pub fn parse_command(line: &str) -> Result<Command> {
    let body = line
        .trim()
        .strip_prefix(COMMAND_PREFIX)
        .ok_or_else(|| anyhow!("commands start with '{COMMAND_PREFIX}'"))?;
    let mut parts = body.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();

    let command = match name.as_str() {
        "wpm" | "speed" => {
            let raw = arg.ok_or_else(|| anyhow!("usage: :wpm N"))?;
            let wpm: u32 = raw
                .parse()
                .with_context(|| format!("'{raw}' is not a whole number"))?;
            Command::Wpm(wpm)
        }
        "mode" => {
            let raw = arg.ok_or_else(|| anyhow!("usage: :mode word|char"))?;
            Command::Mode(parse_mode(raw).ok_or_else(|| anyhow!("unknown mode '{raw}'"))?)
        }
        "status" => Command::Status,
        "clear" => Command::Clear,
        "save" => Command::Save,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        "" => bail!("empty command; {HELP}"),
        other => bail!("unknown command ':{other}'; {HELP}"),
    };
    Ok(command)
}

/// Apply a command to the running app.
pub fn execute(state: &AppState, command: Command) -> Result<Flow> {
    match command {
        Command::Wpm(requested) => {
            let wpm = clamp_wpm(requested);
            state.player.set_wpm(wpm)?;
            state.settings.lock().wpm = wpm;
            info!(requested, wpm, "speed set");
            println!("wpm {wpm}");
        }
        Command::Mode(mode) => {
            state.player.set_mode(mode);
            state.settings.lock().mode = mode;
            info!(?mode, "mode set");
            println!("mode {}", mode_name(mode));
        }
        Command::Status => {
            let report = serde_json::to_string_pretty(&state.status_report())?;
            println!("{report}");
        }
        Command::Clear => {
            let discarded = state.clear_queue();
            println!("queue cleared ({discarded} words)");
        }
        Command::Save => {
            let settings = state.settings.lock().clone();
            save_settings(&state.settings_path, &settings).with_context(|| {
                format!("failed to write {}", state.settings_path.display())
            })?;
            info!(path = %state.settings_path.display(), "settings saved");
            println!("saved {}", state.settings_path.display());
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Word => "word",
        Mode::Character => "char",
    }
}
