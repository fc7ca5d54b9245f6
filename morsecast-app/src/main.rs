//! Morsecast headless host.
//!
//! Reads transcript text from stdin and plays every word back as Morse code.
//! Lines starting with `:` are control commands (see `commands`).
//!
//! ## Runtime note
//!
//! The player's scheduler runs on this binary's Tokio runtime. The cpal
//! output stream lives on its own OS thread inside `CpalToneEmitter`.

mod commands;
mod settings;
mod state;
mod word_source;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use morsecast_core::{
    list_output_devices, CpalToneEmitter, EmitterHandle, MorsePlayer, PlaybackEvent,
    SilentToneEmitter,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use commands::{execute, is_command, parse_command, Flow};
use settings::{default_settings_path, load_settings, AppSettings, SettingsOverrides};
use state::AppState;

/// How often end-of-input checks whether playback has caught up.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Morsecast - play transcript words from stdin as Morse code
#[derive(Parser, Debug)]
#[command(name = "morsecast", version, about)]
struct Cli {
    /// Print output devices as JSON and exit
    #[arg(long)]
    list_devices: bool,

    /// Time tones without sounding them
    #[arg(long)]
    silent: bool,

    /// Settings file (defaults to the platform data directory)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[command(flatten)]
    overrides: SettingsOverrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("morsecast=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        println!("{}", serde_json::to_string_pretty(&list_output_devices())?);
        return Ok(());
    }

    // ── Settings ──────────────────────────────────────────────────────────
    let settings_path = cli.settings.unwrap_or_else(default_settings_path);
    let mut app_settings = load_settings(&settings_path);
    app_settings.apply_overrides(&cli.overrides);
    info!(
        settings_path = ?settings_path,
        wpm = app_settings.wpm,
        mode = ?app_settings.mode,
        queue_capacity = app_settings.queue_capacity,
        "settings loaded"
    );

    // ── Player setup ──────────────────────────────────────────────────────
    let emitter = open_emitter(&app_settings, cli.silent);
    let player = Arc::new(MorsePlayer::with_config(
        app_settings.player_config(),
        emitter,
    )?);
    let state = AppState::new(Arc::clone(&player), app_settings, settings_path);

    let event_logger = tokio::spawn(log_events(player.subscribe_events()));
    player.start()?;
    info!("morsecast ready, reading words from stdin");

    let flow = read_input(&state).await?;
    if flow == Flow::Continue {
        wait_for_drain(&state).await;
    }

    player.stop().await?;
    event_logger.abort();

    let diag = player.diagnostics_snapshot();
    info!(
        words_drained = diag.words_drained,
        sequences_abandoned = diag.sequences_abandoned,
        tones_emitted = diag.tones_emitted,
        ticks_while_draining = diag.ticks_while_draining,
        "player diagnostics on exit"
    );
    Ok(())
}

/// Real audio unless disabled or unavailable; otherwise silent timing.
fn open_emitter(settings: &AppSettings, silent: bool) -> EmitterHandle {
    if silent {
        info!("silent mode: tones are timed but not sounded");
        return EmitterHandle::new(SilentToneEmitter::new());
    }
    match CpalToneEmitter::open(settings.tone_config()) {
        Ok(emitter) => {
            info!(sample_rate = emitter.sample_rate(), "audio output open");
            EmitterHandle::new(emitter)
        }
        Err(e) => {
            warn!("audio output unavailable ({e}), falling back to silent playback");
            EmitterHandle::new(SilentToneEmitter::new())
        }
    }
}

/// Feed stdin into the player until EOF (`Flow::Continue`) or a quit request.
async fn read_input(state: &AppState) -> Result<Flow> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return Ok(Flow::Quit);
            }
        };

        let Some(line) = line else {
            debug!("stdin closed");
            return Ok(Flow::Continue);
        };

        if is_command(&line) {
            match parse_command(&line).and_then(|command| execute(state, command)) {
                Ok(Flow::Quit) => return Ok(Flow::Quit),
                Ok(Flow::Continue) => {}
                Err(e) => eprintln!("{e:#}"),
            }
        } else {
            state.ingest_line(&line);
        }
    }
}

/// Let queued words finish playing after input ends. Ctrl-C cuts it short.
async fn wait_for_drain(state: &AppState) {
    let drained = async {
        while !state.playback_settled() {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    };
    tokio::select! {
        _ = drained => debug!("queue drained"),
        _ = tokio::signal::ctrl_c() => info!("interrupted while draining"),
    }
}

async fn log_events(mut events: broadcast::Receiver<PlaybackEvent>) {
    loop {
        match events.recv().await {
            Ok(PlaybackEvent::WordStarted { word, symbols, .. }) => {
                println!("{word}  {symbols}");
            }
            Ok(PlaybackEvent::SpeedChanged { wpm, .. }) => info!(wpm, "speed changed"),
            Ok(PlaybackEvent::ModeChanged { mode }) => info!(?mode, "mode changed"),
            Ok(event) => debug!(?event, "playback event"),
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
