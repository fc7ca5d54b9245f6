use thiserror::Error;

/// All errors produced by morsecast-core.
#[derive(Debug, Error)]
pub enum MorseError {
    #[error("queue capacity must be greater than zero")]
    InvalidCapacity,

    #[error("words-per-minute must be greater than zero (got {0})")]
    InvalidWpm(u32),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no output device found")]
    NoOutputDevice,

    #[error("tone emitter unavailable: {0}")]
    EmitterUnavailable(String),

    #[error("player is already running")]
    AlreadyRunning,

    #[error("player is not running")]
    NotRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MorseError>;
