//! # morsecast-core
//!
//! Plays recognized words back as audible Morse code.
//!
//! ## Architecture
//!
//! ```text
//! word source(s) ──push──► BoundedOverwriteQueue<String>
//!                                    │ pop (one word per tick, never while draining)
//!                                    ▼
//!                          scheduler task (tokio)
//!                                    │ encode(word, mode, dot)
//!                                    ▼
//!                       Vec<PlaybackCommand> (tone / silence)
//!                                    │ tones only
//!                                    ▼
//!                     ToneEmitter ──► SPSC sample ring ──► cpal output
//!
//!                          broadcast::Sender<PlaybackEvent>
//! ```
//!
//! The output callback is zero-alloc. Tone synthesis happens on the
//! scheduler side.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod morse;

// Convenience re-exports for downstream crates
pub use audio::{
    device::{list_output_devices, DeviceInfo},
    CpalToneEmitter, EmitterHandle, SilentToneEmitter, ToneCompletion, ToneConfig, ToneEmitter,
};
pub use buffering::{BoundedOverwriteQueue, OverflowPolicy};
pub use engine::{scheduler::DiagnosticsSnapshot, MorsePlayer, PlayerConfig};
pub use error::{MorseError, Result};
pub use ipc::events::{PlaybackEvent, PlayerSnapshot, PlayerStatus};
pub use morse::{encode, Mode, MorseTiming, PlaybackCommand};
