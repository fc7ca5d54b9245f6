//! Text → Morse encoding.
//!
//! Pure functions only; nothing here touches audio or time.

pub mod encoder;
pub mod table;

pub use encoder::{
    dot_duration_for_wpm, encode, resolve_character, to_symbols, Mode, MorseTiming,
    PlaybackCommand,
};
pub use table::{symbol_for, FALLBACK_CHAR};
