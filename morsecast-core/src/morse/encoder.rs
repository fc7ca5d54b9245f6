//! Word → timed tone/silence command sequence.
//!
//! ## Timing (PARIS standard, D = dot duration)
//!
//! | Element | Duration |
//! |---------|----------|
//! | dot | D |
//! | dash | 3D |
//! | gap between symbols of one character | D |
//! | gap between characters | 3D |
//! | gap after a word | 7D |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::table::{digit_for_word, special_for_word, symbol_for, FALLBACK_CHAR};
use crate::error::{MorseError, Result};

/// Dot units in the word "PARIS ", the reference word for WPM.
const PARIS_UNITS: f64 = 50.0;

/// Encoding strategy for one word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Spell the whole word out character by character.
    #[default]
    Word,
    /// Resolve the token to exactly one character.
    Character,
}

/// One step of playback: a tone or a silent gap of fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCommand {
    pub duration: Duration,
    pub tone_on: bool,
}

impl PlaybackCommand {
    pub fn tone(duration: Duration) -> Self {
        Self {
            duration,
            tone_on: true,
        }
    }

    pub fn silence(duration: Duration) -> Self {
        Self {
            duration,
            tone_on: false,
        }
    }
}

/// All Morse durations derived from a single dot length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MorseTiming {
    dot: Duration,
}

impl MorseTiming {
    pub fn new(dot: Duration) -> Self {
        Self { dot }
    }

    /// `D = 60 / (50 × wpm)` seconds.
    ///
    /// # Errors
    /// `MorseError::InvalidWpm` when `wpm == 0`.
    pub fn from_wpm(wpm: u32) -> Result<Self> {
        Ok(Self::new(dot_duration_for_wpm(wpm)?))
    }

    pub fn dot(&self) -> Duration {
        self.dot
    }

    pub fn dash(&self) -> Duration {
        self.dot * 3
    }

    pub fn element_gap(&self) -> Duration {
        self.dot
    }

    pub fn letter_gap(&self) -> Duration {
        self.dot * 3
    }

    pub fn word_gap(&self) -> Duration {
        self.dot * 7
    }
}

/// Dot length for a words-per-minute rate.
///
/// # Errors
/// `MorseError::InvalidWpm` when `wpm == 0`.
pub fn dot_duration_for_wpm(wpm: u32) -> Result<Duration> {
    if wpm == 0 {
        return Err(MorseError::InvalidWpm(wpm));
    }
    Ok(Duration::from_secs_f64(60.0 / (PARIS_UNITS * f64::from(wpm))))
}

/// Encode one word into the ordered commands that play it.
///
/// Always ends with exactly one word gap. Pure: the same inputs always give
/// the same sequence.
pub fn encode(word: &str, mode: Mode, dot: Duration) -> Vec<PlaybackCommand> {
    let timing = MorseTiming::new(dot);
    let units = resolve_units(&word.to_lowercase(), mode);
    let mut commands = Vec::new();

    for (index, unit) in units.iter().enumerate() {
        let Some(code) = symbol_for(*unit) else {
            continue;
        };
        let symbol_count = code.len();
        for (symbol_index, symbol) in code.chars().enumerate() {
            let length = if symbol == '-' {
                timing.dash()
            } else {
                timing.dot()
            };
            commands.push(PlaybackCommand::tone(length));
            if symbol_index + 1 < symbol_count {
                commands.push(PlaybackCommand::silence(timing.element_gap()));
            }
        }
        if index + 1 < units.len() {
            commands.push(PlaybackCommand::silence(timing.letter_gap()));
        }
    }

    commands.push(PlaybackCommand::silence(timing.word_gap()));
    commands
}

/// The single character a token stands for in [`Mode::Character`].
pub fn resolve_character(token: &str) -> char {
    resolve_units(&token.to_lowercase(), Mode::Character)
        .first()
        .copied()
        .unwrap_or(FALLBACK_CHAR)
}

/// Dot/dash rendering of a word, characters separated by spaces.
///
/// Resolved characters without a code are omitted.
pub fn to_symbols(word: &str, mode: Mode) -> String {
    resolve_units(&word.to_lowercase(), mode)
        .into_iter()
        .filter_map(symbol_for)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Characters to play for an already-lowercased word.
fn resolve_units(word: &str, mode: Mode) -> Vec<char> {
    if let Some(c) = digit_for_word(word).or_else(|| special_for_word(word)) {
        return vec![c];
    }

    let mut chars = word.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if symbol_for(c).is_some() {
            return vec![c];
        }
    }

    match mode {
        Mode::Word => word
            .chars()
            .map(|c| {
                if symbol_for(c).is_some() {
                    c
                } else {
                    FALLBACK_CHAR
                }
            })
            .collect(),
        Mode::Character => vec![FALLBACK_CHAR],
    }
}
