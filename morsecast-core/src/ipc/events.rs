//! Events and snapshots published by the player.
//!
//! Everything here is observer-facing and serialises to camelCase JSON so a
//! host UI can mirror it without knowing Rust types.

use serde::{Deserialize, Serialize};

use crate::morse::Mode;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Where the scheduler is in its playback state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerStatus {
    /// Running, no word in flight.
    #[default]
    Idle,
    /// A word was popped and its commands are being dispatched.
    Draining,
    /// The tone emitter is sounding a dot or dash.
    PlayingTone,
    /// Waiting out a silent gap.
    WaitingSilence,
    /// Scheduler task is not running.
    Stopped,
}

/// Read-only view of the player for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub status: PlayerStatus,
    pub is_playing: bool,
    /// Last word dispatched for playback (empty before the first word).
    pub current_word: String,
    pub mode: Mode,
    pub wpm: u32,
    pub dot_duration_secs: f64,
    /// Queue length observed at the last scheduler update.
    pub queued: usize,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Emitted on the player's broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// Scheduler status changed.
    #[serde(rename_all = "camelCase")]
    Status { status: PlayerStatus },
    /// A word was popped and encoded.
    #[serde(rename_all = "camelCase")]
    WordStarted {
        seq: u64,
        word: String,
        symbols: String,
        mode: Mode,
        commands: usize,
    },
    /// A tone began sounding.
    #[serde(rename_all = "camelCase")]
    Tone { seq: u64, duration_ms: u64 },
    /// Every command of the word completed.
    #[serde(rename_all = "camelCase")]
    WordFinished { seq: u64, word: String },
    /// The word's remaining commands were dropped.
    #[serde(rename_all = "camelCase")]
    WordAbandoned {
        seq: u64,
        word: String,
        reason: String,
    },
    /// Playback speed changed; applies from the next tick.
    #[serde(rename_all = "camelCase")]
    SpeedChanged { wpm: u32, dot_duration_secs: f64 },
    /// Encoding mode changed; applies from the next word.
    #[serde(rename_all = "camelCase")]
    ModeChanged { mode: Mode },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_camel_case() {
        let snapshot = PlayerSnapshot {
            status: PlayerStatus::WaitingSilence,
            is_playing: false,
            current_word: "sos".into(),
            mode: Mode::Character,
            wpm: 20,
            dot_duration_secs: 0.06,
            queued: 4,
        };

        let json = serde_json::to_value(&snapshot).expect("serialize snapshot");
        assert_eq!(json["status"], "waitingSilence");
        assert_eq!(json["isPlaying"], false);
        assert_eq!(json["currentWord"], "sos");
        assert_eq!(json["mode"], "character");
        assert_eq!(json["queued"], 4);

        let round_trip: PlayerSnapshot = serde_json::from_value(json).expect("deserialize");
        assert_eq!(round_trip, snapshot);
    }

    #[test]
    fn events_are_tagged_by_type() {
        let event = PlaybackEvent::WordStarted {
            seq: 2,
            word: "one".into(),
            symbols: ".----".into(),
            mode: Mode::Word,
            commands: 10,
        };

        let json = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(json["type"], "wordStarted");
        assert_eq!(json["seq"], 2);
        assert_eq!(json["symbols"], ".----");
        assert_eq!(json["mode"], "word");

        let tone = serde_json::to_value(PlaybackEvent::Tone {
            seq: 2,
            duration_ms: 180,
        })
        .expect("serialize tone");
        assert_eq!(tone["type"], "tone");
        assert_eq!(tone["durationMs"], 180);
    }

    #[test]
    fn status_rejects_unknown_casing() {
        let err = serde_json::from_str::<PlayerStatus>(r#""PlayingTone""#);
        assert!(err.is_err(), "expected PascalCase to be rejected");
        let ok: PlayerStatus = serde_json::from_str(r#""playingTone""#).expect("camelCase");
        assert_eq!(ok, PlayerStatus::PlayingTone);
    }
}
