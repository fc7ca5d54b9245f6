//! Shared application state.
//!
//! `AppState` is held in an `Arc` by the stdin reader and the event logger.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use morsecast_core::{DiagnosticsSnapshot, MorsePlayer, PlayerSnapshot};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::settings::AppSettings;
use crate::word_source::{split_line, RecentWords};

pub struct AppState {
    /// The core player. Wrapped in `Arc` so event-forwarding tasks can hold it.
    pub player: Arc<MorsePlayer>,
    /// Settings as loaded plus any runtime changes, written back by `:save`.
    pub settings: Arc<Mutex<AppSettings>>,
    /// Absolute path to `settings.json`.
    pub settings_path: PathBuf,
    /// Rolling transcript of accepted words.
    pub recent: Arc<Mutex<RecentWords>>,
    /// Count of words handed to the queue.
    pub words_queued: Arc<AtomicUsize>,
    /// Count of words the queue's overflow policy dropped.
    pub words_dropped: Arc<AtomicUsize>,
    /// Count of queued words discarded by `:clear`.
    pub words_cleared: Arc<AtomicUsize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub player: PlayerSnapshot,
    pub diagnostics: DiagnosticsSnapshot,
    pub transcript: String,
    pub words_queued: usize,
    pub words_dropped: usize,
}

impl AppState {
    pub fn new(player: Arc<MorsePlayer>, settings: AppSettings, settings_path: PathBuf) -> Self {
        Self {
            player,
            settings: Arc::new(Mutex::new(settings)),
            settings_path,
            recent: Arc::new(Mutex::new(RecentWords::default())),
            words_queued: Arc::new(AtomicUsize::new(0)),
            words_dropped: Arc::new(AtomicUsize::new(0)),
            words_cleared: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Filter a transcript line and queue its words. Returns how many were queued.
    pub fn ingest_line(&self, line: &str) -> usize {
        let words = split_line(line);
        for word in &words {
            if self.player.push(word).is_some() {
                self.words_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.words_queued.fetch_add(words.len(), Ordering::Relaxed);
        self.recent.lock().extend(&words);
        debug!(count = words.len(), "transcript line queued");
        words.len()
    }

    /// Discard queued words without playing them.
    pub fn clear_queue(&self) -> usize {
        let discarded = self.player.reset_queue();
        self.words_cleared.fetch_add(discarded, Ordering::Relaxed);
        discarded
    }

    /// Words that will reach the scheduler: accepted, not evicted, not cleared.
    pub fn words_expected(&self) -> usize {
        self.words_queued
            .load(Ordering::Relaxed)
            .saturating_sub(self.words_dropped.load(Ordering::Relaxed))
            .saturating_sub(self.words_cleared.load(Ordering::Relaxed))
    }

    /// True once every expected word has finished or been abandoned.
    ///
    /// Counts come from the scheduler's own diagnostics, so a word that was
    /// popped but not yet announced still counts as outstanding.
    pub fn playback_settled(&self) -> bool {
        let diag = self.player.diagnostics_snapshot();
        diag.words_drained + diag.sequences_abandoned >= self.words_expected()
    }

    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            player: self.player.snapshot(),
            diagnostics: self.player.diagnostics_snapshot(),
            transcript: self.recent.lock().text(),
            words_queued: self.words_queued.load(Ordering::Relaxed),
            words_dropped: self.words_dropped.load(Ordering::Relaxed),
        }
    }
}
