//! `MorsePlayer`: top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! MorsePlayer::new()
//!     └─► start()          → scheduler task spawned, status = Idle
//!         ├─► set_wpm()    → tick timer restarted at the new rate
//!         ├─► set_mode()   → applies from the next word
//!         └─► stop().await → timer cancelled, in-flight command finishes,
//!                            status = Stopped
//! ```
//!
//! `start()`/`stop()` return an error when called in the wrong state rather
//! than panicking. A stopped player can be started again; it resumes at Idle
//! with whatever words are still queued.
//!
//! ## Threading
//!
//! The scheduler is one Tokio task that owns the mode, timing and drain
//! guard. Setters do not touch that state directly; they post a
//! `ControlRequest` to the task's mailbox. Only the bounded queue is shared
//! between producers and the scheduler.

pub mod scheduler;
pub mod timer;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    audio::EmitterHandle,
    buffering::{BoundedOverwriteQueue, OverflowPolicy},
    error::{MorseError, Result},
    ipc::events::{PlaybackEvent, PlayerSnapshot, PlayerStatus},
    morse::{Mode, MorseTiming},
};

use scheduler::{ControlRequest, DiagnosticsSnapshot, Publisher, SchedulerDiagnostics};

/// Broadcast channel capacity: 256 playback events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// Configuration for `MorsePlayer`.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Encoding mode for new words. Default: `Mode::Word`.
    pub mode: Mode,
    /// Playback speed in words per minute. Default: 20.
    pub wpm: u32,
    /// Word queue capacity. Default: 130.
    pub queue_capacity: usize,
    /// What a push does when the queue is full. Default: overwrite oldest.
    pub overflow_policy: OverflowPolicy,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Word,
            wpm: 20,
            queue_capacity: 130,
            overflow_policy: OverflowPolicy::OverwriteOldest,
        }
    }
}

impl PlayerConfig {
    /// Build the word queue described by this config.
    ///
    /// # Errors
    /// `MorseError::InvalidCapacity` when `queue_capacity == 0`.
    pub fn build_queue(&self) -> Result<Arc<BoundedOverwriteQueue<String>>> {
        Ok(Arc::new(BoundedOverwriteQueue::with_policy(
            self.queue_capacity,
            self.overflow_policy,
        )?))
    }
}

/// Mode and speed handed to the next scheduler start.
#[derive(Debug, Clone, Copy)]
struct PlaybackSettings {
    mode: Mode,
    wpm: u32,
    timing: MorseTiming,
}

/// The top-level player handle.
///
/// `MorsePlayer` is `Send + Sync`; all fields use interior mutability. Wrap it
/// in `Arc<MorsePlayer>` to share between the word source and observers.
pub struct MorsePlayer {
    queue: Arc<BoundedOverwriteQueue<String>>,
    emitter: EmitterHandle,
    settings: Mutex<PlaybackSettings>,
    /// `true` while the scheduler task is active.
    running: Arc<AtomicBool>,
    control_tx: Mutex<Option<mpsc::UnboundedSender<ControlRequest>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    /// Published view (written by the scheduler, read by observers).
    snapshot: Arc<Mutex<PlayerSnapshot>>,
    event_tx: broadcast::Sender<PlaybackEvent>,
    diagnostics: Arc<SchedulerDiagnostics>,
}

impl MorsePlayer {
    /// Create a stopped player over an existing queue. Call `start()` to play.
    ///
    /// # Errors
    /// `MorseError::InvalidWpm` when `config.wpm == 0`.
    pub fn new(
        config: PlayerConfig,
        queue: Arc<BoundedOverwriteQueue<String>>,
        emitter: EmitterHandle,
    ) -> Result<Self> {
        let timing = MorseTiming::from_wpm(config.wpm)?;
        let (event_tx, _) = broadcast::channel(BROADCAST_CAP);
        let snapshot = PlayerSnapshot {
            status: PlayerStatus::Stopped,
            is_playing: false,
            current_word: String::new(),
            mode: config.mode,
            wpm: config.wpm,
            dot_duration_secs: timing.dot().as_secs_f64(),
            queued: queue.len(),
        };

        Ok(Self {
            queue,
            emitter,
            settings: Mutex::new(PlaybackSettings {
                mode: config.mode,
                wpm: config.wpm,
                timing,
            }),
            running: Arc::new(AtomicBool::new(false)),
            control_tx: Mutex::new(None),
            task: Mutex::new(None),
            snapshot: Arc::new(Mutex::new(snapshot)),
            event_tx,
            diagnostics: Arc::new(SchedulerDiagnostics::default()),
        })
    }

    /// Create a player together with the queue its config describes.
    ///
    /// # Errors
    /// `MorseError::InvalidCapacity` or `MorseError::InvalidWpm`.
    pub fn with_config(config: PlayerConfig, emitter: EmitterHandle) -> Result<Self> {
        let queue = config.build_queue()?;
        Self::new(config, queue, emitter)
    }

    /// Spawn the scheduler task. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// `MorseError::AlreadyRunning` if already started.
    pub fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(MorseError::AlreadyRunning);
        }

        self.diagnostics.reset();
        let settings = *self.settings.lock();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let ctx = scheduler::SchedulerContext {
            queue: Arc::clone(&self.queue),
            emitter: self.emitter.clone(),
            control_rx,
            running: Arc::clone(&self.running),
            publisher: self.publisher(),
            diagnostics: Arc::clone(&self.diagnostics),
            mode: settings.mode,
            wpm: settings.wpm,
            timing: settings.timing,
        };

        *self.control_tx.lock() = Some(control_tx);
        *self.task.lock() = Some(tokio::spawn(scheduler::run(ctx)));
        info!(mode = ?settings.mode, wpm = settings.wpm, "player started");
        Ok(())
    }

    /// Stop the scheduler and wait for it to wind down.
    ///
    /// The tick timer is cancelled at once; a tone or gap already in progress
    /// plays out, and the rest of that word is dropped.
    ///
    /// # Errors
    /// `MorseError::NotRunning` if not currently running.
    pub async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(MorseError::NotRunning);
        }
        info!("player stop requested");

        if let Some(control_tx) = self.control_tx.lock().take() {
            let _ = control_tx.send(ControlRequest::Stop);
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("scheduler task ended abnormally: {e}");
                self.publisher().set_status(PlayerStatus::Stopped, false);
            }
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Producer entry point. Blank input is ignored.
    ///
    /// Returns the word the overflow policy dropped, if any.
    pub fn push(&self, word: &str) -> Option<String> {
        let word = word.trim();
        if word.is_empty() {
            return None;
        }
        let dropped = self.queue.push(word.to_lowercase());
        if let Some(ref lost) = dropped {
            warn!(dropped = %lost, capacity = self.queue.capacity(), "word queue full");
        }
        dropped
    }

    /// Change the encoding mode. Takes effect from the next word popped.
    pub fn set_mode(&self, mode: Mode) {
        {
            let mut settings = self.settings.lock();
            if settings.mode == mode {
                return;
            }
            settings.mode = mode;
        }

        if !self.post(ControlRequest::SetMode(mode)) {
            debug!(?mode, "mode stored for next start");
            self.publisher().mode_changed(mode);
        }
    }

    /// Change playback speed. When running, the tick timer restarts with the
    /// new dot length; a word already playing keeps its original timing.
    ///
    /// # Errors
    /// `MorseError::InvalidWpm` when `wpm == 0`.
    pub fn set_wpm(&self, wpm: u32) -> Result<()> {
        let timing = MorseTiming::from_wpm(wpm)?;
        {
            let mut settings = self.settings.lock();
            if settings.timing == timing {
                return Ok(());
            }
            *settings = PlaybackSettings {
                wpm,
                timing,
                ..*settings
            };
        }

        if !self.post(ControlRequest::SetWpm(wpm)) {
            debug!(wpm, "speed stored for next start");
            self.publisher().speed_changed(wpm, timing);
        }
        Ok(())
    }

    /// Published view of the player. `queued` is read live from the queue.
    pub fn snapshot(&self) -> PlayerSnapshot {
        let mut snapshot = self.snapshot.lock().clone();
        snapshot.queued = self.queue.len();
        snapshot
    }

    pub fn status(&self) -> PlayerStatus {
        self.snapshot.lock().status
    }

    /// Subscribe to live playback events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.event_tx.subscribe()
    }

    /// Snapshot of scheduler counters since the last `start()`.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn queue(&self) -> Arc<BoundedOverwriteQueue<String>> {
        Arc::clone(&self.queue)
    }

    /// Discard every queued word and return how many there were. A word
    /// already playing is unaffected.
    pub fn reset_queue(&self) -> usize {
        let discarded = self.queue.clear();
        self.snapshot.lock().queued = 0;
        info!(discarded, "word queue cleared");
        discarded
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn publisher(&self) -> Publisher {
        Publisher::new(Arc::clone(&self.snapshot), self.event_tx.clone())
    }

    /// Hand a request to the running scheduler. `false` when none is running.
    fn post(&self, request: ControlRequest) -> bool {
        if !self.is_running() {
            return false;
        }
        match self.control_tx.lock().as_ref() {
            Some(control_tx) => control_tx.send(request).is_ok(),
            None => false,
        }
    }
}

impl Drop for MorsePlayer {
    fn drop(&mut self) {
        // Closing the mailbox lets a still-running scheduler wind down.
        self.running.store(false, Ordering::SeqCst);
        self.control_tx.get_mut().take();
    }
}
