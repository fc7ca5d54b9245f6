//! Playback scheduler task.
//!
//! A single Tokio task owns the playback state. Every loop iteration races
//! three sources:
//!
//! ```text
//!   control mailbox ──► SetMode / SetWpm / Stop
//!   in-flight word  ──► sequence finished → Idle
//!   tick deadline   ──► pop one word unless a word is in flight
//! ```
//!
//! A word's command sequence runs as one future stored in the loop. Ticks keep
//! arriving while it plays; they are counted and otherwise ignored, so a
//! second word can never start before the first one's last command finishes.

use std::future::Future;
use std::pin::Pin;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use super::timer::TickTimer;
use crate::{
    audio::EmitterHandle,
    buffering::BoundedOverwriteQueue,
    ipc::events::{PlaybackEvent, PlayerSnapshot, PlayerStatus},
    morse::{encode, to_symbols, Mode, MorseTiming, PlaybackCommand},
};

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

pub struct SchedulerDiagnostics {
    pub ticks: AtomicUsize,
    pub ticks_while_draining: AtomicUsize,
    pub idle_ticks: AtomicUsize,
    pub words_drained: AtomicUsize,
    pub tones_emitted: AtomicUsize,
    pub silences_waited: AtomicUsize,
    pub sequences_abandoned: AtomicUsize,
}

impl Default for SchedulerDiagnostics {
    fn default() -> Self {
        Self {
            ticks: AtomicUsize::new(0),
            ticks_while_draining: AtomicUsize::new(0),
            idle_ticks: AtomicUsize::new(0),
            words_drained: AtomicUsize::new(0),
            tones_emitted: AtomicUsize::new(0),
            silences_waited: AtomicUsize::new(0),
            sequences_abandoned: AtomicUsize::new(0),
        }
    }
}

impl SchedulerDiagnostics {
    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
        self.ticks_while_draining.store(0, Ordering::Relaxed);
        self.idle_ticks.store(0, Ordering::Relaxed);
        self.words_drained.store(0, Ordering::Relaxed);
        self.tones_emitted.store(0, Ordering::Relaxed);
        self.silences_waited.store(0, Ordering::Relaxed);
        self.sequences_abandoned.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            ticks_while_draining: self.ticks_while_draining.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
            words_drained: self.words_drained.load(Ordering::Relaxed),
            tones_emitted: self.tones_emitted.load(Ordering::Relaxed),
            silences_waited: self.silences_waited.load(Ordering::Relaxed),
            sequences_abandoned: self.sequences_abandoned.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub ticks: usize,
    pub ticks_while_draining: usize,
    pub idle_ticks: usize,
    pub words_drained: usize,
    pub tones_emitted: usize,
    pub silences_waited: usize,
    pub sequences_abandoned: usize,
}

// ---------------------------------------------------------------------------
// Shared state publishing
// ---------------------------------------------------------------------------

/// Writes the shared snapshot and fans the matching event out to observers.
///
/// The snapshot lock is only taken for field updates, never across an await.
#[derive(Clone)]
pub(crate) struct Publisher {
    snapshot: Arc<Mutex<PlayerSnapshot>>,
    event_tx: broadcast::Sender<PlaybackEvent>,
}

impl Publisher {
    pub(crate) fn new(
        snapshot: Arc<Mutex<PlayerSnapshot>>,
        event_tx: broadcast::Sender<PlaybackEvent>,
    ) -> Self {
        Self { snapshot, event_tx }
    }

    pub(crate) fn send(&self, event: PlaybackEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    pub(crate) fn set_status(&self, status: PlayerStatus, is_playing: bool) {
        let changed = {
            let mut snapshot = self.snapshot.lock();
            let changed = snapshot.status != status;
            snapshot.status = status;
            snapshot.is_playing = is_playing;
            changed
        };
        if changed {
            self.send(PlaybackEvent::Status { status });
        }
    }

    fn set_playing(&self, is_playing: bool) {
        self.snapshot.lock().is_playing = is_playing;
    }

    pub(crate) fn mode_changed(&self, mode: Mode) {
        self.snapshot.lock().mode = mode;
        self.send(PlaybackEvent::ModeChanged { mode });
    }

    pub(crate) fn speed_changed(&self, wpm: u32, timing: MorseTiming) {
        let dot_duration_secs = timing.dot().as_secs_f64();
        {
            let mut snapshot = self.snapshot.lock();
            snapshot.wpm = wpm;
            snapshot.dot_duration_secs = dot_duration_secs;
        }
        self.send(PlaybackEvent::SpeedChanged {
            wpm,
            dot_duration_secs,
        });
    }

    fn set_queued(&self, queued: usize) {
        self.snapshot.lock().queued = queued;
    }

    fn set_current_word(&self, word: &str) {
        self.snapshot.lock().current_word = word.to_owned();
    }
}

// ---------------------------------------------------------------------------
// Scheduler context
// ---------------------------------------------------------------------------

/// Requests marshaled onto the scheduler task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    SetMode(Mode),
    SetWpm(u32),
    Stop,
}

/// Everything the scheduler task needs, moved in at spawn time.
pub struct SchedulerContext {
    pub queue: Arc<BoundedOverwriteQueue<String>>,
    pub emitter: EmitterHandle,
    pub control_rx: mpsc::UnboundedReceiver<ControlRequest>,
    pub running: Arc<AtomicBool>,
    pub(crate) publisher: Publisher,
    pub diagnostics: Arc<SchedulerDiagnostics>,
    pub mode: Mode,
    pub wpm: u32,
    pub timing: MorseTiming,
}

type WordFuture = Pin<Box<dyn Future<Output = WordReport> + Send>>;

#[derive(Debug)]
enum WordOutcome {
    Completed,
    Abandoned(String),
}

#[derive(Debug)]
struct WordReport {
    seq: u64,
    word: String,
    outcome: WordOutcome,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

/// Drive playback until a `Stop` request arrives or the control channel closes.
///
/// On stop the tick timer is dropped at once. A word in flight finishes the
/// command it is on; its remaining commands are abandoned.
pub async fn run(mut ctx: SchedulerContext) {
    let mut mode = ctx.mode;
    let mut wpm = ctx.wpm;
    let mut timing = ctx.timing;
    let mut timer = TickTimer::start(timing.dot());
    let mut in_flight: Option<WordFuture> = None;
    let mut next_seq: u64 = 0;

    info!(
        ?mode,
        wpm,
        dot_ms = timing.dot().as_millis() as u64,
        "scheduler started"
    );
    ctx.publisher.set_status(PlayerStatus::Idle, false);

    loop {
        tokio::select! {
            biased;

            request = ctx.control_rx.recv() => match request {
                Some(ControlRequest::SetMode(new_mode)) => {
                    if new_mode != mode {
                        mode = new_mode;
                        info!(?mode, "mode changed; applies to the next word");
                        ctx.publisher.mode_changed(mode);
                    }
                }
                Some(ControlRequest::SetWpm(new_wpm)) => match MorseTiming::from_wpm(new_wpm) {
                    Ok(new_timing) if new_timing != timing => {
                        wpm = new_wpm;
                        timing = new_timing;
                        timer.restart(timing.dot());
                        info!(
                            wpm,
                            dot_ms = timing.dot().as_millis() as u64,
                            "speed changed; tick timer restarted"
                        );
                        ctx.publisher.speed_changed(wpm, timing);
                    }
                    Ok(_) => debug!(wpm = new_wpm, "speed unchanged"),
                    Err(e) => warn!("ignoring speed change: {e}"),
                },
                Some(ControlRequest::Stop) | None => break,
            },

            report = wait_in_flight(&mut in_flight) => {
                in_flight = None;
                finish_word(&ctx, report);
            }

            _ = timer.tick() => {
                let work_started = Instant::now();
                on_tick(&ctx, &mut in_flight, &mut next_seq, mode, timing);
                timer.schedule_next(work_started);
            }
        }
    }

    // Also covers a closed control channel: the word in flight must not
    // play past its current command.
    ctx.running.store(false, Ordering::SeqCst);
    drop(timer);

    if let Some(word) = in_flight.take() {
        debug!("waiting for the in-flight command to finish");
        let report = word.await;
        finish_word(&ctx, report);
    }

    ctx.publisher.set_queued(ctx.queue.len());
    ctx.publisher.set_status(PlayerStatus::Stopped, false);
    info!("scheduler stopped");
}

/// Resolve with the in-flight word's report, or never when nothing plays.
async fn wait_in_flight(in_flight: &mut Option<WordFuture>) -> WordReport {
    match in_flight.as_mut() {
        Some(word) => word.await,
        None => std::future::pending().await,
    }
}

fn on_tick(
    ctx: &SchedulerContext,
    in_flight: &mut Option<WordFuture>,
    next_seq: &mut u64,
    mode: Mode,
    timing: MorseTiming,
) {
    SchedulerDiagnostics::bump(&ctx.diagnostics.ticks);

    if in_flight.is_some() {
        SchedulerDiagnostics::bump(&ctx.diagnostics.ticks_while_draining);
        return;
    }

    // Stop was requested but not yet received: leave queued words for the
    // next start.
    if !ctx.running.load(Ordering::SeqCst) {
        return;
    }

    let Some(word) = ctx.queue.pop() else {
        SchedulerDiagnostics::bump(&ctx.diagnostics.idle_ticks);
        return;
    };

    *next_seq += 1;
    let seq = *next_seq;
    // Mode and timing are frozen here for the whole word.
    let commands = encode(&word, mode, timing.dot());
    let symbols = to_symbols(&word, mode);

    let span = info_span!("word", seq, word = %word, ?mode);
    span.in_scope(|| {
        debug!(
            commands = commands.len(),
            symbols = %symbols,
            queued = ctx.queue.len(),
            "word popped"
        );
    });

    ctx.publisher.set_queued(ctx.queue.len());
    ctx.publisher.set_status(PlayerStatus::Draining, false);

    let sequence = WordSequence {
        seq,
        mode,
        emitter: ctx.emitter.clone(),
        running: Arc::clone(&ctx.running),
        publisher: ctx.publisher.clone(),
        diagnostics: Arc::clone(&ctx.diagnostics),
    };
    *in_flight = Some(Box::pin(
        sequence.play(word, symbols, commands).instrument(span),
    ));
}

fn finish_word(ctx: &SchedulerContext, report: WordReport) {
    let WordReport { seq, word, outcome } = report;
    match outcome {
        WordOutcome::Completed => {
            SchedulerDiagnostics::bump(&ctx.diagnostics.words_drained);
            debug!(seq, word = %word, "word finished");
            ctx.publisher.send(PlaybackEvent::WordFinished { seq, word });
        }
        WordOutcome::Abandoned(reason) => {
            SchedulerDiagnostics::bump(&ctx.diagnostics.sequences_abandoned);
            warn!(seq, word = %word, "sequence abandoned: {reason}");
            ctx.publisher
                .send(PlaybackEvent::WordAbandoned { seq, word, reason });
        }
    }
    ctx.publisher.set_queued(ctx.queue.len());
    ctx.publisher.set_status(PlayerStatus::Idle, false);
}

// ---------------------------------------------------------------------------
// One word's command sequence
// ---------------------------------------------------------------------------

struct WordSequence {
    seq: u64,
    mode: Mode,
    emitter: EmitterHandle,
    running: Arc<AtomicBool>,
    publisher: Publisher,
    diagnostics: Arc<SchedulerDiagnostics>,
}

impl WordSequence {
    async fn play(
        self,
        word: String,
        symbols: String,
        commands: Vec<PlaybackCommand>,
    ) -> WordReport {
        let prepared = self.emitter.0.lock().prepare();
        let outcome = match prepared {
            // Nothing about the word is published when the emitter is not ready.
            Err(e) => WordOutcome::Abandoned(e.to_string()),
            Ok(()) => {
                self.announce(&word, symbols, commands.len());
                self.dispatch(&commands).await
            }
        };
        WordReport {
            seq: self.seq,
            word,
            outcome,
        }
    }

    fn announce(&self, word: &str, symbols: String, commands: usize) {
        self.publisher.set_current_word(word);
        self.publisher.send(PlaybackEvent::WordStarted {
            seq: self.seq,
            word: word.to_owned(),
            symbols,
            mode: self.mode,
            commands,
        });
    }

    /// Run commands strictly one after another.
    async fn dispatch(&self, commands: &[PlaybackCommand]) -> WordOutcome {
        for command in commands {
            if !self.running.load(Ordering::SeqCst) {
                return WordOutcome::Abandoned("player stopped".into());
            }

            if command.tone_on {
                self.publisher.set_status(PlayerStatus::PlayingTone, true);
                self.publisher.send(PlaybackEvent::Tone {
                    seq: self.seq,
                    duration_ms: command.duration.as_millis() as u64,
                });

                let (done_tx, done_rx) = oneshot::channel();
                let scheduled = self.emitter.0.lock().emit(command.duration, done_tx);
                if let Err(e) = scheduled {
                    self.publisher.set_playing(false);
                    return WordOutcome::Abandoned(e.to_string());
                }

                let completed = done_rx.await;
                self.publisher.set_playing(false);
                if completed.is_err() {
                    return WordOutcome::Abandoned(
                        "tone emitter dropped its completion signal".into(),
                    );
                }
                SchedulerDiagnostics::bump(&self.diagnostics.tones_emitted);
            } else {
                self.publisher.set_status(PlayerStatus::WaitingSilence, false);
                tokio::time::sleep(command.duration).await;
                SchedulerDiagnostics::bump(&self.diagnostics.silences_waited);
            }
        }

        WordOutcome::Completed
    }
}
