//! Tone output.
//!
//! The `ToneEmitter` trait decouples the scheduler from any specific audio
//! backend (cpal device, silent timer, test recorder).
//!
//! `emit` only *schedules* a tone and hands back control immediately. The
//! tone's end is reported through the `ToneCompletion` sender, which the
//! scheduler awaits before dispatching the next command. Silent gaps never
//! reach the emitter; the scheduler waits those out itself.

pub mod device;
pub mod output;
pub mod tone;

pub use output::{CpalToneEmitter, ToneConfig};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::Result;

/// Completion signal for one tone. Sending consumes it, so it fires at most once.
pub type ToneCompletion = oneshot::Sender<()>;

/// Contract for tone output backends.
pub trait ToneEmitter: Send + 'static {
    /// Check the output resource before a word's sequence starts.
    ///
    /// # Errors
    /// Any error means the resource is unavailable and the sequence will be
    /// abandoned without side effects.
    fn prepare(&mut self) -> Result<()>;

    /// Start a continuous tone lasting `duration`.
    ///
    /// Implementations must send on `on_complete` exactly once, and not before
    /// the tone has logically ended. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the tone could not be scheduled; `on_complete` is
    /// then dropped unsent.
    fn emit(&mut self, duration: Duration, on_complete: ToneCompletion) -> Result<()>;
}

/// Thread-safe reference-counted handle to any `ToneEmitter` implementor.
///
/// The lock is only held for the synchronous `prepare`/`emit` calls, never
/// across an await.
#[derive(Clone)]
pub struct EmitterHandle(pub Arc<Mutex<dyn ToneEmitter>>);

impl EmitterHandle {
    /// Wrap any `ToneEmitter` in an `EmitterHandle`.
    pub fn new<E: ToneEmitter>(emitter: E) -> Self {
        Self(Arc::new(Mutex::new(emitter)))
    }
}

impl std::fmt::Debug for EmitterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitterHandle").finish_non_exhaustive()
    }
}

/// Fire `on_complete` once `duration` has elapsed on the Tokio clock.
pub(crate) fn complete_after(duration: Duration, on_complete: ToneCompletion) {
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        let _ = on_complete.send(());
    });
}

/// Emitter with no audio output. Tones still take their full duration so
/// timing behaves exactly as with a real device.
#[derive(Debug, Default)]
pub struct SilentToneEmitter;

impl SilentToneEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl ToneEmitter for SilentToneEmitter {
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn emit(&mut self, duration: Duration, on_complete: ToneCompletion) -> Result<()> {
        debug!(duration_ms = duration.as_millis() as u64, "silent tone");
        complete_after(duration, on_complete);
        Ok(())
    }
}
