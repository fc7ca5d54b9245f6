//! Buffers between the asynchronous edges of the system.
//!
//! - [`queue::BoundedOverwriteQueue`] carries recognized words from any number
//!   of producers to the playback scheduler.
//! - The SPSC sample ring carries synthesized tone samples from the emitter to
//!   the real-time output callback. `ringbuf::HeapRb<f32>` gives a wait-free
//!   `pop_slice` safe to call from the audio thread.

pub mod queue;

use ringbuf::{traits::Split, HeapRb};

pub use queue::{BoundedOverwriteQueue, OverflowPolicy};
pub use ringbuf::traits::{Consumer, Observer, Producer};

/// Producer half, held by the tone emitter.
pub type SampleProducer = ringbuf::HeapProd<f32>;

/// Consumer half, held by the output callback thread.
pub type SampleConsumer = ringbuf::HeapCons<f32>;

/// Sample ring capacity: 2^18 = 262 144 f32 samples ≈ 5.4 s at 48 kHz.
/// The longest single tone is a dash at 5 WPM (0.72 s), so one tone always fits.
pub const SAMPLE_RING_CAPACITY: usize = 1 << 18;

/// Create a matched producer/consumer pair backed by a heap-allocated ring buffer.
pub fn create_sample_ring() -> (SampleProducer, SampleConsumer) {
    HeapRb::<f32>::new(SAMPLE_RING_CAPACITY).split()
}
