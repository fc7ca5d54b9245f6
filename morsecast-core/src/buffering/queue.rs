//! Bounded multi-producer / single-consumer word queue with overwrite-on-full.
//!
//! Every operation takes the same `parking_lot::Mutex` exactly once, so a
//! producer's `push` can never interleave with the consumer's `pop`. The
//! storage is a heap-allocated `ringbuf` ring used unsplit behind the lock.

use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer},
    HeapRb,
};
use serde::{Deserialize, Serialize};

use crate::error::{MorseError, Result};

/// What a push does when the queue is already full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverflowPolicy {
    /// Evict the oldest resident item and return it.
    #[default]
    OverwriteOldest,
    /// Keep the resident items and hand the new item back to the caller.
    RejectNewest,
}

struct QueueInner<T> {
    ring: HeapRb<T>,
    /// Items dropped by the overflow policy since creation.
    evicted: u64,
}

/// Fixed-capacity FIFO shared between producers and one consumer.
///
/// Share it as `Arc<BoundedOverwriteQueue<T>>`; all methods take `&self`.
pub struct BoundedOverwriteQueue<T> {
    inner: Mutex<QueueInner<T>>,
    capacity: usize,
    policy: OverflowPolicy,
}

impl<T> BoundedOverwriteQueue<T> {
    /// Create a queue using [`OverflowPolicy::OverwriteOldest`].
    ///
    /// # Errors
    /// `MorseError::InvalidCapacity` when `capacity == 0`.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_policy(capacity, OverflowPolicy::OverwriteOldest)
    }

    /// Create a queue with an explicit overflow policy.
    ///
    /// # Errors
    /// `MorseError::InvalidCapacity` when `capacity == 0`.
    pub fn with_policy(capacity: usize, policy: OverflowPolicy) -> Result<Self> {
        if capacity == 0 {
            return Err(MorseError::InvalidCapacity);
        }
        Ok(Self {
            inner: Mutex::new(QueueInner {
                ring: HeapRb::new(capacity),
                evicted: 0,
            }),
            capacity,
            policy,
        })
    }

    /// Insert at the tail.
    ///
    /// Returns the item that did not survive the push: the evicted oldest
    /// item under `OverwriteOldest`, or `item` itself under `RejectNewest`.
    /// Returns `None` when there was room. Never blocks.
    pub fn push(&self, item: T) -> Option<T> {
        let mut inner = self.inner.lock();
        Self::push_locked(&mut inner, self.policy, item)
    }

    /// Push several items under a single critical section.
    ///
    /// Returns every item dropped by the overflow policy, oldest first.
    pub fn push_batch<I>(&self, items: I) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        let mut inner = self.inner.lock();
        items
            .into_iter()
            .filter_map(|item| Self::push_locked(&mut inner, self.policy, item))
            .collect()
    }

    /// Remove and return the oldest item. Never blocks.
    pub fn pop(&self) -> Option<T> {
        self.inner.lock().ring.try_pop()
    }

    /// Drop every resident item. Returns how many were discarded.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let discarded = inner.ring.occupied_len();
        inner.ring.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.inner.lock().ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().ring.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Total number of items dropped by the overflow policy.
    pub fn evicted_total(&self) -> u64 {
        self.inner.lock().evicted
    }

    fn push_locked(inner: &mut QueueInner<T>, policy: OverflowPolicy, item: T) -> Option<T> {
        if !inner.ring.is_full() {
            // Cannot fail: the ring has a vacant slot and we hold the lock.
            return inner.ring.try_push(item).err();
        }

        inner.evicted = inner.evicted.saturating_add(1);
        match policy {
            OverflowPolicy::OverwriteOldest => {
                let oldest = inner.ring.try_pop();
                if let Err(rejected) = inner.ring.try_push(item) {
                    return Some(rejected);
                }
                oldest
            }
            OverflowPolicy::RejectNewest => Some(item),
        }
    }
}

impl<T: Clone> BoundedOverwriteQueue<T> {
    /// Copy of the resident items, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock().ring.iter().cloned().collect()
    }
}

impl<T> std::fmt::Debug for BoundedOverwriteQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedOverwriteQueue")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
