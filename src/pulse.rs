//! Lock-free feed pulses from concurrent contexts.
//!
//! Feeds arrive from the main loop, the communication handler and
//! arbitrary tasks. Rather than sharing the registry, each context pushes a
//! timestamped [`FeedPulse`] into a [`FeedQueue`]; the supervisor drains
//! the queue at the start of every tick, in the same context as the scan.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Main loop   │────▶│              │     │              │
//! │ Comm task   │────▶│  FeedQueue   │────▶│  tick()      │
//! │ Other tasks │────▶│  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Pulses carry the producer's timestamp. A pulse that is applied late
//! never moves a record's baseline backwards.

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::mpmc::Q32;

use crate::watchdog::WatchdogId;

/// Maximum number of pending pulses.
pub const FEED_QUEUE_CAP: usize = 32;

/// A liveness signal captured at `at_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedPulse {
    pub id: WatchdogId,
    pub at_ms: u64,
}

/// Multi-producer feed queue. Usable from a `static`.
pub struct FeedQueue {
    queue: Q32<FeedPulse>,
    dropped: AtomicU32,
}

impl FeedQueue {
    pub const fn new() -> Self {
        Self {
            queue: Q32::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Queue a pulse. Safe from any thread; never blocks.
    /// Returns `false` if the queue is full (pulse dropped).
    pub fn push(&self, id: WatchdogId, at_ms: u64) -> bool {
        if self.queue.enqueue(FeedPulse { id, at_ms }).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn pop(&self) -> Option<FeedPulse> {
        self.queue.dequeue()
    }

    /// Drain all pending pulses in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(FeedPulse)) -> usize {
        let mut n = 0;
        while let Some(pulse) = self.pop() {
            handler(pulse);
            n += 1;
        }
        n
    }

    /// Pulses lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for FeedQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for FeedQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FeedQueue")
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}
