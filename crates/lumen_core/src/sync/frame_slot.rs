//! # Latest-Wins Frame Slot
//!
//! Single-producer, single-consumer hand-off of the most recent item.
//!
//! ## Architecture
//!
//! ```text
//!              ┌──────────────────────────────┐
//!              │          FrameSlot<T>        │
//!              │                              │
//!              │  ┌────────────────────────┐  │
//!              │  │  Mutex<Option<T>>      │  │
//!              │  └────────────────────────┘  │
//!              │  ┌────────────────────────┐  │
//!              │  │  consumed: AtomicBool  │  │
//!              │  └────────────────────────┘  │
//!              └──────────────────────────────┘
//!                 ▲                        │
//!          write(T) -> overwrote?   take_if_present() -> Option<T>
//!          (producer thread)        (render thread)
//! ```
//!
//! ## Thread Safety
//!
//! - The mutex is held only to swap the `Option`, never while dropping or
//!   cloning pixels.
//! - `consumed` lets the consumer skip the lock on ticks with nothing new.
//! - The flag is always updated while the lock is held, so it never
//!   disagrees with the slot contents once the lock is released.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

/// Holds the most recent item written by a producer until the consumer takes it.
///
/// ## Usage
///
/// ```rust
/// use lumen_core::FrameSlot;
///
/// let slot = FrameSlot::new();
/// slot.write(1);
/// slot.write(2);
/// assert_eq!(slot.take_if_present(), Some(2));
/// assert_eq!(slot.take_if_present(), None);
/// ```
pub struct FrameSlot<T> {
    item: Mutex<Option<T>>,
    consumed: AtomicBool,
    writes: AtomicU64,
    overwrites: AtomicU64,
}

impl<T> FrameSlot<T> {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            item: Mutex::new(None),
            consumed: AtomicBool::new(true),
            writes: AtomicU64::new(0),
            overwrites: AtomicU64::new(0),
        }
    }

    /// Stores `item`, replacing any item not yet taken.
    ///
    /// Returns `true` if an unconsumed item was overwritten. Producers use a
    /// `false` return to decide whether the consumer needs a new tick.
    pub fn write(&self, item: T) -> bool {
        let previous = {
            let mut guard = self.item.lock();
            let previous = guard.replace(item);
            self.consumed.store(false, Ordering::Release);
            previous
        };
        self.writes.fetch_add(1, Ordering::Relaxed);
        let overwrote = previous.is_some();
        if overwrote {
            self.overwrites.fetch_add(1, Ordering::Relaxed);
        }
        // Old pixels are released here, outside the lock.
        drop(previous);
        overwrote
    }

    /// Takes the latest item if one arrived since the last take.
    ///
    /// Each written item is returned at most once.
    #[must_use]
    pub fn take_if_present(&self) -> Option<T> {
        if self.consumed.load(Ordering::Acquire) {
            return None;
        }
        let mut guard = self.item.lock();
        let item = guard.take();
        self.consumed.store(true, Ordering::Release);
        item
    }

    /// Returns whether the last written item has been taken.
    #[inline]
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }

    /// Total number of writes.
    #[inline]
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of items overwritten before the consumer took them.
    #[inline]
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.overwrites.load(Ordering::Relaxed)
    }

    /// Discards any pending item.
    pub fn clear(&self) {
        let pending = {
            let mut guard = self.item.lock();
            self.consumed.store(true, Ordering::Release);
            guard.take()
        };
        drop(pending);
    }
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for FrameSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSlot")
            .field("consumed", &self.is_consumed())
            .field("writes", &self.writes())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_slot_yields_nothing() {
        let slot: FrameSlot<u32> = FrameSlot::new();
        assert!(slot.is_consumed());
        assert_eq!(slot.take_if_present(), None);
    }

    #[test]
    fn test_latest_write_wins() {
        let slot = FrameSlot::new();
        assert!(!slot.write("f1"));
        assert!(slot.write("f2"));
        assert!(slot.write("f3"));

        assert_eq!(slot.take_if_present(), Some("f3"));
        assert_eq!(slot.take_if_present(), None);
        assert_eq!(slot.writes(), 3);
        assert_eq!(slot.dropped(), 2);
    }

    #[test]
    fn test_write_after_take_is_not_overwrite() {
        let slot = FrameSlot::new();
        slot.write(1);
        assert_eq!(slot.take_if_present(), Some(1));
        assert!(!slot.write(2));
        assert!(!slot.is_consumed());
        assert_eq!(slot.take_if_present(), Some(2));
    }

    #[test]
    fn test_clear_discards_pending() {
        let slot = FrameSlot::new();
        slot.write(7);
        slot.clear();
        assert!(slot.is_consumed());
        assert_eq!(slot.take_if_present(), None);
    }

    #[test]
    fn test_concurrent_items_seen_at_most_once_in_order() {
        const WRITES: u64 = 50_000;

        let slot = Arc::new(FrameSlot::new());
        let producer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                for i in 1..=WRITES {
                    slot.write(i);
                }
            })
        };

        let mut last = 0;
        let mut seen = 0u64;
        loop {
            if let Some(v) = slot.take_if_present() {
                // Never a repeat, never older than something already seen.
                assert!(v > last, "saw {v} after {last}");
                last = v;
                seen += 1;
                if v == WRITES {
                    break;
                }
            } else if producer.is_finished() && slot.is_consumed() {
                break;
            } else {
                thread::yield_now();
            }
        }
        producer.join().unwrap();

        assert_eq!(last, WRITES, "final write must be observed");
        assert!(seen <= WRITES);
        assert_eq!(slot.writes(), WRITES);
    }
}
