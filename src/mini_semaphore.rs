use std::sync::atomic::{AtomicU8, Ordering};

use crate::error_hook::{raise, Fault};

/// Special-purpose SPSC count.
///
/// Not a general semaphore: it is correct only while exactly one thread calls
/// [`put`](Self::put) and exactly one thread calls [`take`](Self::take).
/// Under that rule each counter has a single writer, so plain relaxed
/// single-byte loads and stores suffice — no compare-and-swap, no OS
/// primitive. Cross-thread ordering of the data the count protects is the
/// caller's job (the logger brackets handoff with fences).
///
/// Both counters wrap mod 256, which is harmless while the tracked count
/// never exceeds 255.
pub struct MiniSemaphore {
    puts: AtomicU8,
    gets: AtomicU8,
}

impl MiniSemaphore {
    pub const fn new() -> Self {
        Self {
            puts: AtomicU8::new(0),
            gets: AtomicU8::new(0),
        }
    }

    /// Raise the count. Producer side only.
    pub fn put(&self) {
        let n = self.puts.load(Ordering::Relaxed);
        self.puts.store(n.wrapping_add(1), Ordering::Relaxed);
    }

    /// Current count: unmatched puts, mod 256. Safe from either side.
    pub fn peek(&self) -> u8 {
        self.puts
            .load(Ordering::Relaxed)
            .wrapping_sub(self.gets.load(Ordering::Relaxed))
    }

    /// Lower the count. Consumer side only. Taking with a zero count is an
    /// internal bug: it raises [`Fault::SemaphoreUnderflow`] and leaves the
    /// count untouched.
    pub fn take(&self) {
        let gets = self.gets.load(Ordering::Relaxed);
        if self.puts.load(Ordering::Relaxed) == gets {
            raise(Fault::SemaphoreUnderflow);
            return;
        }
        self.gets.store(gets.wrapping_add(1), Ordering::Relaxed);
    }
}

impl Default for MiniSemaphore {
    fn default() -> Self {
        Self::new()
    }
}
