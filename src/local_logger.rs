use std::cell::UnsafeCell;
use std::io::Write;
use std::sync::atomic::{fence, AtomicBool, AtomicU8, Ordering};

use crate::capture::{Capture, RecordFn};
use crate::capture_arena::CaptureArena;
use crate::error_hook::{raise, Fault};
use crate::log_server::{Drain, ServerLink};
use crate::mini_semaphore::MiniSemaphore;

/// Per-producer capture state: `N` arenas of `B` bytes used as a ring.
///
/// The logger itself is inert shared state; the producer side is driven
/// through the unique [`Producer`] handle from exactly one thread, while the
/// consumer thread drains filled arenas through the server. The two sides
/// meet only in the `buffers_full` count and the fences around handoff —
/// recording never locks, allocates, or enters the kernel.
///
/// `N` is the arena count (1..=255), `B` the arena size in bytes; `B` must
/// hold the largest record ever produced.
pub struct LocalLogger<const N: usize, const B: usize> {
    buffers: [UnsafeCell<CaptureArena<B>>; N],
    write_index: AtomicU8,
    read_index: AtomicU8,
    buffers_full: MiniSemaphore,
    claimed: AtomicBool,
}

// The arenas are written by the single producer and read by the single
// consumer, with ownership of each slot arbitrated by `buffers_full`.
unsafe impl<const N: usize, const B: usize> Sync for LocalLogger<N, B> {}

impl<const N: usize, const B: usize> LocalLogger<N, B> {
    pub const fn new() -> Self {
        const { assert!(N >= 1 && N <= 255, "arena count must be in 1..=255") };
        Self {
            buffers: [const { UnsafeCell::new(CaptureArena::new()) }; N],
            write_index: AtomicU8::new(0),
            read_index: AtomicU8::new(0),
            buffers_full: MiniSemaphore::new(),
            claimed: AtomicBool::new(false),
        }
    }

    /// Hand out the producer side. Returns `None` once claimed: a second
    /// live handle would break the single-producer contract.
    pub fn producer(&'static self) -> Option<Producer<N, B>> {
        if self.claimed.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(Producer {
            logger: self,
            server: None,
        })
    }

    fn full(&self) -> bool {
        self.buffers_full.peek() as usize == N
    }
}

impl<const N: usize, const B: usize> Default for LocalLogger<N, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const B: usize> Drain for LocalLogger<N, B> {
    fn drain_one(&self, out: &mut dyn Write) -> bool {
        if self.buffers_full.peek() == 0 {
            return false;
        }
        // Pairs with the producer's release fence in advance(): every store
        // into the arena is visible before we read it.
        fence(Ordering::Acquire);
        let ri = self.read_index.load(Ordering::Relaxed) as usize;
        unsafe { (*self.buffers[ri].get()).drain(out) };
        self.read_index
            .store(((ri + 1) % N) as u8, Ordering::Relaxed);
        // The reset must be visible before the producer can observe the
        // released slot.
        fence(Ordering::Release);
        self.buffers_full.take();
        true
    }
}

/// Unique producer handle for one [`LocalLogger`].
///
/// Obtained from [`LocalLogger::producer`], registered with a server via
/// [`LogServer::register`](crate::log_server::LogServer::register), then used
/// from that one thread only. Dropping a registered handle flushes.
pub struct Producer<const N: usize, const B: usize> {
    logger: &'static LocalLogger<N, B>,
    pub(crate) server: Option<&'static dyn ServerLink>,
}

impl<const N: usize, const B: usize> Producer<N, B> {
    pub(crate) fn logger(&self) -> &'static LocalLogger<N, B> {
        self.logger
    }

    /// Capture one record: copy `values` into the current arena together
    /// with the format callable that will replay them at drain time.
    ///
    /// The fast path: one fullness check, one bump-pointer copy. On arena
    /// overflow the ring advances and the push is retried once; a record
    /// that cannot fit in an empty arena raises [`Fault::EntryTooLarge`],
    /// and a ring with all `N` arenas awaiting the consumer raises
    /// [`Fault::LoggerFull`]. Either way the event is dropped if the hook
    /// returns.
    pub fn record<T: Capture>(&mut self, values: T, print: RecordFn<T>) {
        let logger = self.logger;
        if logger.full() {
            raise(Fault::LoggerFull);
            return;
        }
        // Pairs with the consumer's release fence in drain_one(): the reset
        // of a recycled slot is visible before we write into it.
        fence(Ordering::Acquire);
        let wi = logger.write_index.load(Ordering::Relaxed) as usize;
        let arena = unsafe { &mut *logger.buffers[wi].get() };
        if arena.try_push(print, values) {
            return;
        }

        self.advance();
        if logger.full() {
            // advance() handed off the last free arena; the slot now under
            // write_index still belongs to the consumer.
            raise(Fault::LoggerFull);
            return;
        }
        fence(Ordering::Acquire);
        let wi = logger.write_index.load(Ordering::Relaxed) as usize;
        let arena = unsafe { &mut *logger.buffers[wi].get() };
        if !arena.try_push(print, values) {
            raise(Fault::EntryTooLarge);
        }
    }

    /// Hand the current arena to the consumer even though it is not full.
    /// A flush with nothing captured is a no-op and does not wake anyone.
    pub fn flush(&mut self) {
        if self.logger.full() {
            // Every arena, the current slot included, is awaiting the
            // consumer; the producer holds nothing it could hand off.
            raise(Fault::LoggerFull);
            return;
        }
        // Pairs with the consumer's release fence in drain_one(), as in
        // record(): the reset of a recycled slot is visible before we read
        // its fill state.
        fence(Ordering::Acquire);
        let wi = self.logger.write_index.load(Ordering::Relaxed) as usize;
        let empty = unsafe { (*self.logger.buffers[wi].get()).is_empty() };
        if !empty {
            self.advance();
        }
    }

    fn advance(&mut self) {
        let logger = self.logger;
        if logger.full() {
            raise(Fault::LoggerFull);
            return;
        }
        let wi = logger.write_index.load(Ordering::Relaxed) as usize;
        logger
            .write_index
            .store(((wi + 1) % N) as u8, Ordering::Relaxed);
        // Every store into the outgoing arena must be visible before the
        // consumer can observe the raised count.
        fence(Ordering::Release);
        logger.buffers_full.put();
        match self.server {
            Some(server) => server.notify_dump_available(),
            None => raise(Fault::UnregisteredLogger),
        }
    }
}

impl<const N: usize, const B: usize> Drop for Producer<N, B> {
    fn drop(&mut self) {
        if self.server.is_some() {
            self.flush();
        }
    }
}

/// Capture one record through a printf-like surface.
///
/// `record!(producer, "format", args…)` copies up to eight arguments by value
/// and defers all formatting to the consumer thread, which renders the
/// format string with the captured values and a trailing newline. Format
/// string and arguments are checked against each other at compile time.
/// Arguments must satisfy [`Capture`](crate::Capture); for wider packs, call
/// [`Producer::record`] directly.
#[macro_export]
macro_rules! record {
    ($producer:expr, $fmt:literal $(,)?) => {
        $producer.record((), |_values, out| {
            use ::std::io::Write as _;
            let _ = ::std::writeln!(out, $fmt);
        })
    };
    ($producer:expr, $fmt:literal, $a0:expr $(,)?) => {
        $producer.record(($a0,), |values, out| {
            use ::std::io::Write as _;
            let _ = ::std::writeln!(out, $fmt, values.0);
        })
    };
    ($producer:expr, $fmt:literal, $a0:expr, $a1:expr $(,)?) => {
        $producer.record(($a0, $a1), |values, out| {
            use ::std::io::Write as _;
            let _ = ::std::writeln!(out, $fmt, values.0, values.1);
        })
    };
    ($producer:expr, $fmt:literal, $a0:expr, $a1:expr, $a2:expr $(,)?) => {
        $producer.record(($a0, $a1, $a2), |values, out| {
            use ::std::io::Write as _;
            let _ = ::std::writeln!(out, $fmt, values.0, values.1, values.2);
        })
    };
    ($producer:expr, $fmt:literal, $a0:expr, $a1:expr, $a2:expr, $a3:expr $(,)?) => {
        $producer.record(
            ($a0, $a1, $a2, $a3),
            |values, out| {
                use ::std::io::Write as _;
                let _ = ::std::writeln!(out, $fmt, values.0, values.1, values.2, values.3);
            },
        )
    };
    ($producer:expr, $fmt:literal, $a0:expr, $a1:expr, $a2:expr, $a3:expr, $a4:expr $(,)?) => {
        $producer.record(
            ($a0, $a1, $a2, $a3, $a4),
            |values, out| {
                use ::std::io::Write as _;
                let _ = ::std::writeln!(
                    out, $fmt, values.0, values.1, values.2, values.3, values.4
                );
            },
        )
    };
    ($producer:expr, $fmt:literal, $a0:expr, $a1:expr, $a2:expr, $a3:expr, $a4:expr, $a5:expr $(,)?) => {
        $producer.record(
            ($a0, $a1, $a2, $a3, $a4, $a5),
            |values, out| {
                use ::std::io::Write as _;
                let _ = ::std::writeln!(
                    out, $fmt, values.0, values.1, values.2, values.3, values.4, values.5
                );
            },
        )
    };
    ($producer:expr, $fmt:literal, $a0:expr, $a1:expr, $a2:expr, $a3:expr, $a4:expr, $a5:expr, $a6:expr $(,)?) => {
        $producer.record(
            ($a0, $a1, $a2, $a3, $a4, $a5, $a6),
            |values, out| {
                use ::std::io::Write as _;
                let _ = ::std::writeln!(
                    out, $fmt, values.0, values.1, values.2, values.3, values.4, values.5,
                    values.6
                );
            },
        )
    };
    ($producer:expr, $fmt:literal, $a0:expr, $a1:expr, $a2:expr, $a3:expr, $a4:expr, $a5:expr, $a6:expr, $a7:expr $(,)?) => {
        $producer.record(
            ($a0, $a1, $a2, $a3, $a4, $a5, $a6, $a7),
            |values, out| {
                use ::std::io::Write as _;
                let _ = ::std::writeln!(
                    out, $fmt, values.0, values.1, values.2, values.3, values.4, values.5,
                    values.6, values.7
                );
            },
        )
    };
}
