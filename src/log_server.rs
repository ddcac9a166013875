use std::cell::UnsafeCell;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error_hook::{raise, Fault};
use crate::local_logger::Producer;
use crate::platform::Platform;

/// Consumer-side view of a registered logger.
pub(crate) trait Drain: Sync {
    /// Drain at most one filled arena. Returns whether work was done.
    fn drain_one(&self, out: &mut dyn Write) -> bool;
}

/// Producer-side view of the server: the dump-available entry point called
/// after an arena handoff.
pub(crate) trait ServerLink: Sync {
    fn notify_dump_available(&self);
}

struct Registry<const MAX: usize> {
    loggers: [Option<&'static dyn Drain>; MAX],
    len: usize,
}

/// Fan-in point for every [`LocalLogger`](crate::LocalLogger): a fixed
/// registry plus the consumer loop that formats and writes records.
///
/// The registry is touched only under the platform adapter's lock — by
/// producers registering at setup and by the consumer while draining. The
/// `record` fast path never takes it. `W` is the output sink every record's
/// format callable writes into; `MAX` is the registry capacity.
///
/// Loggers must outlive the server; there is no deregistration. The
/// documented pattern is static lifetime for both.
pub struct LogServer<W, P, const MAX: usize>
where
    W: Write + Send + 'static,
    P: Platform,
{
    registry: UnsafeCell<Registry<MAX>>,
    writer: UnsafeCell<W>,
    run: AtomicBool,
    platform: P,
}

// Registry and writer are only accessed under the platform lock (registry)
// or by the single consumer inside drain_all (writer, also under the lock).
unsafe impl<W, P, const MAX: usize> Sync for LogServer<W, P, MAX>
where
    W: Write + Send + 'static,
    P: Platform,
{
}

impl<W, P, const MAX: usize> LogServer<W, P, MAX>
where
    W: Write + Send + 'static,
    P: Platform,
{
    pub fn new(platform: P, writer: W) -> Self {
        Self {
            registry: UnsafeCell::new(Registry {
                loggers: [None; MAX],
                len: 0,
            }),
            writer: UnsafeCell::new(writer),
            run: AtomicBool::new(true),
            platform,
        }
    }

    /// Add a producer's logger to the registry and give the producer its
    /// notification path. Must be called from the producer's own thread, so
    /// the link is visible before the first `record` on that thread.
    ///
    /// Raises [`Fault::RegistryFull`] when `MAX` loggers are already
    /// registered; the producer is then left unlinked.
    pub fn register<const N: usize, const B: usize>(
        &'static self,
        producer: &mut Producer<N, B>,
    ) {
        self.platform.lock();
        let registry = unsafe { &mut *self.registry.get() };
        if registry.len == MAX {
            self.platform.unlock();
            raise(Fault::RegistryFull);
            return;
        }
        registry.loggers[registry.len] = Some(producer.logger());
        registry.len += 1;
        producer.server = Some(self);
        self.platform.unlock();
    }

    /// Consumer loop: sleep on the platform, drain everything on wake.
    /// Returns after [`shutdown`](Self::shutdown), with one final full
    /// drain so nothing flushed beforehand is lost.
    pub fn run_consumer(&self) {
        while self.run.load(Ordering::Acquire) {
            self.platform.wait();
            self.drain_all();
        }
        self.drain_all();
    }

    /// Ask the consumer to finish outstanding work and return. Safe to call
    /// repeatedly; producers must already be quiescent.
    pub fn shutdown(&self) {
        self.run.store(false, Ordering::Release);
        self.platform.notify();
    }

    fn drain_all(&self) {
        self.platform.lock();
        let registry = unsafe { &*self.registry.get() };
        let out = unsafe { &mut *self.writer.get() };
        // A producer can hand off another arena while a pass is running, so
        // keep sweeping until a full pass finds nothing.
        let mut did_work = true;
        while did_work {
            did_work = false;
            for logger in registry.loggers[..registry.len].iter().flatten() {
                did_work |= logger.drain_one(out);
            }
        }
        self.platform.unlock();
    }
}

impl<W, P, const MAX: usize> ServerLink for LogServer<W, P, MAX>
where
    W: Write + Send + 'static,
    P: Platform,
{
    fn notify_dump_available(&self) {
        self.platform.notify();
    }
}
