use std::process;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use thiserror::Error;

/// Invariant violations surfaced through the global error hook.
///
/// Every variant is a configuration error or an internal bug, not a transient
/// fault: there is no retry path. The hook is expected to terminate the
/// process; if it returns instead, the operation that raised the fault becomes
/// a no-op (the record is dropped, the registration is skipped, and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// All `N` capture arenas of a logger are full; the record was dropped.
    #[error("local logger full, record dropped")]
    LoggerFull,
    /// A single record does not fit in an empty arena of size `B`.
    #[error("record larger than an entire capture arena")]
    EntryTooLarge,
    /// The ring rolled over before the logger was registered with a server.
    #[error("local logger not registered with a log server")]
    UnregisteredLogger,
    /// `register` was called with the registry already at capacity.
    #[error("log server registry full")]
    RegistryFull,
    /// `take` on a semaphore with no outstanding `put`.
    #[error("semaphore take with zero count")]
    SemaphoreUnderflow,
    /// An arena walk left the written region; the stored sizes are garbage.
    #[error("capture arena record walk out of bounds")]
    CorruptRecord,
}

/// Hook invoked with every [`Fault`]. Installed once at program start.
pub type ErrorHook = Box<dyn Fn(Fault) + Send + Sync>;

lazy_static! {
    static ref ERROR_HOOK: RwLock<ErrorHook> = RwLock::new(Box::new(default_hook));
}

fn default_hook(fault: Fault) {
    eprintln!("deferlog fatal: {fault}");
    process::abort();
}

/// Replace the process-wide error hook.
///
/// The default hook prints the diagnostic to stderr and aborts. A replacement
/// that returns turns the offending operation into a no-op. Must not itself
/// call `set_error_hook`.
pub fn set_error_hook<F>(hook: F)
where
    F: Fn(Fault) + Send + Sync + 'static,
{
    *ERROR_HOOK.write() = Box::new(hook);
}

pub(crate) fn raise(fault: Fault) {
    (*ERROR_HOOK.read())(fault);
}
