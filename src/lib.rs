//! Deferred-formatting logger for timing-critical producer threads.
//!
//! The producer path copies raw argument values into a per-thread arena and
//! returns; a single consumer thread formats and writes them later. No
//! formatting, locking, allocation or syscalls happen on the fast path.

pub mod capture;
mod capture_arena;
pub mod error_hook;
pub mod local_logger;
pub mod log_server;
pub mod mini_semaphore;
pub mod platform;

pub use capture::{Capture, RecordFn};
pub use error_hook::{set_error_hook, ErrorHook, Fault};
pub use local_logger::{LocalLogger, Producer};
pub use log_server::LogServer;
pub use mini_semaphore::MiniSemaphore;
pub use platform::{CondvarPlatform, Platform, YieldPlatform};
