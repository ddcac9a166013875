use std::io::Write;

/// Types a record may capture by value.
///
/// Captured values are memcpy'd into the arena on the producer thread and
/// read back on the consumer thread after the drain handoff, so they must be
/// trivially copyable, sendable, and free of borrowed data. String literals
/// are the canonical non-numeric example.
pub trait Capture: Copy + Send + 'static {}

impl<T: Copy + Send + 'static> Capture for T {}

/// The user-supplied format callable stored alongside each captured tuple.
///
/// Invoked on the consumer thread with the values exactly as the producer
/// captured them. Output errors are ignored; the sink's latency penalizes
/// only the consumer.
pub type RecordFn<T> = fn(&T, &mut dyn Write);
