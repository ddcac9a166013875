use parking_lot::lock_api::RawMutex as _;
use parking_lot::{Condvar, Mutex, RawMutex};

/// Host-supplied platform capabilities.
///
/// `wait`/`notify` gate the consumer's sleep: `wait` blocks until a
/// subsequent `notify` and may wake spuriously; `notify` wakes at most one
/// waiter or records a pending wake. `lock`/`unlock` provide the mutual
/// exclusion that guards the server registry — they are always called as a
/// bracketed pair by the same thread, and `unlock` must only follow a
/// matching `lock`.
pub trait Platform: Send + Sync + 'static {
    fn wait(&self);
    fn notify(&self);
    fn lock(&self);
    fn unlock(&self);
}

/// Default adapter: a condition variable with a pending-wake flag, so a
/// notify that lands while the consumer is draining is never lost.
pub struct CondvarPlatform {
    registry: RawMutex,
    signal: Mutex<bool>,
    wake: Condvar,
}

impl CondvarPlatform {
    pub const fn new() -> Self {
        Self {
            registry: RawMutex::INIT,
            signal: Mutex::new(false),
            wake: Condvar::new(),
        }
    }
}

impl Default for CondvarPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for CondvarPlatform {
    fn wait(&self) {
        let mut pending = self.signal.lock();
        while !*pending {
            self.wake.wait(&mut pending);
        }
        *pending = false;
    }

    fn notify(&self) {
        let mut pending = self.signal.lock();
        *pending = true;
        self.wake.notify_one();
    }

    fn lock(&self) {
        self.registry.lock();
    }

    fn unlock(&self) {
        // Paired with a lock() taken by the same thread; see the trait
        // contract.
        unsafe { self.registry.unlock() };
    }
}

/// Degenerate adapter: `wait` yields, `notify` does nothing. The consumer
/// busy-polls, but the registry lock is still real.
pub struct YieldPlatform {
    registry: RawMutex,
}

impl YieldPlatform {
    pub const fn new() -> Self {
        Self {
            registry: RawMutex::INIT,
        }
    }
}

impl Default for YieldPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for YieldPlatform {
    fn wait(&self) {
        std::thread::yield_now();
    }

    fn notify(&self) {}

    fn lock(&self) {
        self.registry.lock();
    }

    fn unlock(&self) {
        unsafe { self.registry.unlock() };
    }
}
