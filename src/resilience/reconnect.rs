//! Fixed-interval reconnection.
//!
//! # Design Decisions
//! - Constant delay between attempts, no backoff, no attempt cap
//! - At most one reconnect loop at a time, enforced by compare-and-set
//! - The permit releases the guard on drop, including on task abort

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// How long to wait before each reconnect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    interval: Duration,
}

impl ReconnectPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self { interval }
    }

    /// Delay before every reconnect attempt.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_INTERVAL)
    }
}

/// Guard ensuring a single active reconnect loop.
#[derive(Debug, Clone, Default)]
pub struct ReconnectGuard {
    active: Arc<AtomicBool>,
}

impl ReconnectGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the right to run the reconnect loop.
    ///
    /// Returns `None` if another loop already holds it.
    pub fn try_begin(&self) -> Option<ReconnectPermit> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReconnectPermit {
                active: Arc::clone(&self.active),
            })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Held by the running reconnect loop. Releases the guard when dropped.
#[derive(Debug)]
pub struct ReconnectPermit {
    active: Arc<AtomicBool>,
}

impl Drop for ReconnectPermit {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}
