use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Abstraction over time sources.
/// Implementations: SystemClock (production), MockClock (testing and offline replay).
pub trait Clock {
    /// Current monotonic time in milliseconds from an arbitrary epoch.
    fn now_ms(&self) -> i64;
}

/// System clock backed by std::time::Instant.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }
}

/// Manually driven clock.
///
/// Clones share the same time cell, so a test can keep a handle while the
/// session owns another one.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    current_ms: Rc<Cell<i64>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, ms: i64) {
        self.current_ms.set(ms);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.current_ms.set(self.current_ms.get() + delta_ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> i64 {
        self.current_ms.get()
    }
}
