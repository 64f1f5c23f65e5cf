// One-shot timers for a single-threaded, caller-driven event loop.
// A timer is a deadline in milliseconds plus a handle identifying the arming.
// None means no timer is pending; firing or cancelling always resets to None.

/// Opaque identity of one arming of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    handle: TimerHandle,
    deadline_ms: i64,
}

/// A slot holding at most one pending deadline.
#[derive(Debug, Clone, Default)]
pub struct OneShotTimer {
    pending: Option<Pending>,
    next_handle: u64,
}

impl OneShotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer, replacing any pending deadline.
    pub fn arm(&mut self, deadline_ms: i64) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.pending = Some(Pending {
            handle,
            deadline_ms,
        });
        handle
    }

    /// Cancel the pending deadline. Returns false if nothing was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Consume the pending deadline if `handle` is still the live arming and it is due.
    /// Stale handles and early calls leave the timer untouched.
    pub fn fire(&mut self, handle: TimerHandle, now_ms: i64) -> bool {
        match self.pending {
            Some(p) if p.handle == handle && p.deadline_ms <= now_ms => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline_ms(&self) -> Option<i64> {
        self.pending.map(|p| p.deadline_ms)
    }

    pub fn handle(&self) -> Option<TimerHandle> {
        self.pending.map(|p| p.handle)
    }

    /// Handle and deadline of the pending arming, if any.
    pub fn pending(&self) -> Option<(TimerHandle, i64)> {
        self.pending.map(|p| (p.handle, p.deadline_ms))
    }

    /// Whether a pending deadline has been reached.
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.pending.is_some_and(|p| p.deadline_ms <= now_ms)
    }
}
