use log::{debug, warn};

use crate::model::{ControlId, Script, ScriptedEvent};
use crate::timer::{OneShotTimer, TimerHandle};

/// Lifecycle of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelinePhase {
    /// Not started, or stopped.
    Idle,
    /// Waiting for the scripted event at the cursor.
    Armed,
    /// The run failed; waiting for a restart.
    Cancelled,
    /// Every scripted event was satisfied.
    Exhausted,
}

/// Why a run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// A different control was pressed.
    WrongControl { expected: ControlId },
    /// The right control, outside the tolerance window.
    OutOfWindow { offset_ms: i64 },
    /// Nothing was pressed before the deadline.
    DeadlineElapsed,
}

/// Outcome reported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    Success {
        id: ControlId,
        index: usize,
        /// Press time minus target time.
        offset_ms: i64,
    },
    Cancel {
        id: ControlId,
        index: usize,
        reason: CancelReason,
    },
    Finished,
}

/// Owns the script, the cursor and the single pending deadline.
#[derive(Debug, Clone)]
pub struct TimelineScheduler {
    script: Script,
    tolerance_ms: i64,
    /// None before start; Some(len) once exhausted.
    cursor: Option<usize>,
    start_ms: i64,
    deadline: OneShotTimer,
    /// Incremented on every start; cancel is reported once per run.
    run: u64,
    cancelled: bool,
}

impl TimelineScheduler {
    pub fn new(script: Script, tolerance_ms: i64) -> Self {
        Self {
            script,
            tolerance_ms: tolerance_ms.max(0),
            cursor: None,
            start_ms: 0,
            deadline: OneShotTimer::new(),
            run: 0,
            cancelled: false,
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn tolerance_ms(&self) -> i64 {
        self.tolerance_ms
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.start_ms
    }

    pub fn phase(&self) -> TimelinePhase {
        match self.cursor {
            None => TimelinePhase::Idle,
            Some(i) if i >= self.script.len() => TimelinePhase::Exhausted,
            Some(_) if self.cancelled => TimelinePhase::Cancelled,
            Some(_) => TimelinePhase::Armed,
        }
    }

    /// The scripted event currently awaited, if armed.
    pub fn expected(&self) -> Option<&ScriptedEvent> {
        match self.phase() {
            TimelinePhase::Armed => self.cursor.and_then(|i| self.script.get(i)),
            _ => None,
        }
    }

    /// Handle and deadline of the pending timer.
    pub fn pending_deadline(&self) -> Option<(TimerHandle, i64)> {
        self.deadline.pending()
    }

    /// Begin a run at `now_ms` and arm the first event.
    pub fn start(&mut self, now_ms: i64) -> Vec<TimelineEvent> {
        if self.deadline.cancel() {
            warn!("timeline started while a deadline was pending; use restart");
        }
        self.start_ms = now_ms;
        self.cursor = None;
        self.run += 1;
        self.cancelled = false;
        debug!("timeline run {} started at {}ms", self.run, now_ms);
        self.queue_next_event(now_ms)
    }

    /// Cancel any pending deadline, rewind, and start again.
    pub fn restart(&mut self, now_ms: i64) -> Vec<TimelineEvent> {
        self.deadline.cancel();
        self.cursor = None;
        self.start(now_ms)
    }

    /// Stop without reporting anything. The timeline goes back to idle.
    pub fn stop(&mut self) {
        self.deadline.cancel();
        self.cursor = None;
        self.cancelled = false;
    }

    /// Move the cursor forward and arm the deadline for the next event.
    ///
    /// A deadline that has already passed is armed at `now_ms`, so the
    /// cancel is delivered on the next timer service.
    pub fn queue_next_event(&mut self, now_ms: i64) -> Vec<TimelineEvent> {
        let next = self.cursor.map_or(0, |i| i + 1);
        self.cursor = Some(next.min(self.script.len()));

        let Some(event) = self.script.get(next).copied() else {
            self.deadline.cancel();
            debug!("timeline run {} exhausted", self.run);
            return vec![TimelineEvent::Finished];
        };

        let remaining = event.time_ms.saturating_sub(self.elapsed_ms(now_ms));
        let delay = remaining.saturating_add(self.tolerance_ms);
        if delay > 0 {
            self.deadline.arm(now_ms.saturating_add(delay));
        } else {
            warn!(
                "scheduling error: event {} (id {}) deadline passed {}ms ago, cancelling",
                next, event.id, -delay
            );
            self.deadline.arm(now_ms);
        }
        Vec::new()
    }

    /// Reconcile a logical press against the awaited event.
    pub fn handle_event(&mut self, id: ControlId, now_ms: i64) -> Vec<TimelineEvent> {
        let Some(index) = self.cursor else {
            debug!("press {} ignored: timeline idle", id);
            return Vec::new();
        };
        let Some(expected) = self.expected().copied() else {
            debug!("press {} ignored: timeline {:?}", id, self.phase());
            return Vec::new();
        };

        let offset_ms = self.elapsed_ms(now_ms) - expected.time_ms;
        if id != expected.id {
            return self
                .cancel(
                    id,
                    index,
                    CancelReason::WrongControl {
                        expected: expected.id,
                    },
                )
                .into_iter()
                .collect();
        }
        if offset_ms.abs() > self.tolerance_ms {
            return self
                .cancel(id, index, CancelReason::OutOfWindow { offset_ms })
                .into_iter()
                .collect();
        }

        self.success(id, index, offset_ms, now_ms)
    }

    /// Service the deadline timer. Stale handles are ignored.
    pub fn on_deadline(&mut self, handle: TimerHandle, now_ms: i64) -> Option<TimelineEvent> {
        if !self.deadline.fire(handle, now_ms) {
            return None;
        }
        let index = self.cursor?;
        let event = self.script.get(index).copied()?;
        self.cancel(event.id, index, CancelReason::DeadlineElapsed)
    }

    fn success(
        &mut self,
        id: ControlId,
        index: usize,
        offset_ms: i64,
        now_ms: i64,
    ) -> Vec<TimelineEvent> {
        self.deadline.cancel();
        debug!("event {} (id {}) hit, offset {}ms", index, id, offset_ms);
        let mut events = vec![TimelineEvent::Success {
            id,
            index,
            offset_ms,
        }];
        events.extend(self.queue_next_event(now_ms));
        events
    }

    // The pending deadline is left armed; a later fire in the same run is swallowed.
    fn cancel(&mut self, id: ControlId, index: usize, reason: CancelReason) -> Option<TimelineEvent> {
        if self.cancelled {
            debug!("run {} already cancelled, dropping {:?}", self.run, reason);
            return None;
        }
        self.cancelled = true;
        debug!("event {} cancelled by id {}: {:?}", index, id, reason);
        Some(TimelineEvent::Cancel { id, index, reason })
    }
}
