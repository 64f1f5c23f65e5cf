//! Scoring: the combo ledger and the external score endpoint.

mod client;
mod ledger;
mod protocol;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub use client::HttpScoreService;
pub use ledger::{ComboLedger, DEFAULT_MAX_COMBO_FACTOR, Standing};
pub use protocol::{ScoreStats, ScoreSubmission};

/// Fire-and-forget access to the score endpoint. No method may block.
pub trait ScoreService {
    /// Report a failed run.
    fn submit(&mut self, submission: ScoreSubmission);

    /// Ask for fresh aggregates.
    fn request_stats(&mut self);

    /// Latest aggregates received since the last call, if any.
    fn poll_stats(&mut self) -> Option<ScoreStats>;
}

/// Drops everything.
#[derive(Debug, Default)]
pub struct NullScoreService;

impl ScoreService for NullScoreService {
    fn submit(&mut self, _submission: ScoreSubmission) {}

    fn request_stats(&mut self) {}

    fn poll_stats(&mut self) -> Option<ScoreStats> {
        None
    }
}

#[derive(Debug, Default)]
struct Recorded {
    submissions: Vec<ScoreSubmission>,
    stats_requests: usize,
    queued_stats: VecDeque<ScoreStats>,
}

/// In-memory service. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingScoreService {
    inner: Rc<RefCell<Recorded>>,
}

impl RecordingScoreService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> Vec<ScoreSubmission> {
        self.inner.borrow().submissions.clone()
    }

    pub fn stats_requests(&self) -> usize {
        self.inner.borrow().stats_requests
    }

    /// Queue aggregates to be handed out by the next `poll_stats`.
    pub fn push_stats(&self, stats: ScoreStats) {
        self.inner.borrow_mut().queued_stats.push_back(stats);
    }
}

impl ScoreService for RecordingScoreService {
    fn submit(&mut self, submission: ScoreSubmission) {
        self.inner.borrow_mut().submissions.push(submission);
    }

    fn request_stats(&mut self) {
        self.inner.borrow_mut().stats_requests += 1;
    }

    fn poll_stats(&mut self) -> Option<ScoreStats> {
        self.inner.borrow_mut().queued_stats.pop_front()
    }
}
