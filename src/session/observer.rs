use log::{debug, info};

use crate::model::ControlId;
use crate::score::Standing;
use crate::timeline::CancelReason;

/// What the session reports to its display collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Success {
        id: ControlId,
        points: u64,
        score: u64,
    },
    Cancel {
        id: ControlId,
        reason: CancelReason,
        final_score: u64,
    },
    /// The whole script was played without a miss.
    Finished,
    Released {
        id: ControlId,
    },
    ComboIncreased {
        factor: u32,
    },
    StandingUpdated(Standing),
    /// A timeline run began on the given playback segment.
    PassStarted {
        segment: usize,
    },
}

pub trait SessionObserver {
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F> SessionObserver for F
where
    F: FnMut(&SessionEvent),
{
    fn on_event(&mut self, event: &SessionEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Observers owned by one session, notified in subscription order.
#[derive(Default)]
pub struct Observers {
    entries: Vec<(ObserverId, Box<dyn SessionObserver>)>,
    next_id: u64,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.entries.push((id, observer));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn notify(&mut self, event: &SessionEvent) {
        for (_, observer) in &mut self.entries {
            observer.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Writes every event to the log. The CLI's status display.
#[derive(Debug, Default)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Success { id, points, score } => {
                info!("hit {} (+{}) score {}", id, points, score)
            }
            SessionEvent::Cancel {
                id,
                reason,
                final_score,
            } => info!("miss on {}: {:?}, final score {}", id, reason, final_score),
            SessionEvent::Finished => info!("script complete"),
            SessionEvent::Released { id } => debug!("released {}", id),
            SessionEvent::ComboIncreased { factor } => info!("combo x{}", factor),
            SessionEvent::StandingUpdated(standing) => info!(
                "high score {} ({}), average {}, beating high score: {}",
                standing.high_score,
                standing.high_score_holder.as_deref().unwrap_or("-"),
                standing.average_score,
                standing.beating_high_score
            ),
            SessionEvent::PassStarted { segment } => info!("pass started on segment {}", segment),
        }
    }
}
