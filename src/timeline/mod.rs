//! Timed event synchronization.
//!
//! [`TimelineScheduler`] walks a [`Script`](crate::model::Script) against
//! presses reported by the session. Each awaited event gets one deadline
//! timer; a press matches when the control is the expected one and the press
//! lands within the symmetric tolerance window (boundaries included).

mod scheduler;

pub use scheduler::{CancelReason, TimelineEvent, TimelinePhase, TimelineScheduler};
