//! The session controller and the events it reports.

mod controller;
mod observer;

pub use controller::{Session, SessionPhase};
pub use observer::{LogObserver, ObserverId, Observers, SessionEvent, SessionObserver};
