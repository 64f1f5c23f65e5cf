//! Seams for the collaborators the engine does not own.

pub mod time;

pub use time::{Clock, MockClock, SystemClock};
