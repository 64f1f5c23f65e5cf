//! Bounded media playback kept in phase with the timeline.

mod media;
mod window;

pub use media::{LogMedia, MediaCommand, MediaPlayer, RecordingMedia};
pub use window::{PlaybackEvent, PlaybackWindow, Segment};
