use log::debug;

use crate::timer::{OneShotTimer, TimerHandle};

use super::media::MediaPlayer;

/// A bounded `[start_ms, end_ms)` stretch of the media resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Segment {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    SegmentEnded { index: usize },
}

/// Plays one segment at a time and reports when it ends.
///
/// The window never loops on its own; the session decides what follows a
/// segment end.
pub struct PlaybackWindow {
    media: Box<dyn MediaPlayer>,
    segments: Vec<Segment>,
    current: usize,
    loop_segments: bool,
    timer: OneShotTimer,
    playing: bool,
}

impl PlaybackWindow {
    pub fn new(media: Box<dyn MediaPlayer>) -> Self {
        Self {
            media,
            segments: Vec::new(),
            current: 0,
            loop_segments: true,
            timer: OneShotTimer::new(),
            playing: false,
        }
    }

    /// Replace the segment list. Stops any playback in progress.
    pub fn configure(&mut self, segments: Vec<Segment>, loop_segments: bool) {
        self.stop();
        self.segments = segments;
        self.current = 0;
        self.loop_segments = loop_segments;
    }

    /// Stop and go back to the first segment.
    pub fn rewind(&mut self) {
        self.stop();
        self.current = 0;
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_segment(&self) -> Option<Segment> {
        self.segments.get(self.current).copied()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn pending_end(&self) -> Option<(TimerHandle, i64)> {
        self.timer.pending()
    }

    /// Seek to the segment start, play, and arm the end timer.
    pub fn start(&mut self, now_ms: i64) {
        let Some(segment) = self.current_segment() else {
            debug!("playback start ignored: no segment");
            return;
        };
        self.media.seek(segment.start_ms);
        self.media.play();
        self.playing = true;
        self.timer.arm(now_ms.saturating_add(segment.duration_ms()));
    }

    /// Cancel the end timer and start the current segment over.
    pub fn restart(&mut self, now_ms: i64) {
        self.timer.cancel();
        self.start(now_ms);
    }

    pub fn stop(&mut self) {
        self.timer.cancel();
        if self.playing {
            self.media.pause();
            self.playing = false;
        }
    }

    /// Move to the next segment and start it.
    ///
    /// Wraps to the first segment when looping. Returns false, leaving the
    /// window untouched, when the list is exhausted.
    pub fn advance(&mut self, now_ms: i64) -> bool {
        let next = self.current + 1;
        let next = if next < self.segments.len() {
            next
        } else if self.loop_segments && !self.segments.is_empty() {
            0
        } else {
            return false;
        };
        self.current = next;
        self.restart(now_ms);
        true
    }

    /// Service the end timer. Stale handles are ignored.
    pub fn on_timer(&mut self, handle: TimerHandle, now_ms: i64) -> Option<PlaybackEvent> {
        self.timer.fire(handle, now_ms).then_some(PlaybackEvent::SegmentEnded {
            index: self.current,
        })
    }
}
