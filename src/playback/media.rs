use std::cell::RefCell;
use std::rc::Rc;

use log::info;

/// The media element the window controls.
pub trait MediaPlayer {
    /// Jump to an offset in the resource, in milliseconds.
    fn seek(&mut self, offset_ms: i64);
    fn play(&mut self);
    fn pause(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCommand {
    Seek(i64),
    Play,
    Pause,
}

/// Logs every command. Used when no real player is attached.
#[derive(Debug, Default)]
pub struct LogMedia {
    source: Option<String>,
}

impl LogMedia {
    pub fn new(source: Option<String>) -> Self {
        Self { source }
    }

    fn name(&self) -> &str {
        self.source.as_deref().unwrap_or("<no source>")
    }
}

impl MediaPlayer for LogMedia {
    fn seek(&mut self, offset_ms: i64) {
        info!("media {}: seek to {}ms", self.name(), offset_ms);
    }

    fn play(&mut self) {
        info!("media {}: play", self.name());
    }

    fn pause(&mut self) {
        info!("media {}: pause", self.name());
    }
}

/// Keeps the command history. Clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct RecordingMedia {
    commands: Rc<RefCell<Vec<MediaCommand>>>,
}

impl RecordingMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<MediaCommand> {
        self.commands.borrow().clone()
    }

    pub fn clear(&self) {
        self.commands.borrow_mut().clear();
    }
}

impl MediaPlayer for RecordingMedia {
    fn seek(&mut self, offset_ms: i64) {
        self.commands.borrow_mut().push(MediaCommand::Seek(offset_ms));
    }

    fn play(&mut self) {
        self.commands.borrow_mut().push(MediaCommand::Play);
    }

    fn pause(&mut self) {
        self.commands.borrow_mut().push(MediaCommand::Pause);
    }
}
