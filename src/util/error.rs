use std::path::PathBuf;

use thiserror::Error;

use crate::model::ControlId;

/// Problems found while loading or validating game settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("allowedError must be non-negative, got {0}s")]
    NegativeTolerance(f64),

    #[error("pollRate must be positive, got {0}s")]
    InvalidPollRate(f64),

    #[error("Settings contain no scripted events")]
    EmptyScript,

    #[error("{field} is out of range, got {value}s")]
    TimeOutOfRange { field: &'static str, value: f64 },

    #[error("First event (control {id}) closes its window at or before the start")]
    UnreachableFirstEvent { id: ControlId },

    #[error("Control {id} used in {context} has no button definition")]
    UnknownControl { id: ControlId, context: &'static str },

    #[error("Playback segment {index} is empty or inverted: {start_ms}ms..{end_ms}ms")]
    InvalidSegment {
        index: usize,
        start_ms: i64,
        end_ms: i64,
    },

    #[error("Raw code overflow: base {base} + control {id}")]
    CodeOverflow { base: u32, id: ControlId },

    #[error("maxComboFactor must be at least 1")]
    InvalidComboCap,
}

/// Lifecycle misuse of a session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session has no settings loaded")]
    NotLoaded,

    #[error("Session is already running")]
    AlreadyRunning,
}
