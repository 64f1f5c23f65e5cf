use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::KeyCode;

/// One raw input signal, timestamped relative to the session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInput {
    /// Milliseconds from session start.
    pub time_ms: i64,
    pub code: KeyCode,
    /// true = down, false = up.
    pub pressed: bool,
}

impl RawInput {
    pub fn down(time_ms: i64, code: KeyCode) -> Self {
        Self {
            time_ms,
            code,
            pressed: true,
        }
    }

    pub fn up(time_ms: i64, code: KeyCode) -> Self {
        Self {
            time_ms,
            code,
            pressed: false,
        }
    }
}

/// Recorder of raw input signals, for replaying a session offline.
#[derive(Debug, Default)]
pub struct InputLogger {
    logs: Vec<RawInput>,
}

impl InputLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, input: RawInput) {
        self.logs.push(input);
    }

    pub fn logs(&self) -> &[RawInput] {
        &self.logs
    }

    pub fn into_logs(self) -> Vec<RawInput> {
        self.logs
    }

    pub fn clear(&mut self) {
        self.logs.clear();
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Write the log as JSON.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(&self.logs)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write input log {}", path.display()))?;
        Ok(())
    }

    /// Read a JSON log written by [`InputLogger::save_to`].
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Vec<RawInput>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read input log {}", path.display()))?;
        let logs = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse input log {}", path.display()))?;
        Ok(logs)
    }
}
