use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::input::ControlMap;
use crate::model::{ControlId, Script, seconds_to_ms};
use crate::playback::Segment;
use crate::score::DEFAULT_MAX_COMBO_FACTOR;
use crate::util::error::ConfigError;

const DEFAULT_POLL_RATE: f64 = 5.0;

// Keeps every millisecond sum the engine forms well inside i64.
const MAX_TIME_SECS: f64 = 1.0e9;

fn check_time(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value.abs() <= MAX_TIME_SECS {
        Ok(())
    } else {
        Err(ConfigError::TimeOutOfRange { field, value })
    }
}

/// One scripted entry, time in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub id: ControlId,
    pub time: f64,
}

/// A playback segment, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEntry {
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub src: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Game settings as served to the client. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub button_definitions: BTreeMap<ControlId, String>,
    #[serde(default)]
    pub base_id: u32,
    pub allowed_error: f64,
    pub events: Vec<EventEntry>,
    #[serde(default)]
    pub scoring: BTreeMap<ControlId, u32>,
    #[serde(default = "default_poll_rate")]
    pub poll_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<MediaSource>,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<SegmentEntry>,
    #[serde(default = "default_max_combo_factor")]
    pub max_combo_factor: u32,
    #[serde(default = "default_true")]
    pub loop_segments: bool,
}

fn default_poll_rate() -> f64 {
    DEFAULT_POLL_RATE
}

fn default_max_combo_factor() -> u32 {
    DEFAULT_MAX_COMBO_FACTOR
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Parse and validate settings JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a settings file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Check everything the engine relies on. Script order is not checked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_error.is_nan() || self.allowed_error < 0.0 {
            return Err(ConfigError::NegativeTolerance(self.allowed_error));
        }
        if !(self.poll_rate.is_finite() && self.poll_rate > 0.0) {
            return Err(ConfigError::InvalidPollRate(self.poll_rate));
        }
        if self.events.is_empty() {
            return Err(ConfigError::EmptyScript);
        }
        self.check_times()?;
        let first = self.events[0];
        if seconds_to_ms(first.time) + self.tolerance_ms() <= 0 {
            return Err(ConfigError::UnreachableFirstEvent { id: first.id });
        }
        if self.max_combo_factor == 0 {
            return Err(ConfigError::InvalidComboCap);
        }
        if let Some(event) = self
            .events
            .iter()
            .find(|e| !self.button_definitions.contains_key(&e.id))
        {
            return Err(ConfigError::UnknownControl {
                id: event.id,
                context: "events",
            });
        }
        if let Some(id) = self
            .scoring
            .keys()
            .find(|id| !self.button_definitions.contains_key(id))
        {
            return Err(ConfigError::UnknownControl {
                id: *id,
                context: "scoring",
            });
        }
        for (index, segment) in self.segments().iter().enumerate() {
            if segment.start_ms < 0 || segment.end_ms <= segment.start_ms {
                return Err(ConfigError::InvalidSegment {
                    index,
                    start_ms: segment.start_ms,
                    end_ms: segment.end_ms,
                });
            }
        }
        self.control_map()?;
        Ok(())
    }

    fn check_times(&self) -> Result<(), ConfigError> {
        check_time("allowedError", self.allowed_error)?;
        check_time("pollRate", self.poll_rate)?;
        check_time("startTime", self.start_time)?;
        if let Some(end) = self.end_time {
            check_time("endTime", end)?;
        }
        for event in &self.events {
            check_time("events.time", event.time)?;
        }
        for segment in &self.segments {
            check_time("segments.startTime", segment.start_time)?;
            check_time("segments.endTime", segment.end_time)?;
        }
        Ok(())
    }

    pub fn script(&self) -> Script {
        Script::from_seconds(self.events.iter().map(|e| (e.id, e.time)))
    }

    pub fn tolerance_ms(&self) -> i64 {
        seconds_to_ms(self.allowed_error)
    }

    pub fn poll_interval_ms(&self) -> i64 {
        seconds_to_ms(self.poll_rate).max(1)
    }

    /// Playback segments in milliseconds.
    ///
    /// Without an explicit list this is one segment from `startTime` to
    /// `endTime`, or to the last event plus the tolerance.
    pub fn segments(&self) -> Vec<Segment> {
        if !self.segments.is_empty() {
            return self
                .segments
                .iter()
                .map(|s| Segment::new(seconds_to_ms(s.start_time), seconds_to_ms(s.end_time)))
                .collect();
        }
        let start_ms = seconds_to_ms(self.start_time);
        let end_ms = match self.end_time {
            Some(end) => seconds_to_ms(end),
            None => start_ms
                .saturating_add(self.script().duration_ms())
                .saturating_add(self.tolerance_ms()),
        };
        vec![Segment::new(start_ms, end_ms)]
    }

    pub fn scoring_map(&self) -> HashMap<ControlId, u32> {
        self.scoring.iter().map(|(id, points)| (*id, *points)).collect()
    }

    pub fn control_map(&self) -> Result<ControlMap, ConfigError> {
        ControlMap::from_definitions(&self.button_definitions, self.base_id)
    }

    /// The media to play: `src`, else the first entry of `sources`.
    pub fn media_source(&self) -> Option<&str> {
        self.src
            .as_deref()
            .or_else(|| self.sources.first().map(|s| s.src.as_str()))
    }
}
