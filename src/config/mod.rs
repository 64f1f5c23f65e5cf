mod app_config;
mod settings;

pub use app_config::{AppConfig, CONFIG_FILE};
pub use settings::{EventEntry, MediaSource, SegmentEntry, Settings};
