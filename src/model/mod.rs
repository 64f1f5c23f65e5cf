// Identifiers and the scripted timeline data.

pub mod control;
pub mod script;

pub use control::{ControlId, KeyCode};
pub use script::{Script, ScriptedEvent, seconds_to_ms};
