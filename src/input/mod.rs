//! Input handling.
//!
//! This module provides:
//! - [`InputGate`]: key-repeat suppression and acceptance filtering
//! - [`ControlMap`]: raw code to logical control lookup
//! - [`InputLogger`]: raw input recording for replay
//! - [`KeyState`]: individual key state with timestamps

mod control_map;
mod gate;
mod key_input_log;
mod key_state;

pub use control_map::ControlMap;
pub use gate::{InputEvent, InputGate};
pub use key_input_log::{InputLogger, RawInput};
pub use key_state::KeyState;
