//! Drivers that put a session to work: the bootstrap pipeline, the offline
//! simulation used for replays, and the real-time terminal runner.

mod pipeline;
mod runner;
mod simulation;

pub use pipeline::Pipeline;
pub use runner::{RawSignal, RealtimeRunner, parse_signal, spawn_stdin_reader};
pub use simulation::{ReplayReport, Simulation, replay};
