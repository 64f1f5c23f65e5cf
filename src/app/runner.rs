use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::model::KeyCode;
use crate::session::{Session, SessionPhase};
use crate::traits::time::{Clock, SystemClock};

const IDLE_WAIT_MS: i64 = 250;

/// A raw input signal from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSignal {
    Down(KeyCode),
    Up(KeyCode),
    Tap(KeyCode),
    Restart,
    Quit,
}

/// Parse one input line: `+49` down, `-49` up, `49` tap, `r` restart, `q` quit.
pub fn parse_signal(line: &str) -> Option<RawSignal> {
    let line = line.trim();
    match line {
        "r" | "restart" => return Some(RawSignal::Restart),
        "q" | "quit" => return Some(RawSignal::Quit),
        _ => {}
    }
    if let Some(code) = line.strip_prefix('+') {
        code.parse().ok().map(|c| RawSignal::Down(KeyCode(c)))
    } else if let Some(code) = line.strip_prefix('-') {
        code.parse().ok().map(|c| RawSignal::Up(KeyCode(c)))
    } else {
        line.parse().ok().map(|c| RawSignal::Tap(KeyCode(c)))
    }
}

/// Spawn a thread turning stdin lines into signals. The channel closes on EOF.
pub fn spawn_stdin_reader() -> io::Result<Receiver<RawSignal>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("stdin-input".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_signal(&line) {
                    Some(signal) => {
                        if tx.send(signal).is_err() {
                            break;
                        }
                    }
                    None => warn!("unrecognised input line: {:?}", line),
                }
            }
        })?;
    Ok(rx)
}

/// Drives a session in real time from a channel of raw signals.
pub struct RealtimeRunner {
    session: Session<SystemClock>,
    signals: Receiver<RawSignal>,
}

impl RealtimeRunner {
    pub fn new(session: Session<SystemClock>, signals: Receiver<RawSignal>) -> Self {
        Self { session, signals }
    }

    pub fn session(&self) -> &Session<SystemClock> {
        &self.session
    }

    pub fn into_session(self) -> Session<SystemClock> {
        self.session
    }

    /// Run until the session finishes, a quit signal arrives, or the channel closes.
    pub fn run(&mut self) {
        loop {
            self.session.tick();
            if self.session.phase() != SessionPhase::Running {
                info!("session is {:?}, leaving", self.session.phase());
                return;
            }

            let now = self.session.clock().now_ms();
            let wait_ms = self
                .session
                .next_deadline_ms()
                .map_or(IDLE_WAIT_MS, |at| (at - now).clamp(0, IDLE_WAIT_MS));

            match self.signals.recv_timeout(Duration::from_millis(wait_ms as u64)) {
                Ok(RawSignal::Quit) => {
                    self.session.stop();
                    return;
                }
                Ok(signal) => self.handle(signal),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("input closed");
                    self.session.stop();
                    return;
                }
            }
        }
    }

    fn handle(&mut self, signal: RawSignal) {
        match signal {
            RawSignal::Down(code) => self.session.key_down(code),
            RawSignal::Up(code) => self.session.key_up(code),
            RawSignal::Tap(code) => {
                self.session.key_down(code);
                self.session.key_up(code);
            }
            RawSignal::Restart => {
                if let Err(e) = self.session.restart() {
                    warn!("restart failed: {}", e);
                }
            }
            RawSignal::Quit => self.session.stop(),
        }
    }
}
