use std::collections::{HashMap, HashSet};

use log::debug;

use crate::model::KeyCode;

use super::key_state::KeyState;

/// Logical input after key-repeat suppression and acceptance filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Press(KeyCode),
    Release(KeyCode),
}

/// Turns raw down/up signals into one logical press and one logical release
/// per physical action, for accepted codes only.
///
/// Held-state bookkeeping runs for every code, accepted or not, so a late up
/// for a rejected code never leaves a stale held flag behind.
#[derive(Debug, Clone, Default)]
pub struct InputGate {
    keys: HashMap<KeyCode, KeyState>,
    accepted: HashSet<KeyCode>,
}

impl InputGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add codes to the accepted set.
    pub fn accept<I>(&mut self, codes: I)
    where
        I: IntoIterator<Item = KeyCode>,
    {
        self.accepted.extend(codes);
    }

    /// Clear the accepted set. Held-state is kept.
    pub fn disable(&mut self) {
        self.accepted.clear();
    }

    pub fn is_accepted(&self, code: KeyCode) -> bool {
        self.accepted.contains(&code)
    }

    pub fn is_enabled(&self) -> bool {
        !self.accepted.is_empty()
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.keys.get(&code).is_some_and(|k| k.held)
    }

    pub fn key_state(&self, code: KeyCode) -> Option<&KeyState> {
        self.keys.get(&code)
    }

    /// Raw down signal.
    pub fn key_down(&mut self, code: KeyCode, now_ms: i64) -> Option<InputEvent> {
        if !self.keys.entry(code).or_default().on_down(now_ms) {
            return None;
        }
        if self.is_accepted(code) {
            Some(InputEvent::Press(code))
        } else {
            debug!("down {} not accepted", code);
            None
        }
    }

    /// Raw up signal.
    pub fn key_up(&mut self, code: KeyCode, now_ms: i64) -> Option<InputEvent> {
        let was_held = self.keys.entry(code).or_default().on_up(now_ms);
        (was_held && self.is_accepted(code)).then_some(InputEvent::Release(code))
    }
}
