/// Held state of one raw key or pointer button, with millisecond timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    /// Whether the key is currently held down.
    pub held: bool,
    /// Session time of the last accepted down transition.
    pub press_time_ms: i64,
    /// Session time of the last up transition.
    pub release_time_ms: i64,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a down signal. Returns false for OS key-repeat (already held).
    pub fn on_down(&mut self, time_ms: i64) -> bool {
        if self.held {
            return false;
        }
        self.held = true;
        self.press_time_ms = time_ms;
        true
    }

    /// Record an up signal. Returns whether the key had been held.
    pub fn on_up(&mut self, time_ms: i64) -> bool {
        let was_held = self.held;
        self.held = false;
        if was_held {
            self.release_time_ms = time_ms;
        }
        was_held
    }

    /// How long the key has been held at `now_ms`, if held.
    pub fn held_for(&self, now_ms: i64) -> Option<i64> {
        self.held.then(|| now_ms - self.press_time_ms)
    }
}
