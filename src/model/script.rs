use super::control::ControlId;

/// An expected press and its target offset from the timeline start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedEvent {
    pub id: ControlId,
    /// Target time in milliseconds from timeline start.
    pub time_ms: i64,
}

impl ScriptedEvent {
    pub fn new(id: ControlId, time_ms: i64) -> Self {
        Self { id, time_ms }
    }
}

/// Ordered, immutable list of scripted events.
///
/// Entries are expected in ascending time order. Ids may repeat.
/// Ordering and overlap are not checked here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    events: Vec<ScriptedEvent>,
}

impl Script {
    pub fn new(events: Vec<ScriptedEvent>) -> Self {
        Self { events }
    }

    /// Build a script from `(id, seconds)` pairs, converting once to milliseconds.
    pub fn from_seconds<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ControlId, f64)>,
    {
        let events = entries
            .into_iter()
            .map(|(id, secs)| ScriptedEvent::new(id, seconds_to_ms(secs)))
            .collect();
        Self { events }
    }

    pub fn get(&self, index: usize) -> Option<&ScriptedEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&ScriptedEvent> {
        self.events.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScriptedEvent> {
        self.events.iter()
    }

    /// Time of the last scripted event, or 0 for an empty script.
    pub fn duration_ms(&self) -> i64 {
        self.events.last().map_or(0, |e| e.time_ms)
    }
}

/// Seconds (configuration unit) to whole milliseconds (clock unit).
pub fn seconds_to_ms(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_seconds_converts_once() {
        let script = Script::from_seconds([(ControlId(1), 1.5), (ControlId(2), 2.25)]);
        assert_eq!(script.len(), 2);
        assert_eq!(script.get(0), Some(&ScriptedEvent::new(ControlId(1), 1_500)));
        assert_eq!(script.get(1), Some(&ScriptedEvent::new(ControlId(2), 2_250)));
        assert_eq!(script.duration_ms(), 2_250);
    }

    #[test]
    fn rounding_absorbs_float_noise() {
        assert_eq!(seconds_to_ms(0.1 + 0.2), 300);
        assert_eq!(seconds_to_ms(0.0), 0);
    }

    #[test]
    fn empty_script() {
        let script = Script::default();
        assert!(script.is_empty());
        assert_eq!(script.get(0), None);
        assert_eq!(script.duration_ms(), 0);
    }
}
