use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::config::Settings;
use crate::input::RawInput;
use crate::model::{ControlId, KeyCode};
use crate::playback::RecordingMedia;
use crate::score::{RecordingScoreService, ScoreSubmission};
use crate::session::{Session, SessionEvent};
use crate::traits::time::{Clock, MockClock};
use crate::util::error::{ConfigError, SessionError};

/// Deterministic driver: a session on a mock clock with recording collaborators.
pub struct Simulation {
    clock: MockClock,
    media: RecordingMedia,
    scores: RecordingScoreService,
    events: Rc<RefCell<Vec<SessionEvent>>>,
    session: Session<MockClock>,
}

impl Simulation {
    /// Load `settings` into a fresh session with the clock at 0.
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        let clock = MockClock::new();
        let media = RecordingMedia::new();
        let scores = RecordingScoreService::new();
        let mut session = Session::new(
            clock.clone(),
            Box::new(media.clone()),
            Box::new(scores.clone()),
        );
        session.load(settings)?;

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        session.subscribe(Box::new(move |e: &SessionEvent| sink.borrow_mut().push(e.clone())));

        Ok(Self {
            clock,
            media,
            scores,
            events,
            session,
        })
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.session.start()
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Service every timer due strictly before `target_ms`, then move the clock there.
    pub fn advance_to(&mut self, target_ms: i64) {
        self.run_timers(|deadline| deadline < target_ms);
        if target_ms > self.clock.now_ms() {
            self.clock.set_time(target_ms);
        }
    }

    /// Advance to `horizon_ms` and service everything due up to and including it.
    pub fn finish(&mut self, horizon_ms: i64) {
        self.advance_to(horizon_ms);
        self.run_timers(|deadline| deadline <= horizon_ms);
    }

    pub fn key_down(&mut self, code: KeyCode, at_ms: i64) {
        self.advance_to(at_ms);
        self.session.key_down(code);
    }

    pub fn key_up(&mut self, code: KeyCode, at_ms: i64) {
        self.advance_to(at_ms);
        self.session.key_up(code);
    }

    pub fn press(&mut self, id: ControlId, at_ms: i64) {
        self.advance_to(at_ms);
        self.session.control_down(id);
    }

    pub fn release(&mut self, id: ControlId, at_ms: i64) {
        self.advance_to(at_ms);
        self.session.control_up(id);
    }

    /// Press and release in the same millisecond.
    pub fn tap(&mut self, id: ControlId, at_ms: i64) {
        self.press(id, at_ms);
        self.release(id, at_ms);
    }

    pub fn apply(&mut self, input: RawInput) {
        if input.pressed {
            self.key_down(input.code, input.time_ms);
        } else {
            self.key_up(input.code, input.time_ms);
        }
    }

    pub fn session(&self) -> &Session<MockClock> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<MockClock> {
        &mut self.session
    }

    pub fn media(&self) -> &RecordingMedia {
        &self.media
    }

    pub fn scores(&self) -> &RecordingScoreService {
        &self.scores
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.borrow().clone()
    }

    pub fn take_events(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    fn run_timers(&mut self, due: impl Fn(i64) -> bool) {
        while let Some(deadline) = self.session.next_deadline_ms() {
            if !due(deadline) {
                break;
            }
            if deadline > self.clock.now_ms() {
                self.clock.set_time(deadline);
            }
            self.session.tick();
        }
    }
}

/// Outcome of replaying recorded input against a script.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub successes: usize,
    pub cancels: usize,
    pub completed_passes: usize,
    pub final_score: u64,
    pub combo_factor: u32,
    pub submissions: Vec<ScoreSubmission>,
    pub events: Vec<SessionEvent>,
}

impl ReplayReport {
    fn collect(simulation: &Simulation) -> Self {
        let events = simulation.events();
        let count = |f: fn(&SessionEvent) -> bool| events.iter().filter(|e| f(e)).count();
        Self {
            successes: count(|e| matches!(e, SessionEvent::Success { .. })),
            cancels: count(|e| matches!(e, SessionEvent::Cancel { .. })),
            completed_passes: count(|e| matches!(e, SessionEvent::Finished)),
            final_score: simulation.session().ledger().score(),
            combo_factor: simulation.session().ledger().combo_factor(),
            submissions: simulation.scores().submissions(),
            events,
        }
    }
}

/// Replay raw inputs, timed relative to session start, up to `horizon_ms`.
pub fn replay(settings: &Settings, inputs: &[RawInput], horizon_ms: i64) -> Result<ReplayReport> {
    let mut simulation = Simulation::new(settings).context("Failed to load settings")?;
    simulation.start().context("Failed to start session")?;

    let mut inputs = inputs.to_vec();
    inputs.sort_by_key(|input| input.time_ms);
    for input in inputs.into_iter().filter(|i| i.time_ms <= horizon_ms) {
        simulation.apply(input);
    }
    simulation.finish(horizon_ms);
    Ok(ReplayReport::collect(&simulation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::from_json(
            r#"{
                "buttonDefinitions": {"1": "A", "2": "B"},
                "baseId": 48,
                "allowedError": 0.2,
                "events": [{"id": 1, "time": 1.0}, {"id": 2, "time": 2.0}],
                "scoring": {"1": 10, "2": 20},
                "loopSegments": false
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn advance_fires_only_strictly_earlier_timers() {
        let mut sim = Simulation::new(&settings()).unwrap();
        sim.start().unwrap();
        sim.advance_to(1_200);
        assert_eq!(sim.now_ms(), 1_200);
        assert!(sim.events().iter().all(|e| !matches!(e, SessionEvent::Cancel { .. })));
        sim.finish(1_200);
        assert!(sim.events().iter().any(|e| matches!(e, SessionEvent::Cancel { .. })));
    }

    #[test]
    fn press_on_deadline_wins() {
        let mut sim = Simulation::new(&settings()).unwrap();
        sim.start().unwrap();
        sim.press(ControlId(1), 1_200);
        assert!(
            sim.events()
                .iter()
                .any(|e| matches!(e, SessionEvent::Success { .. }))
        );
    }

    #[test]
    fn replay_counts_outcomes() {
        let inputs = vec![
            RawInput::down(1_000, KeyCode(49)),
            RawInput::up(1_050, KeyCode(49)),
            RawInput::down(2_100, KeyCode(50)),
            RawInput::up(2_150, KeyCode(50)),
        ];
        let report = replay(&settings(), &inputs, 3_000).unwrap();
        assert_eq!(report.successes, 2);
        assert_eq!(report.cancels, 0);
        assert_eq!(report.completed_passes, 1);
        assert_eq!(report.final_score, 30);
        assert_eq!(report.combo_factor, 2);
        assert!(report.submissions.is_empty());
    }

    #[test]
    fn replay_sorts_inputs() {
        let inputs = vec![
            RawInput::down(2_000, KeyCode(50)),
            RawInput::down(1_000, KeyCode(49)),
        ];
        let report = replay(&settings(), &inputs, 2_500).unwrap();
        assert_eq!(report.successes, 2);
    }

    #[test]
    fn overdue_later_event_cancels_once() {
        let settings = Settings::from_json(
            r#"{
                "buttonDefinitions": {"1": "A", "2": "B"},
                "allowedError": 0.1,
                "events": [{"id": 1, "time": 1.0}, {"id": 2, "time": 0.5}],
                "endTime": 3.0,
                "loopSegments": false
            }"#,
        )
        .unwrap();
        let mut sim = Simulation::new(&settings).unwrap();
        sim.start().unwrap();
        sim.press(ControlId(1), 1_000);
        sim.finish(1_000);
        assert_eq!(sim.scores().submissions().len(), 1);
        assert_eq!(sim.session().scheduler().run(), 2);
        assert_eq!(
            sim.session().scheduler().pending_deadline().map(|(_, at)| at),
            Some(2_100)
        );
    }
}
