use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::config::Settings;
use crate::input::{ControlMap, InputEvent, InputGate, InputLogger, RawInput};
use crate::model::{ControlId, KeyCode, Script};
use crate::playback::{MediaPlayer, PlaybackEvent, PlaybackWindow};
use crate::score::{ComboLedger, ScoreService, Standing};
use crate::timeline::{TimelineEvent, TimelinePhase, TimelineScheduler};
use crate::timer::{OneShotTimer, TimerHandle};
use crate::traits::time::Clock;
use crate::util::error::{ConfigError, SessionError};

use super::observer::{ObserverId, Observers, SessionEvent, SessionObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unloaded,
    Ready,
    Running,
    /// The last segment ended after a complete pass.
    Finished,
    Stopped,
}

// Tie order when several timers share a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TimerKind {
    Deadline,
    SegmentEnd,
    StatsPoll,
}

/// Composes the scheduler, input gate, ledger and playback window.
///
/// The session is the only component that reads the clock. Every public
/// entry point services overdue timers first, so callers only need to call
/// [`Session::tick`] at or after [`Session::next_deadline_ms`].
///
/// A completed pass does not stop playback on its own: the session moves on
/// when the current segment ends. With `loopSegments` enabled the segments
/// repeat forever, so [`SessionPhase::Finished`] is only reached when looping
/// is off and the last segment has played.
pub struct Session<C: Clock> {
    clock: C,
    phase: SessionPhase,
    scheduler: TimelineScheduler,
    gate: InputGate,
    controls: ControlMap,
    ledger: ComboLedger,
    playback: PlaybackWindow,
    scores: Box<dyn ScoreService>,
    stats_timer: OneShotTimer,
    poll_interval_ms: i64,
    observers: Observers,
    input_log: InputLogger,
    started_at_ms: i64,
}

impl<C: Clock> Session<C> {
    pub fn new(clock: C, media: Box<dyn MediaPlayer>, scores: Box<dyn ScoreService>) -> Self {
        Self {
            clock,
            phase: SessionPhase::Unloaded,
            scheduler: TimelineScheduler::new(Script::default(), 0),
            gate: InputGate::new(),
            controls: ControlMap::default(),
            ledger: ComboLedger::default(),
            playback: PlaybackWindow::new(media),
            scores,
            stats_timer: OneShotTimer::new(),
            poll_interval_ms: 0,
            observers: Observers::new(),
            input_log: InputLogger::new(),
            started_at_ms: 0,
        }
    }

    /// Configure every component from validated settings.
    ///
    /// A running session is stopped first. The nickname survives a reload.
    pub fn load(&mut self, settings: &Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        let controls = settings.control_map()?;
        if self.phase == SessionPhase::Running {
            self.stop();
        }

        let nickname = self.ledger.nickname().map(str::to_string);
        self.ledger = ComboLedger::new(settings.scoring_map(), settings.max_combo_factor);
        if let Some(nickname) = nickname {
            self.ledger.set_nickname(nickname);
        }
        self.scheduler = TimelineScheduler::new(settings.script(), settings.tolerance_ms());
        self.playback
            .configure(settings.segments(), settings.loop_segments);
        self.gate.disable();
        self.controls = controls;
        self.poll_interval_ms = settings.poll_interval_ms();
        self.phase = SessionPhase::Ready;

        info!(
            "loaded {} events over {} controls, tolerance {}ms",
            self.scheduler.script().len(),
            self.controls.len(),
            self.scheduler.tolerance_ms()
        );
        Ok(())
    }

    pub fn set_nickname(&mut self, nickname: impl Into<String>) {
        self.ledger.set_nickname(nickname);
    }

    /// Accept input, start playback and the first timeline run.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Unloaded => return Err(SessionError::NotLoaded),
            SessionPhase::Running => return Err(SessionError::AlreadyRunning),
            SessionPhase::Ready | SessionPhase::Finished | SessionPhase::Stopped => {}
        }
        let now = self.clock.now_ms();
        self.started_at_ms = now;
        self.input_log.clear();
        self.phase = SessionPhase::Running;

        self.gate.accept(self.controls.key_codes());
        self.playback.rewind();
        self.playback.start(now);
        self.scores.request_stats();
        self.stats_timer.arm(now.saturating_add(self.poll_interval_ms));
        info!("session started at {}ms", now);

        let events = self.scheduler.start(now);
        self.notify(SessionEvent::PassStarted {
            segment: self.playback.current_index(),
        });
        self.dispatch(events, now);
        Ok(())
    }

    /// Try again from the top of the current segment.
    ///
    /// Starts the session if it is not running.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        let now = self.clock.now_ms();
        if self.phase == SessionPhase::Running {
            self.service_timers(now, false);
        }
        if self.phase != SessionPhase::Running {
            return self.start();
        }
        info!("session restarted at {}ms", now);
        self.gate.accept(self.controls.key_codes());
        self.playback.restart(now);
        let events = self.scheduler.restart(now);
        self.notify(SessionEvent::PassStarted {
            segment: self.playback.current_index(),
        });
        self.dispatch(events, now);
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.phase != SessionPhase::Running {
            return;
        }
        self.scheduler.stop();
        self.playback.stop();
        self.gate.disable();
        self.stats_timer.cancel();
        self.phase = SessionPhase::Stopped;
        info!("session stopped");
    }

    /// Raw key-down signal.
    pub fn key_down(&mut self, code: KeyCode) {
        let now = self.clock.now_ms();
        self.service_timers(now, false);
        // Held-state is tracked in every phase.
        let event = self.gate.key_down(code, now);
        if self.phase != SessionPhase::Running {
            return;
        }
        self.input_log
            .record(RawInput::down(now - self.started_at_ms, code));

        let Some(InputEvent::Press(code)) = event else {
            return;
        };
        let Some(id) = self.controls.control_for(code) else {
            debug!("accepted code {} has no control", code);
            return;
        };
        let events = self.scheduler.handle_event(id, now);
        self.dispatch(events, now);
    }

    /// Raw key-up signal.
    pub fn key_up(&mut self, code: KeyCode) {
        let now = self.clock.now_ms();
        self.service_timers(now, false);
        let event = self.gate.key_up(code, now);
        if self.phase != SessionPhase::Running {
            return;
        }
        self.input_log
            .record(RawInput::up(now - self.started_at_ms, code));

        if let Some(InputEvent::Release(code)) = event
            && let Some(id) = self.controls.control_for(code)
        {
            self.notify(SessionEvent::Released { id });
        }
    }

    /// Pointer press on an on-screen control.
    pub fn control_down(&mut self, id: ControlId) {
        match self.controls.key_for(id) {
            Some(code) => self.key_down(code),
            None => debug!("control {} is not defined", id),
        }
    }

    pub fn control_up(&mut self, id: ControlId) {
        match self.controls.key_for(id) {
            Some(code) => self.key_up(code),
            None => debug!("control {} is not defined", id),
        }
    }

    /// Fire every timer due at the current time.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        self.service_timers(now, true);
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline_ms(&self) -> Option<i64> {
        self.pending_timers().into_iter().map(|(at, _, _)| at).min()
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) -> ObserverId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn scheduler(&self) -> &TimelineScheduler {
        &self.scheduler
    }

    pub fn gate(&self) -> &InputGate {
        &self.gate
    }

    pub fn controls(&self) -> &ControlMap {
        &self.controls
    }

    pub fn ledger(&self) -> &ComboLedger {
        &self.ledger
    }

    pub fn playback(&self) -> &PlaybackWindow {
        &self.playback
    }

    pub fn input_log(&self) -> &InputLogger {
        &self.input_log
    }

    pub fn standing(&self) -> Standing {
        self.ledger.standing()
    }

    pub fn started_at_ms(&self) -> i64 {
        self.started_at_ms
    }

    fn pending_timers(&self) -> Vec<(i64, TimerKind, TimerHandle)> {
        [
            (TimerKind::Deadline, self.scheduler.pending_deadline()),
            (TimerKind::SegmentEnd, self.playback.pending_end()),
            (TimerKind::StatsPoll, self.stats_timer.pending()),
        ]
        .into_iter()
        .filter_map(|(kind, pending)| pending.map(|(handle, at)| (at, kind, handle)))
        .collect()
    }

    // Timers armed while servicing wait for the next call.
    fn service_timers(&mut self, now: i64, inclusive: bool) {
        self.poll_scores();

        let mut due: Vec<_> = self
            .pending_timers()
            .into_iter()
            .filter(|(at, _, _)| if inclusive { *at <= now } else { *at < now })
            .collect();
        due.sort_by_key(|(at, kind, _)| (*at, *kind));

        for (_, kind, handle) in due {
            match kind {
                TimerKind::Deadline => {
                    if let Some(event) = self.scheduler.on_deadline(handle, now) {
                        self.dispatch(vec![event], now);
                    }
                }
                TimerKind::SegmentEnd => {
                    if let Some(PlaybackEvent::SegmentEnded { index }) =
                        self.playback.on_timer(handle, now)
                    {
                        self.on_segment_end(index, now);
                    }
                }
                TimerKind::StatsPoll => {
                    if self.stats_timer.fire(handle, now) {
                        self.scores.request_stats();
                        self.stats_timer.arm(now.saturating_add(self.poll_interval_ms));
                    }
                }
            }
        }
    }

    fn poll_scores(&mut self) {
        if let Some(stats) = self.scores.poll_stats() {
            self.ledger.apply_stats(stats);
            self.notify(SessionEvent::StandingUpdated(self.ledger.standing()));
        }
    }

    fn dispatch(&mut self, events: Vec<TimelineEvent>, now: i64) {
        let mut queue = VecDeque::from(events);
        while let Some(event) = queue.pop_front() {
            match event {
                TimelineEvent::Success { id, .. } => {
                    let points = self.ledger.success(id);
                    self.notify(SessionEvent::Success {
                        id,
                        points,
                        score: self.ledger.score(),
                    });
                    self.notify(SessionEvent::StandingUpdated(self.ledger.standing()));
                }
                TimelineEvent::Cancel { id, reason, .. } => {
                    let submission = self.ledger.cancel(id);
                    let final_score = submission.final_score;
                    self.scores.submit(submission);
                    self.notify(SessionEvent::Cancel {
                        id,
                        reason,
                        final_score,
                    });
                    self.notify(SessionEvent::StandingUpdated(self.ledger.standing()));

                    self.playback.restart(now);
                    queue.extend(self.scheduler.restart(now));
                    self.notify(SessionEvent::PassStarted {
                        segment: self.playback.current_index(),
                    });
                }
                TimelineEvent::Finished => {
                    let factor = self.ledger.increase_combo();
                    self.gate.disable();
                    self.notify(SessionEvent::ComboIncreased { factor });
                    self.notify(SessionEvent::Finished);
                }
            }
        }
    }

    fn on_segment_end(&mut self, index: usize, now: i64) {
        if self.scheduler.phase() != TimelinePhase::Exhausted {
            warn!(
                "segment {} ended before the script was complete, replaying it",
                index
            );
            self.playback.restart(now);
            return;
        }

        if self.playback.advance(now) {
            self.gate.accept(self.controls.key_codes());
            let events = self.scheduler.restart(now);
            self.notify(SessionEvent::PassStarted {
                segment: self.playback.current_index(),
            });
            self.dispatch(events, now);
        } else {
            self.playback.stop();
            self.stats_timer.cancel();
            self.phase = SessionPhase::Finished;
            info!("all segments played, session finished");
        }
    }

    fn notify(&mut self, event: SessionEvent) {
        self.observers.notify(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{MediaCommand, RecordingMedia};
    use crate::score::{RecordingScoreService, ScoreStats};
    use crate::timeline::CancelReason;
    use crate::traits::time::MockClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    const A: ControlId = ControlId(1);
    const KEY_A: KeyCode = KeyCode(49);

    fn settings(json_extra: &str) -> Settings {
        let json = format!(
            r#"{{
                "buttonDefinitions": {{"1": "A", "2": "B"}},
                "baseId": 48,
                "allowedError": 0.2,
                "events": [{{"id": 1, "time": 1.0}}],
                "scoring": {{"1": 10}},
                "pollRate": 2
                {}
            }}"#,
            json_extra
        );
        Settings::from_json(&json).unwrap()
    }

    struct Harness {
        clock: MockClock,
        media: RecordingMedia,
        scores: RecordingScoreService,
        events: Rc<RefCell<Vec<SessionEvent>>>,
        session: Session<MockClock>,
    }

    fn harness(settings: &Settings) -> Harness {
        let clock = MockClock::new();
        let media = RecordingMedia::new();
        let scores = RecordingScoreService::new();
        let mut session = Session::new(
            clock.clone(),
            Box::new(media.clone()),
            Box::new(scores.clone()),
        );
        session.load(settings).unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        session.subscribe(Box::new(move |e: &SessionEvent| sink.borrow_mut().push(e.clone())));
        Harness {
            clock,
            media,
            scores,
            events,
            session,
        }
    }

    #[test]
    fn start_requires_load() {
        let mut session = Session::new(
            MockClock::new(),
            Box::new(RecordingMedia::new()),
            Box::new(RecordingScoreService::new()),
        );
        assert_eq!(session.start(), Err(SessionError::NotLoaded));
        assert_eq!(session.phase(), SessionPhase::Unloaded);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut h = harness(&settings(""));
        h.session.start().unwrap();
        assert_eq!(h.session.start(), Err(SessionError::AlreadyRunning));
    }

    #[test]
    fn start_wires_components() {
        let mut h = harness(&settings(""));
        h.session.start().unwrap();
        assert_eq!(h.session.phase(), SessionPhase::Running);
        assert!(h.session.gate().is_accepted(KEY_A));
        assert_eq!(h.media.commands(), vec![MediaCommand::Seek(0), MediaCommand::Play]);
        assert_eq!(h.scores.stats_requests(), 1);
        assert_eq!(h.session.next_deadline_ms(), Some(1_200));
        assert_eq!(
            h.events.borrow().first(),
            Some(&SessionEvent::PassStarted { segment: 0 })
        );
    }

    #[test]
    fn press_before_start_is_ignored() {
        let mut h = harness(&settings(""));
        h.clock.set_time(1_000);
        h.session.key_down(KEY_A);
        assert!(h.events.borrow().is_empty());
        assert!(h.session.input_log().is_empty());
    }

    #[test]
    fn hit_scores_and_finishes() {
        let mut h = harness(&settings(r#", "loopSegments": false"#));
        h.session.start().unwrap();
        h.clock.set_time(1_100);
        h.session.key_down(KEY_A);
        h.session.key_up(KEY_A);

        let events = h.events.borrow().clone();
        assert!(events.contains(&SessionEvent::Success {
            id: A,
            points: 10,
            score: 10
        }));
        assert!(events.contains(&SessionEvent::ComboIncreased { factor: 2 }));
        assert!(events.contains(&SessionEvent::Finished));
        assert!(!h.session.gate().is_enabled());
        assert!(!events.contains(&SessionEvent::Released { id: A }));

        h.clock.set_time(1_200);
        h.session.tick();
        assert_eq!(h.session.phase(), SessionPhase::Finished);
        assert_eq!(h.media.commands().last(), Some(&MediaCommand::Pause));
        assert_eq!(h.session.next_deadline_ms(), None);
    }

    #[test]
    fn release_is_reported_while_accepted() {
        let mut h = harness(&settings(""));
        h.session.start().unwrap();
        h.clock.set_time(300);
        h.session.key_down(KeyCode(50));
        h.session.key_up(KeyCode(50));
        assert!(
            h.events
                .borrow()
                .contains(&SessionEvent::Released { id: ControlId(2) })
        );
    }

    #[test]
    fn timeout_cancels_submits_and_restarts() {
        let mut h = harness(&settings(""));
        h.session.set_nickname("ada");
        h.session.start().unwrap();
        h.clock.set_time(1_200);
        h.session.tick();

        assert!(h.events.borrow().contains(&SessionEvent::Cancel {
            id: A,
            reason: CancelReason::DeadlineElapsed,
            final_score: 0
        }));
        let submissions = h.scores.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].nickname.as_deref(), Some("ada"));
        assert_eq!(h.session.scheduler().start_ms(), 1_200);
        assert_eq!(h.session.scheduler().run(), 2);
        assert_eq!(
            h.session.scheduler().pending_deadline().map(|(_, at)| at),
            Some(2_400)
        );
        assert_eq!(h.session.next_deadline_ms(), Some(2_000));
        assert_eq!(
            h.media.commands()[2..].to_vec(),
            vec![MediaCommand::Seek(0), MediaCommand::Play]
        );
    }

    #[test]
    fn short_segment_replays_alone() {
        let mut h = harness(&settings(r#", "endTime": 0.5"#));
        h.session.start().unwrap();
        h.clock.set_time(500);
        h.session.tick();
        assert_eq!(h.session.scheduler().run(), 1);
        assert_eq!(h.session.playback().pending_end().map(|(_, at)| at), Some(1_000));
    }

    #[test]
    fn stats_are_polled_and_applied() {
        let mut h = harness(&settings(""));
        h.session.start().unwrap();
        h.scores.push_stats(ScoreStats {
            high_score: 40.0,
            average_score: 5.0,
            most_failed: 1,
            high_score_holder: Some("bob".to_string()),
        });
        h.clock.set_time(500);
        h.session.tick();
        let standing = h.session.standing();
        assert_eq!(standing.high_score, 40);
        assert_eq!(standing.most_failed, Some(A));
        assert!(
            h.events
                .borrow()
                .iter()
                .any(|e| matches!(e, SessionEvent::StandingUpdated(_)))
        );

        h.clock.set_time(1_100);
        h.session.key_down(KEY_A);
        h.clock.set_time(2_000);
        h.session.tick();
        assert_eq!(h.scores.stats_requests(), 2);
    }

    #[test]
    fn stop_disarms_everything() {
        let mut h = harness(&settings(""));
        h.session.start().unwrap();
        h.session.stop();
        assert_eq!(h.session.phase(), SessionPhase::Stopped);
        assert_eq!(h.session.next_deadline_ms(), None);
        assert!(!h.session.gate().is_enabled());
        h.session.start().unwrap();
        assert_eq!(h.session.phase(), SessionPhase::Running);
    }

    #[test]
    fn key_released_while_stopped_is_not_stale() {
        let mut h = harness(&settings(""));
        h.session.start().unwrap();
        h.clock.set_time(500);
        h.session.key_down(KEY_A);
        h.session.stop();
        h.clock.set_time(600);
        h.session.key_up(KEY_A);
        assert!(!h.session.gate().is_held(KEY_A));

        h.clock.set_time(1_000);
        h.session.start().unwrap();
        h.events.borrow_mut().clear();
        h.clock.set_time(2_000);
        h.session.key_down(KEY_A);
        assert!(h.events.borrow().contains(&SessionEvent::Success {
            id: A,
            points: 10,
            score: 10
        }));
    }

    #[test]
    fn key_held_across_start_counts_as_repeat() {
        let mut h = harness(&settings(""));
        h.clock.set_time(900);
        h.session.key_down(KEY_A);
        h.session.start().unwrap();
        h.clock.set_time(1_000);
        h.session.key_down(KEY_A);
        assert!(
            !h.events
                .borrow()
                .iter()
                .any(|e| matches!(e, SessionEvent::Success { .. }))
        );
    }

    #[test]
    fn standing_follows_every_outcome() {
        let mut h = harness(&settings(""));
        h.scores.push_stats(ScoreStats {
            high_score: 5.0,
            average_score: 2.0,
            most_failed: 1,
            high_score_holder: Some("bob".to_string()),
        });
        h.session.set_nickname("ada");
        h.session.start().unwrap();
        h.clock.set_time(1_000);
        h.session.key_down(KEY_A);

        let standings: Vec<Standing> = h
            .events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::StandingUpdated(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        let last = standings.last().unwrap();
        assert_eq!(last.score, 10);
        assert!(last.beating_high_score);
        assert_eq!(last.high_score, 10);
        assert_eq!(last.high_score_holder.as_deref(), Some("ada"));

        h.events.borrow_mut().clear();
        h.clock.set_time(2_200);
        h.session.tick();
        h.clock.set_time(2_500);
        h.session.key_down(KeyCode(50));
        let events = h.events.borrow().clone();
        let cancel = events
            .iter()
            .position(|e| matches!(e, SessionEvent::Cancel { .. }))
            .unwrap();
        assert!(matches!(
            &events[cancel + 1],
            SessionEvent::StandingUpdated(s) if s.score == 0 && !s.beating_high_score
        ));
    }

    #[test]
    fn raw_input_is_logged_relative_to_start() {
        let mut h = harness(&settings(""));
        h.clock.set_time(10_000);
        h.session.start().unwrap();
        h.clock.set_time(10_250);
        h.session.key_down(KeyCode(50));
        assert_eq!(
            h.session.input_log().logs(),
            &[RawInput::down(250, KeyCode(50))]
        );
    }
}
