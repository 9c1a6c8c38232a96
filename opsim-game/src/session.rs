//! Session controller: owns the timers and is the only path that mutates a
//! running assessment.
//!
//! Every callback runs to completion before the next one is dispatched, so the
//! ordering rules are simple: a user action cancels the live window timer
//! before it is scored, a changed requirement replaces the window timer before
//! a new one is armed, and ending the session disarms every timer before the
//! result is built.
use std::collections::VecDeque;

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::ActionType;
use crate::assessment::{AssessmentResult, assess};
use crate::clock::{Clock, Millis};
use crate::config::{ConfigError, SimulatorConfig};
use crate::constants::{LOG_TARGET_SESSION, LOG_TARGET_WINDOW};
use crate::gauges::SystemState;
use crate::numbers::whole_seconds;
use crate::resolver::{RequiredAction, TemperatureSpikeCounter, resolve};
use crate::rng::RandomSource;
use crate::scoring::{ScoreState, ScoredAction, Verdict};
use crate::simulator;
use crate::timers::{IntervalTimer, OneShotTimer};
use crate::window::{PendingWindow, ReactionWindowTracker, WindowTransition};
use crate::zones::ZoneReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    #[default]
    Idle,
    Playing,
    Ended,
}

/// Mutable state of one assessment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub phase: GamePhase,
    pub system: SystemState,
    pub elapsed_ms: Millis,
    pub temperature: TemperatureSpikeCounter,
    pub last_system_reset_at: Option<Millis>,
    /// Session time forfeited to correct system resets.
    pub time_penalty_ms: Millis,
    pub started_at: Option<Millis>,
    pub ended_at: Option<Millis>,
    pub last_action_at: Option<Millis>,
    pub required: Option<RequiredAction>,
    pub temperature_history: VecDeque<f64>,
}

impl GameSession {
    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        whole_seconds(self.elapsed_ms)
    }

    #[must_use]
    pub const fn temperature_spike_count(&self) -> u8 {
        self.temperature.count()
    }
}

/// What the rendering side needs after each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub at: Millis,
    pub system: SystemState,
    pub elapsed_seconds: u32,
    pub temperature_spike_count: u8,
    pub required: Option<RequiredAction>,
    pub red_condition_count: usize,
    pub critical_overlap: bool,
    pub faults: ZoneReport,
}

/// Ordered log of everything the controller did, drained by drivers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started { at: Millis },
    Tick(TickSnapshot),
    WindowOpened(PendingWindow),
    WindowPreempted {
        dropped: PendingWindow,
        opened: PendingWindow,
    },
    ActionScored {
        at: Millis,
        action: ActionType,
        scored: ScoredAction,
    },
    Missed(PendingWindow),
    Ended {
        at: Millis,
        result: AssessmentResult,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotPlaying,
    Debounced,
    ResetCoolingDown { remaining_ms: Millis },
}

/// Result of pressing a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Dropped before scoring; nothing changed.
    Ignored(RejectReason),
    /// The "do nothing" control; never scored and never touches a window.
    Acknowledged,
    Scored {
        scored: ScoredAction,
        total_score: i32,
    },
}

/// Lifecycle misuse.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,
    #[error("session has not started")]
    NotStarted,
    #[error("session has not ended")]
    NotEnded,
    #[error("restart available in {remaining_ms}ms")]
    RestartCoolingDown { remaining_ms: Millis },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TimerKind {
    Window,
    Tick,
    Session,
}

/// Drives one assessment at a time against an injected clock and random source.
#[derive(Debug)]
pub struct SessionController<C: Clock, R: RandomSource> {
    clock: C,
    rng: R,
    cfg: SimulatorConfig,
    session: GameSession,
    score: ScoreState,
    window: ReactionWindowTracker,
    tick_timer: IntervalTimer,
    window_timer: OneShotTimer,
    session_timer: OneShotTimer,
    result: Option<AssessmentResult>,
    events: Vec<SessionEvent>,
}

impl<C: Clock, R: RandomSource> SessionController<C, R> {
    /// Build an idle controller.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the configuration fails validation.
    pub fn new(clock: C, rng: R, cfg: SimulatorConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            clock,
            rng,
            window: ReactionWindowTracker::new(cfg.timing.reaction_window_ms),
            tick_timer: IntervalTimer::new(cfg.timing.tick_ms),
            cfg,
            session: GameSession::default(),
            score: ScoreState::new(),
            window_timer: OneShotTimer::default(),
            session_timer: OneShotTimer::default(),
            result: None,
            events: Vec::new(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &SimulatorConfig {
        &self.cfg
    }

    #[must_use]
    pub const fn session(&self) -> &GameSession {
        &self.session
    }

    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.session.phase
    }

    #[must_use]
    pub const fn score(&self) -> &ScoreState {
        &self.score
    }

    #[must_use]
    pub const fn result(&self) -> Option<&AssessmentResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub const fn required(&self) -> Option<RequiredAction> {
        self.session.required
    }

    #[must_use]
    pub const fn pending_window(&self) -> Option<&PendingWindow> {
        self.window.pending()
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Milliseconds until the session timer fires, 0 once it is disarmed.
    #[must_use]
    pub fn remaining_ms(&self) -> Millis {
        self.session_timer
            .deadline()
            .map_or(0, |at| at.saturating_sub(self.clock.now_ms()))
    }

    /// Earliest armed timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Millis> {
        self.next_timer().map(|(at, _)| at)
    }

    /// Idle to playing: arm the tick and session timers and evaluate the opening panel.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` unless the session is idle.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.session.phase != GamePhase::Idle {
            return Err(SessionError::AlreadyStarted);
        }
        let now = self.clock.now_ms();
        self.session.phase = GamePhase::Playing;
        self.session.started_at = Some(now);
        self.tick_timer.start(now);
        self.session_timer
            .arm(now.saturating_add(self.cfg.timing.session_ms()));
        info!(
            target: LOG_TARGET_SESSION,
            "session started at {now}ms for {}s",
            self.cfg.timing.session_secs
        );
        self.events.push(SessionEvent::Started { at: now });
        self.evaluate(now);
        Ok(())
    }

    /// Advance the simulation one tick at the current clock time.
    pub fn on_tick(&mut self) -> Option<TickSnapshot> {
        let now = self.clock.now_ms();
        self.tick_at(now)
    }

    /// Press a control at the current clock time. Overdue timers are
    /// dispatched first so a press never lands before an expired window.
    pub fn on_action(&mut self, action: ActionType) -> ActionOutcome {
        self.pump();
        let now = self.clock.now_ms();
        self.action_at(action, now)
    }

    /// Record a miss if the live window has expired.
    pub fn on_window_timeout(&mut self) -> Option<PendingWindow> {
        let now = self.clock.now_ms();
        self.window_timeout_at(now)
    }

    /// End the session and build the assessment. Later calls return the same result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` for a session that never started.
    pub fn on_session_end(&mut self) -> Result<AssessmentResult, SessionError> {
        if self.result.is_none() && self.session.phase == GamePhase::Idle {
            return Err(SessionError::NotStarted);
        }
        let now = self.clock.now_ms();
        Ok(self.finish_at(now))
    }

    /// Fire every due timer in deadline order. Ties go window, tick, session.
    /// Each callback sees its own scheduled time as "now". Returns the number
    /// of callbacks dispatched.
    pub fn pump(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;
        while let Some((at, kind)) = self.next_timer().filter(|(at, _)| *at <= now) {
            match kind {
                TimerKind::Window => {
                    self.window_timer.fire(at);
                    self.window_timeout_at(at);
                }
                TimerKind::Tick => {
                    self.tick_timer.fire(at);
                    self.tick_at(at);
                }
                TimerKind::Session => {
                    self.session_timer.fire(at);
                    self.finish_at(at);
                }
            }
            fired += 1;
        }
        fired
    }

    /// Time left before a restart is allowed.
    #[must_use]
    pub fn restart_remaining_ms(&self) -> Option<Millis> {
        let ended_at = self.session.ended_at?;
        let ready_at = ended_at.saturating_add(self.cfg.timing.restart_cooldown_ms());
        Some(ready_at.saturating_sub(self.clock.now_ms()))
    }

    /// Start a fresh session once the restart cooldown has elapsed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotEnded` while a session is idle or running, and
    /// `SessionError::RestartCoolingDown` during the cooldown.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        if self.session.phase != GamePhase::Ended {
            return Err(SessionError::NotEnded);
        }
        match self.restart_remaining_ms() {
            Some(0) => {}
            Some(remaining_ms) => return Err(SessionError::RestartCoolingDown { remaining_ms }),
            None => return Err(SessionError::NotEnded),
        }
        self.session = GameSession::default();
        self.score = ScoreState::new();
        self.window.reset();
        self.tick_timer.cancel();
        self.window_timer.cancel();
        self.session_timer.cancel();
        self.result = None;
        self.start()
    }

    fn next_timer(&self) -> Option<(Millis, TimerKind)> {
        [
            (self.window_timer.deadline(), TimerKind::Window),
            (self.tick_timer.deadline(), TimerKind::Tick),
            (self.session_timer.deadline(), TimerKind::Session),
        ]
        .into_iter()
        .filter_map(|(deadline, kind)| deadline.map(|at| (at, kind)))
        .min()
    }

    fn elapsed_at(&self, now: Millis) -> Millis {
        self.session
            .started_at
            .map_or(0, |start| now.saturating_sub(start))
    }

    fn tick_at(&mut self, now: Millis) -> Option<TickSnapshot> {
        if self.session.phase != GamePhase::Playing {
            return None;
        }
        self.session.elapsed_ms = self.elapsed_at(now);
        let elapsed_seconds = self.session.elapsed_seconds();
        self.session.system = simulator::advance(
            &self.session.system,
            elapsed_seconds,
            &self.cfg.difficulty,
            &mut self.rng,
        );

        let hot = self
            .cfg
            .zones
            .temperature_high(self.session.system.temperature);
        if self.session.temperature.observe(hot) {
            debug!(target: LOG_TARGET_SESSION, "temperature episode began at {elapsed_seconds}s");
        }
        let history = &mut self.session.temperature_history;
        history.push_back(self.session.system.temperature);
        while history.len() > self.cfg.timing.temperature_history_len {
            history.pop_front();
        }

        self.evaluate(now);

        let snapshot = TickSnapshot {
            at: now,
            system: self.session.system,
            elapsed_seconds,
            temperature_spike_count: self.session.temperature_spike_count(),
            required: self.session.required,
            red_condition_count: self.cfg.zones.red_condition_count(&self.session.system),
            critical_overlap: self.cfg.zones.critical_overlap(&self.session.system),
            faults: ZoneReport::classify(&self.session.system, &self.cfg.zones),
        };
        trace!(target: LOG_TARGET_SESSION, "tick {snapshot:?}");
        self.events.push(SessionEvent::Tick(snapshot.clone()));
        Some(snapshot)
    }

    fn evaluate(&mut self, now: Millis) {
        let required = resolve(
            &self.session.system,
            self.session.temperature_spike_count(),
            &self.cfg.zones,
        );
        if required != self.session.required {
            debug!(
                target: LOG_TARGET_SESSION,
                "requirement {:?} -> {:?}",
                self.session.required.map(|r| r.action),
                required.map(|r| r.action)
            );
        }
        self.session.required = required;

        let transition = self.window.observe(required.map(|r| r.action), now);
        let Some(opened) = transition.opened() else {
            return;
        };
        self.score.set_pending_window(opened.required, opened.opened_at);
        self.window_timer.arm(opened.deadline);
        self.events.push(match transition {
            WindowTransition::Preempted { dropped, opened } => {
                SessionEvent::WindowPreempted { dropped, opened }
            }
            _ => SessionEvent::WindowOpened(opened),
        });
    }

    fn action_at(&mut self, action: ActionType, now: Millis) -> ActionOutcome {
        if self.session.phase != GamePhase::Playing {
            return ActionOutcome::Ignored(RejectReason::NotPlaying);
        }
        if action.is_none() {
            return ActionOutcome::Acknowledged;
        }
        let timing = &self.cfg.timing;
        if self
            .session
            .last_action_at
            .is_some_and(|last| now.saturating_sub(last) < timing.debounce_ms)
        {
            return ActionOutcome::Ignored(RejectReason::Debounced);
        }
        if action == ActionType::SystemReset
            && let Some(last_reset) = self.session.last_system_reset_at
        {
            let since = now.saturating_sub(last_reset);
            if since < timing.system_reset_cooldown_ms {
                return ActionOutcome::Ignored(RejectReason::ResetCoolingDown {
                    remaining_ms: timing.system_reset_cooldown_ms - since,
                });
            }
        }

        self.session.last_action_at = Some(now);
        self.window_timer.cancel();
        self.window.consume();

        let required = resolve(
            &self.session.system,
            self.session.temperature_spike_count(),
            &self.cfg.zones,
        )
        .map(|r| r.action);
        let elapsed_seconds = whole_seconds(self.elapsed_at(now));
        let scored = self
            .score
            .record_action(required, action, now, elapsed_seconds, &self.cfg.score);
        debug!(
            target: LOG_TARGET_WINDOW,
            "{action} at {elapsed_seconds}s judged {:?} ({:+})",
            scored.verdict,
            scored.delta
        );

        self.session.temperature.acknowledge(action);
        if action == ActionType::SystemReset {
            self.apply_system_reset(now, scored.verdict == Verdict::Correct);
        }

        self.events.push(SessionEvent::ActionScored {
            at: now,
            action,
            scored,
        });
        self.evaluate(now);
        ActionOutcome::Scored {
            scored,
            total_score: self.score.total_score,
        }
    }

    fn apply_system_reset(&mut self, now: Millis, correct: bool) {
        self.session.system = SystemState::SAFE;
        self.session.temperature.clear_episode();
        self.session.last_system_reset_at = Some(now);
        if !correct {
            return;
        }
        let penalty = self.cfg.timing.system_reset_penalty_ms();
        self.session.time_penalty_ms = self.session.time_penalty_ms.saturating_add(penalty);
        if let Some(deadline) = self.session_timer.deadline() {
            self.session_timer.arm(deadline.saturating_sub(penalty).max(now));
        }
        info!(
            target: LOG_TARGET_SESSION,
            "system reset forfeits {}s of session time",
            self.cfg.timing.system_reset_penalty_secs
        );
    }

    fn window_timeout_at(&mut self, now: Millis) -> Option<PendingWindow> {
        if self.session.phase != GamePhase::Playing {
            return None;
        }
        let expired = self.window.expire(now)?;
        self.window_timer.cancel();
        self.score.record_missed_action(&self.cfg.score);
        self.events.push(SessionEvent::Missed(expired));
        Some(expired)
    }

    /// Disarm everything and assess. Callers make sure the session started.
    fn finish_at(&mut self, now: Millis) -> AssessmentResult {
        if let Some(result) = &self.result {
            return result.clone();
        }
        self.tick_timer.cancel();
        self.window_timer.cancel();
        self.session_timer.cancel();
        if let Some(dropped) = self.window.pending().copied() {
            debug!(
                target: LOG_TARGET_WINDOW,
                "window for {} discarded at session end",
                dropped.required
            );
        }
        self.window.reset();

        self.session.elapsed_ms = self.elapsed_at(now);
        self.session.phase = GamePhase::Ended;
        self.session.ended_at = Some(now);

        let result = assess(&self.score, &self.cfg);
        info!(
            target: LOG_TARGET_SESSION,
            "session ended at {}s: {} {} score={} accuracy={}%",
            self.session.elapsed_seconds(),
            result.status,
            result.classification,
            result.final_score,
            result.accuracy_percent
        );
        self.events.push(SessionEvent::Ended {
            at: now,
            result: result.clone(),
        });
        self.result = Some(result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rng::SequenceSource;

    type Controller = SessionController<ManualClock, SequenceSource>;

    /// Quiet panel: never spikes and every nudge lands at zero.
    fn calm() -> SequenceSource {
        SequenceSource::constant(0.5)
    }

    fn controller(rng: SequenceSource) -> (ManualClock, Controller) {
        let clock = ManualClock::new(0);
        let ctl = SessionController::new(clock.clone(), rng, SimulatorConfig::default())
            .expect("default config");
        (clock, ctl)
    }

    #[test]
    fn start_opens_window_for_opening_requirement() {
        let (_, mut ctl) = controller(calm());
        ctl.start().expect("start");
        assert_eq!(ctl.phase(), GamePhase::Playing);
        assert_eq!(
            ctl.required().map(|r| r.action),
            Some(ActionType::StabilizerReset)
        );
        assert_eq!(ctl.pending_window().map(|w| w.deadline), Some(3_000));
        assert_eq!(ctl.next_deadline(), Some(1_500));
        assert_eq!(ctl.start(), Err(SessionError::AlreadyStarted));
    }

    #[test]
    fn actions_before_start_are_ignored() {
        let (_, mut ctl) = controller(calm());
        assert_eq!(
            ctl.on_action(ActionType::GasReset),
            ActionOutcome::Ignored(RejectReason::NotPlaying)
        );
        assert_eq!(ctl.on_session_end(), Err(SessionError::NotStarted));
    }

    #[test]
    fn correct_press_scores_and_closes_window() {
        let (clock, mut ctl) = controller(calm());
        ctl.start().expect("start");
        clock.set(700);
        let outcome = ctl.on_action(ActionType::StabilizerReset);
        let ActionOutcome::Scored { scored, total_score } = outcome else {
            panic!("expected score, got {outcome:?}");
        };
        assert_eq!(scored.verdict, Verdict::Correct);
        assert_eq!(scored.reaction_time_ms, Some(700));
        assert_eq!(total_score, 15);
        assert!(ctl.pending_window().is_none());
        clock.set(10_000);
        ctl.pump();
        assert_eq!(ctl.score().missed, 0);
    }

    #[test]
    fn ignored_window_is_missed_then_rearmed() {
        let (clock, mut ctl) = controller(calm());
        ctl.start().expect("start");
        clock.set(2_999);
        ctl.pump();
        assert_eq!(ctl.score().missed, 0);
        // The expiry fires before the tick sharing its deadline, which re-arms.
        clock.set(3_000);
        ctl.pump();
        assert_eq!(ctl.score().missed, 1);
        assert_eq!(ctl.pending_window().map(|w| w.opened_at), Some(3_000));
        clock.set(6_000);
        ctl.pump();
        assert_eq!(ctl.score().missed, 2);
        assert_eq!(ctl.score().total_score, -40);
    }

    #[test]
    fn debounce_and_none_do_not_score() {
        let (clock, mut ctl) = controller(calm());
        ctl.start().expect("start");
        clock.set(100);
        assert!(matches!(
            ctl.on_action(ActionType::GasReset),
            ActionOutcome::Scored { .. }
        ));
        clock.set(400);
        assert_eq!(
            ctl.on_action(ActionType::GasReset),
            ActionOutcome::Ignored(RejectReason::Debounced)
        );
        assert_eq!(ctl.on_action(ActionType::None), ActionOutcome::Acknowledged);
        assert_eq!(ctl.score().history.len(), 1);
    }

    #[test]
    fn system_reset_cooldown_and_penalty() {
        let (clock, mut ctl) = controller(calm());
        ctl.start().expect("start");
        ctl.session.system.temperature = 90.0;
        ctl.session.system.o2 = 10.0;
        clock.set(1_000);
        let outcome = ctl.on_action(ActionType::SystemReset);
        let ActionOutcome::Scored { scored, .. } = outcome else {
            panic!("expected score, got {outcome:?}");
        };
        assert_eq!(scored.verdict, Verdict::Correct);
        assert_eq!(ctl.session().system, SystemState::SAFE);
        assert_eq!(ctl.session().time_penalty_ms, 10_000);
        assert_eq!(ctl.remaining_ms(), 480_000 - 10_000 - 1_000);

        clock.set(5_000);
        assert_eq!(
            ctl.on_action(ActionType::SystemReset),
            ActionOutcome::Ignored(RejectReason::ResetCoolingDown {
                remaining_ms: 6_000
            })
        );
    }

    #[test]
    fn session_runs_to_its_deadline_and_is_idempotent() {
        let (clock, mut ctl) = controller(calm());
        ctl.start().expect("start");
        clock.set(480_000);
        ctl.pump();
        assert_eq!(ctl.phase(), GamePhase::Ended);
        assert_eq!(ctl.next_deadline(), None);
        let first = ctl.result().cloned().expect("result");
        assert!(first.final_score < 0);
        assert_eq!(ctl.on_session_end(), Ok(first));
        assert_eq!(ctl.on_tick(), None);
    }

    #[test]
    fn restart_waits_for_cooldown() {
        let (clock, mut ctl) = controller(calm());
        ctl.start().expect("start");
        assert_eq!(ctl.restart(), Err(SessionError::NotEnded));
        clock.set(2_000);
        ctl.on_session_end().expect("end");
        clock.set(4_000);
        assert_eq!(
            ctl.restart(),
            Err(SessionError::RestartCoolingDown {
                remaining_ms: 3_000
            })
        );
        clock.set(7_000);
        ctl.restart().expect("restart");
        assert_eq!(ctl.phase(), GamePhase::Playing);
        assert!(ctl.score().history.is_empty());
        assert_eq!(ctl.score().missed, 0);
        assert_eq!(ctl.pending_window().map(|w| w.opened_at), Some(7_000));
        assert_eq!(ctl.remaining_ms(), 480_000);
    }

    #[test]
    fn tick_keeps_bounded_temperature_history() {
        let (clock, mut ctl) = controller(calm());
        ctl.start().expect("start");
        clock.set(60_000);
        ctl.pump();
        assert_eq!(ctl.session().temperature_history.len(), 30);
        let ticks = ctl
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, SessionEvent::Tick(_)))
            .count();
        assert_eq!(ticks, 40);
    }

    fn press(ctl: &mut Controller, action: ActionType) -> Verdict {
        match ctl.on_action(action) {
            ActionOutcome::Scored { scored, .. } => scored.verdict,
            other => panic!("{action} not scored: {other:?}"),
        }
    }

    #[test]
    fn temperature_cycle_follows_presses_and_episodes() {
        let (clock, mut ctl) = controller(calm());
        ctl.start().expect("start");
        // one stabilizer out of band keeps the stabilizer rules quiet
        ctl.session.system.stabilizer_top = 85.0;
        ctl.session.system.temperature = 90.0;

        clock.set(1_500);
        ctl.pump();
        assert_eq!(ctl.session().temperature_spike_count(), 0);
        assert_eq!(ctl.required().map(|r| r.action), Some(ActionType::TempHigh));

        clock.set(2_000);
        assert_eq!(press(&mut ctl, ActionType::TempHigh), Verdict::Correct);
        assert_eq!(ctl.session().temperature_spike_count(), 1);
        clock.set(2_600);
        assert_eq!(press(&mut ctl, ActionType::TempHigh), Verdict::Correct);
        assert_eq!(ctl.session().temperature_spike_count(), 2);
        assert_eq!(
            ctl.required().map(|r| r.action),
            Some(ActionType::Temp3rdHigh)
        );
        clock.set(3_100);
        assert_eq!(press(&mut ctl, ActionType::Temp3rdHigh), Verdict::Correct);
        assert_eq!(ctl.session().temperature_spike_count(), 0);

        // still hot across the 3000ms tick, so the count carries on
        clock.set(3_700);
        press(&mut ctl, ActionType::TempHigh);
        assert_eq!(ctl.session().temperature_spike_count(), 1);

        // red, green, red again: a fresh episode restarts the cycle
        ctl.session.system.temperature = 45.0;
        clock.set(4_500);
        ctl.pump();
        assert_eq!(ctl.session().temperature_spike_count(), 1);
        ctl.session.system.temperature = 90.0;
        clock.set(6_000);
        ctl.pump();
        assert_eq!(ctl.session().temperature_spike_count(), 0);

        // a system reset ends the episode, so the next hot tick is fresh too
        clock.set(6_500);
        press(&mut ctl, ActionType::TempHigh);
        assert_eq!(ctl.session().temperature_spike_count(), 1);
        ctl.session.system.o2 = 10.0;
        clock.set(7_000);
        assert_eq!(press(&mut ctl, ActionType::SystemReset), Verdict::Correct);
        assert_eq!(ctl.session().system, SystemState::SAFE);
        ctl.session.system.temperature = 90.0;
        clock.set(7_500);
        ctl.pump();
        assert_eq!(ctl.session().temperature_spike_count(), 0);
    }

    #[test]
    fn tick_snapshot_lists_active_faults() {
        let (clock, mut ctl) = controller(calm());
        ctl.start().expect("start");
        ctl.session.system.co2 = 90.0;
        clock.set(1_500);
        let snapshot = ctl.on_tick().expect("playing");
        assert_eq!(snapshot.faults.faults.as_slice(), &[crate::zones::Fault::Co2High]);
        assert_eq!(snapshot.red_condition_count, 1);
        assert!(!snapshot.faults.is_nominal());
    }
}
