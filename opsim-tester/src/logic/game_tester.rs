use anyhow::{Context, Result, bail};
use chrono::Utc;
use colored::Colorize;
use opsim_game::{
    ActionOutcome, AssessmentEngine, AssessmentResult, AttemptStorage, Clock, ManualClock, Millis,
    RandomSource, RngBundle, SessionController, SessionEvent, Stream, StoredAttempt, Verdict,
};
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::sync::Arc;
use twox_hash::XxHash64;

use super::policy::{OperatorPolicy, OperatorStrategy, PlannedPress};

/// Declarative plan for running one assessment session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: OperatorStrategy,
    pub expectations: Vec<SimulationExpectation>,
    /// Run the seed twice and require identical event streams.
    pub replay_check: bool,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: OperatorStrategy) -> Self {
        Self {
            strategy,
            expectations: Vec::new(),
            replay_check: false,
        }
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }

    #[must_use]
    pub const fn with_replay_check(mut self) -> Self {
        self.replay_check = true;
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Counters gathered while a session runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub ticks: u32,
    pub windows_opened: u32,
    pub windows_preempted: u32,
    pub presses: u32,
    pub ignored_presses: u32,
    pub abandoned_presses: u32,
    pub misses: u32,
    pub fast_bonuses: u32,
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: OperatorStrategy,
    pub result: AssessmentResult,
    pub metrics: RunMetrics,
    /// Hash over every controller event; equal seeds give equal fingerprints.
    pub fingerprint: u64,
    pub ended_at: Millis,
    pub attempt: Option<StoredAttempt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedPress {
    at: Millis,
    action: opsim_game::ActionType,
    /// Opening time of the window this press answers.
    window: Option<Millis>,
}

/// Presses a policy has committed to, ordered by due time.
#[derive(Debug, Default)]
pub struct PressQueue {
    entries: Vec<QueuedPress>,
}

impl PressQueue {
    fn schedule(&mut self, base: Millis, press: PlannedPress, window: Option<Millis>) {
        let entry = QueuedPress {
            at: base.saturating_add(press.delay_ms),
            action: press.action,
            window,
        };
        let idx = self.entries.partition_point(|queued| queued.at <= entry.at);
        self.entries.insert(idx, entry);
    }

    #[must_use]
    pub fn next_at(&self) -> Option<Millis> {
        self.entries.first().map(|entry| entry.at)
    }

    fn abandon_window(&mut self, opened_at: Millis) -> u32 {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.window != Some(opened_at));
        u32::try_from(before - self.entries.len()).unwrap_or(u32::MAX)
    }

    fn take_due(&mut self, now: Millis) -> Vec<QueuedPress> {
        let due = self.entries.partition_point(|entry| entry.at <= now);
        self.entries.drain(..due).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Glue between a controller's event stream and an operator policy. Shared by
/// the virtual-time and real-time drivers.
pub struct OperatorLoop {
    policy: Box<dyn OperatorPolicy>,
    pub queue: PressQueue,
    pub metrics: RunMetrics,
    hasher: XxHash64,
    verbose: bool,
}

impl OperatorLoop {
    #[must_use]
    pub fn new(strategy: OperatorStrategy, verbose: bool) -> Self {
        Self {
            policy: strategy.create_policy(),
            queue: PressQueue::default(),
            metrics: RunMetrics::default(),
            hasher: XxHash64::with_seed(0),
            verbose,
        }
    }

    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        self.hasher.finish()
    }

    /// Feed every pending controller event to the policy. Returns the result
    /// once the session has ended.
    pub fn absorb<C: Clock, R: RandomSource>(
        &mut self,
        ctl: &mut SessionController<C, R>,
        operator: &mut dyn RandomSource,
    ) -> Option<(Millis, AssessmentResult)> {
        let window_pending = ctl.pending_window().is_some();
        let mut ended = None;
        for event in ctl.drain_events() {
            self.hash_event(&event);
            match event {
                SessionEvent::Started { .. } | SessionEvent::ActionScored { .. } => {}
                SessionEvent::Tick(snapshot) => {
                    self.metrics.ticks += 1;
                    if self.verbose
                        && !snapshot.faults.is_nominal()
                        && let Some(required) = snapshot.required
                    {
                        println!(
                            "  {} t={}s {:?}: {} ({})",
                            "⚠".red(),
                            snapshot.elapsed_seconds,
                            snapshot.faults.faults.as_slice(),
                            required.action,
                            required.reason.description()
                        );
                    }
                    if let Some(press) = self.policy.on_tick(&snapshot, window_pending, operator) {
                        self.queue.schedule(snapshot.at, press, None);
                    }
                }
                SessionEvent::WindowOpened(window) => {
                    self.metrics.windows_opened += 1;
                    if let Some(press) = self.policy.on_window(&window, operator) {
                        self.queue.schedule(window.opened_at, press, Some(window.opened_at));
                    }
                }
                SessionEvent::WindowPreempted { dropped, opened } => {
                    self.metrics.windows_preempted += 1;
                    self.metrics.windows_opened += 1;
                    self.metrics.abandoned_presses += self.queue.abandon_window(dropped.opened_at);
                    if let Some(press) = self.policy.on_window(&opened, operator) {
                        self.queue.schedule(opened.opened_at, press, Some(opened.opened_at));
                    }
                }
                SessionEvent::Missed(window) => {
                    self.metrics.misses += 1;
                    self.metrics.abandoned_presses += self.queue.abandon_window(window.opened_at);
                    if self.verbose {
                        println!(
                            "  {} {} window from {}ms lapsed",
                            "⌛".yellow(),
                            window.required,
                            window.opened_at
                        );
                    }
                }
                SessionEvent::Ended { at, result } => ended = Some((at, result)),
            }
        }
        ended
    }

    /// Press everything due at the controller's current time.
    pub fn press_due<C: Clock, R: RandomSource>(&mut self, ctl: &mut SessionController<C, R>) {
        let now = ctl.clock().now_ms();
        for press in self.queue.take_due(now) {
            // The fault cleared before the operator got there.
            if press.window.is_some() && ctl.required().is_none() {
                self.metrics.abandoned_presses += 1;
                continue;
            }
            let outcome = ctl.on_action(press.action);
            self.metrics.presses += 1;
            match outcome {
                ActionOutcome::Ignored(reason) => {
                    self.metrics.ignored_presses += 1;
                    log::debug!("{} ignored at {now}ms: {reason:?}", press.action);
                }
                ActionOutcome::Acknowledged => {}
                ActionOutcome::Scored { scored, total_score } => {
                    if scored.verdict == Verdict::Correct
                        && scored.delta > ctl.config().score.correct
                    {
                        self.metrics.fast_bonuses += 1;
                    }
                    if self.verbose {
                        println!(
                            "  {} {} at {now}ms -> {:?} ({:+}) total {total_score}",
                            "▶".cyan(),
                            press.action,
                            scored.verdict,
                            scored.delta
                        );
                    }
                }
            }
        }
    }

    fn hash_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Started { at } => {
                self.hasher.write_u8(0);
                self.hasher.write_u64(*at);
            }
            SessionEvent::Tick(snapshot) => {
                self.hasher.write_u8(1);
                self.hasher.write_u64(snapshot.at);
                for gauge in opsim_game::Gauge::ALL {
                    self.hasher.write_u64(snapshot.system.get(gauge).to_bits());
                }
            }
            SessionEvent::WindowOpened(window) => {
                self.hasher.write_u8(2);
                self.hasher.write(window.required.code().as_bytes());
                self.hasher.write_u64(window.opened_at);
            }
            SessionEvent::WindowPreempted { dropped, opened } => {
                self.hasher.write_u8(3);
                self.hasher.write_u64(dropped.opened_at);
                self.hasher.write(opened.required.code().as_bytes());
                self.hasher.write_u64(opened.opened_at);
            }
            SessionEvent::ActionScored { at, action, scored } => {
                self.hasher.write_u8(4);
                self.hasher.write_u64(*at);
                self.hasher.write(action.code().as_bytes());
                self.hasher.write_i32(scored.delta);
            }
            SessionEvent::Missed(window) => {
                self.hasher.write_u8(5);
                self.hasher.write_u64(window.opened_at);
            }
            SessionEvent::Ended { at, result } => {
                self.hasher.write_u8(6);
                self.hasher.write_u64(*at);
                self.hasher.write_i32(result.final_score);
            }
        }
    }
}

/// Headless deterministic runner: scripted operators against a
/// [`ManualClock`], jumping straight from one deadline to the next.
pub struct GameTester<'a, S: AttemptStorage> {
    engine: &'a AssessmentEngine<S>,
    verbose: bool,
    record_history: bool,
}

impl<'a, S: AttemptStorage> GameTester<'a, S> {
    pub const fn new(engine: &'a AssessmentEngine<S>, verbose: bool) -> Self {
        Self {
            engine,
            verbose,
            record_history: false,
        }
    }

    /// Persist every finished run through the engine's storage.
    #[must_use]
    pub const fn recording(mut self, record_history: bool) -> Self {
        self.record_history = record_history;
        self
    }

    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let clock = ManualClock::new(0);
        let (mut ctl, bundle) = self
            .engine
            .create_seeded_session(clock.clone(), seed)
            .context("building session")?;
        let mut operator = RngBundle::handle(&bundle, Stream::Operator);
        let mut driver = OperatorLoop::new(plan.strategy, self.verbose);

        if self.verbose {
            println!(
                "{} seed {} operator {}",
                "🎛".bright_white(),
                seed,
                plan.strategy.label().bold()
            );
        }

        ctl.start().context("starting session")?;
        let (ended_at, result) = loop {
            if let Some(done) = driver.absorb(&mut ctl, &mut operator) {
                break done;
            }
            match (driver.queue.next_at(), ctl.next_deadline()) {
                (Some(press_at), Some(timer_at)) if press_at < timer_at => {
                    clock.set(press_at);
                    driver.press_due(&mut ctl);
                }
                (Some(press_at), None) => {
                    clock.set(press_at);
                    driver.press_due(&mut ctl);
                }
                (_, Some(timer_at)) => {
                    clock.set(timer_at);
                    ctl.pump();
                }
                (None, None) => bail!("session stalled at {}ms with nothing armed", clock.now_ms()),
            }
        };

        let attempt = if self.record_history {
            Some(
                self.engine
                    .record_result(&result, Utc::now(), &mut operator)
                    .context("recording attempt")?,
            )
        } else {
            None
        };

        Ok(SimulationSummary {
            seed,
            strategy: plan.strategy,
            result,
            metrics: driver.metrics,
            fingerprint: driver.fingerprint(),
            ended_at,
            attempt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsim_game::{ActionType, AssessmentStatus, SimulatorConfig, TimingConfig};
    use std::convert::Infallible;

    struct Discard;

    impl AttemptStorage for Discard {
        type Error = Infallible;

        fn load_attempts(&self) -> Result<Vec<StoredAttempt>, Self::Error> {
            Ok(Vec::new())
        }

        fn save_attempt(&self, _attempt: &StoredAttempt) -> Result<(), Self::Error> {
            Ok(())
        }

        fn clear_attempts(&self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn engine(session_secs: u32) -> AssessmentEngine<Discard> {
        let config = SimulatorConfig {
            timing: TimingConfig {
                session_secs,
                ..TimingConfig::default()
            },
            ..SimulatorConfig::default()
        };
        AssessmentEngine::new(config, Discard).unwrap()
    }

    #[test]
    fn press_queue_orders_and_abandons() {
        let mut queue = PressQueue::default();
        queue.schedule(1_000, PlannedPress::new(500, ActionType::GasReset), Some(1_000));
        queue.schedule(0, PlannedPress::new(200, ActionType::TempHigh), None);
        queue.schedule(1_000, PlannedPress::new(900, ActionType::GasAlarm), Some(1_000));
        assert_eq!(queue.next_at(), Some(200));
        assert_eq!(queue.abandon_window(1_000), 2);
        let due = queue.take_due(5_000);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].action, ActionType::TempHigh);
        assert!(queue.is_empty());
    }

    #[test]
    fn idle_operator_never_presses_and_fails() {
        let engine = engine(60);
        let tester = GameTester::new(&engine, false);
        let summary = tester
            .run_plan(&SimulationPlan::new(OperatorStrategy::Idle), 7)
            .unwrap();
        assert_eq!(summary.metrics.presses, 0);
        assert_eq!(summary.ended_at, 60_000);
        assert_eq!(summary.metrics.ticks, 40);
        assert_eq!(summary.result.status, AssessmentStatus::Fail);
        assert!(summary.result.final_score <= 0);
    }

    #[test]
    fn perfect_operator_is_never_slow() {
        let engine = engine(120);
        let tester = GameTester::new(&engine, false);
        let summary = tester
            .run_plan(&SimulationPlan::new(OperatorStrategy::Perfect), 99)
            .unwrap();
        assert!(summary.metrics.presses > 0);
        assert_eq!(summary.result.counts.incorrect, 0);
        assert_eq!(summary.result.counts.unnecessary, 0);
        assert!(summary.result.average_reaction_ms <= 700);
    }

    #[test]
    fn same_seed_same_fingerprint() {
        let engine = engine(90);
        let tester = GameTester::new(&engine, false);
        let plan = SimulationPlan::new(OperatorStrategy::Erratic);
        let a = tester.run_plan(&plan, 5).unwrap();
        let b = tester.run_plan(&plan, 5).unwrap();
        let c = tester.run_plan(&plan, 6).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.result, b.result);
        assert_ne!(a.fingerprint, c.fingerprint);
    }
}
