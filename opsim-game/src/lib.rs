//! Operator Assessment Engine
//!
//! Platform-agnostic core for the operator assessment simulator: a six-gauge
//! control panel that drifts and spikes, the rules deciding which control is
//! required, reaction windows, scoring and the end-of-session assessment.
//! Rendering and durable storage live outside this crate.

pub mod action;
pub mod assessment;
pub mod classification;
pub mod clock;
pub mod config;
pub mod constants;
pub mod gauges;
pub mod numbers;
pub mod personality;
pub mod resolver;
pub mod rng;
pub mod scoring;
pub mod session;
pub mod simulator;
pub mod timers;
pub mod window;
pub mod zones;

use std::rc::Rc;

use chrono::{DateTime, Utc};

// Re-export commonly used types
pub use action::{ActionType, ParseActionError};
pub use assessment::{AssessmentResult, OutcomeCounts, StoredAttempt, assess};
pub use classification::{
    AssessmentStatus, ClassificationTiers, OperatorClassification, PassThresholds, classify,
};
pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use config::{ConfigError, SimulatorConfig, TimingConfig};
pub use gauges::{Gauge, SystemState};
pub use personality::{PersonalityTraits, TraitConfig};
pub use resolver::{RequiredAction, RequirementReason, TemperatureSpikeCounter, resolve};
pub use rng::{RandomSource, RngBundle, SeededSource, SequenceSource, Stream, StreamHandle};
pub use scoring::{ActionRecord, ScoreConfig, ScoreState, ScoredAction, Verdict};
pub use session::{
    ActionOutcome, GamePhase, GameSession, RejectReason, SessionController, SessionError,
    SessionEvent, TickSnapshot,
};
pub use simulator::{DifficultyConfig, DifficultyPhase, advance};
pub use window::{PendingWindow, ReactionWindowTracker, WindowTransition};
pub use zones::{Fault, ZoneReport, ZoneThresholds};

/// Trait for abstracting where finished attempts are kept.
/// Platform-specific implementations should provide this
pub trait AttemptStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load every stored attempt, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be read.
    fn load_attempts(&self) -> Result<Vec<StoredAttempt>, Self::Error>;

    /// Store an attempt ahead of all earlier ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot be written.
    fn save_attempt(&self, attempt: &StoredAttempt) -> Result<(), Self::Error>;

    /// Forget every stored attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be cleared.
    fn clear_attempts(&self) -> Result<(), Self::Error>;
}

/// Builds sessions from one validated configuration and records their results.
pub struct AssessmentEngine<S>
where
    S: AttemptStorage,
{
    config: SimulatorConfig,
    storage: S,
}

impl<S> AssessmentEngine<S>
where
    S: AttemptStorage,
{
    /// Create an engine around the provided storage.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn new(config: SimulatorConfig, storage: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, storage })
    }

    #[must_use]
    pub const fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Construct an idle session with caller-supplied randomness.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn create_session<C, R>(
        &self,
        clock: C,
        rng: R,
    ) -> Result<SessionController<C, R>, ConfigError>
    where
        C: Clock,
        R: RandomSource,
    {
        SessionController::new(clock, rng, self.config.clone())
    }

    /// Construct an idle session whose gauges replay from `seed`. The returned
    /// bundle still offers the operator stream to scripted players.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn create_seeded_session<C: Clock>(
        &self,
        clock: C,
        seed: u64,
    ) -> Result<(SessionController<C, StreamHandle>, Rc<RngBundle>), ConfigError> {
        let bundle = Rc::new(RngBundle::from_user_seed(seed));
        let session = self.create_session(clock, RngBundle::handle(&bundle, Stream::Simulator))?;
        Ok((session, bundle))
    }

    /// Persist a finished result.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage rejects the attempt.
    pub fn record_result<R: RandomSource + ?Sized>(
        &self,
        result: &AssessmentResult,
        recorded_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<StoredAttempt, S::Error> {
        let attempt = StoredAttempt::from_result(result, recorded_at, rng);
        self.storage.save_attempt(&attempt)?;
        Ok(attempt)
    }

    /// Stored attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be read.
    pub fn history(&self) -> Result<Vec<StoredAttempt>, S::Error> {
        self.storage.load_attempts()
    }

    /// Forget every stored attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be cleared.
    pub fn clear_history(&self) -> Result<(), S::Error> {
        self.storage.clear_attempts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::convert::Infallible;

    #[derive(Clone, Default)]
    struct MemoryStorage {
        attempts: Rc<RefCell<Vec<StoredAttempt>>>,
    }

    impl AttemptStorage for MemoryStorage {
        type Error = Infallible;

        fn load_attempts(&self) -> Result<Vec<StoredAttempt>, Self::Error> {
            Ok(self.attempts.borrow().clone())
        }

        fn save_attempt(&self, attempt: &StoredAttempt) -> Result<(), Self::Error> {
            self.attempts.borrow_mut().insert(0, attempt.clone());
            Ok(())
        }

        fn clear_attempts(&self) -> Result<(), Self::Error> {
            self.attempts.borrow_mut().clear();
            Ok(())
        }
    }

    fn engine() -> AssessmentEngine<MemoryStorage> {
        let config = SimulatorConfig {
            timing: TimingConfig {
                session_secs: 30,
                ..TimingConfig::default()
            },
            ..SimulatorConfig::default()
        };
        AssessmentEngine::new(config, MemoryStorage::default()).unwrap()
    }

    #[test]
    fn engine_runs_and_records_attempts_newest_first() {
        let engine = engine();
        let clock = ManualClock::new(0);
        let (mut session, bundle) = engine.create_seeded_session(clock.clone(), 42).unwrap();
        session.start().unwrap();
        clock.set(30_000);
        session.pump();
        let result = session.result().cloned().expect("session ended");
        assert_eq!(result.status, AssessmentStatus::Fail);

        let first = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let second = Utc.with_ymd_and_hms(2026, 1, 3, 3, 4, 5).unwrap();
        let mut operator = RngBundle::handle(&bundle, Stream::Operator);
        engine.record_result(&result, first, &mut operator).unwrap();
        let newest = engine.record_result(&result, second, &mut operator).unwrap();

        let history = engine.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], newest);
        assert_eq!(history[1].final_score, result.final_score);
        engine.clear_history().unwrap();
        assert!(engine.history().unwrap().is_empty());
    }

    #[test]
    fn same_seed_replays_same_session() {
        let engine = engine();
        let run = |seed| {
            let clock = ManualClock::new(0);
            let (mut session, _) = engine.create_seeded_session(clock.clone(), seed).unwrap();
            session.start().unwrap();
            clock.set(30_000);
            session.pump();
            session.session().temperature_history.clone()
        };
        assert_eq!(run(9), run(9));
        assert_ne!(run(9), run(10));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimulatorConfig {
            timing: TimingConfig {
                tick_ms: 0,
                ..TimingConfig::default()
            },
            ..SimulatorConfig::default()
        };
        assert!(AssessmentEngine::new(config, MemoryStorage::default()).is_err());
    }
}
