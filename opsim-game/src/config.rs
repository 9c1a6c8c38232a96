//! Aggregate tuning for a session plus its validation errors.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classification::{ClassificationTiers, PassThresholds};
use crate::clock::Millis;
use crate::constants::{
    BUTTON_DEBOUNCE_MS, REACTION_WINDOW_MS, RESTART_COOLDOWN_SECS, SESSION_SECS,
    SYSTEM_RESET_COOLDOWN_MS, SYSTEM_RESET_TIME_PENALTY_SECS, TEMPERATURE_HISTORY_LEN, TICK_MS,
};
use crate::personality::TraitConfig;
use crate::scoring::ScoreConfig;
use crate::simulator::DifficultyConfig;
use crate::zones::ZoneThresholds;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} must be {expected} (got {value})")]
    SignViolation {
        field: &'static str,
        expected: &'static str,
        value: i32,
    },
    #[error("{field} must be non-zero")]
    ZeroDuration { field: &'static str },
    #[error("{field} band inverted (low {low:.2} >= high {high:.2})")]
    BandOrder {
        field: &'static str,
        low: f64,
        high: f64,
    },
    #[error("difficulty phases out of order (middle starts {middle}s, late starts {late}s)")]
    PhaseOrder { middle: u32, late: u32 },
    #[error(
        "classification tiers out of order: excellent {excellent}, competent {competent}, needs improvement {needs_improvement}"
    )]
    TierOrder {
        excellent: i32,
        competent: i32,
        needs_improvement: i32,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Timers and cooldowns of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_tick_ms")]
    pub tick_ms: Millis,
    #[serde(default = "TimingConfig::default_reaction_window_ms")]
    pub reaction_window_ms: Millis,
    #[serde(default = "TimingConfig::default_session_secs")]
    pub session_secs: u32,
    #[serde(default = "TimingConfig::default_system_reset_cooldown_ms")]
    pub system_reset_cooldown_ms: Millis,
    #[serde(default = "TimingConfig::default_debounce_ms")]
    pub debounce_ms: Millis,
    /// Seconds removed from the session clock by each correct system reset.
    #[serde(default = "TimingConfig::default_system_reset_penalty_secs")]
    pub system_reset_penalty_secs: u32,
    #[serde(default = "TimingConfig::default_restart_cooldown_secs")]
    pub restart_cooldown_secs: u32,
    #[serde(default = "TimingConfig::default_temperature_history_len")]
    pub temperature_history_len: usize,
}

impl TimingConfig {
    const fn default_tick_ms() -> Millis {
        TICK_MS
    }

    const fn default_reaction_window_ms() -> Millis {
        REACTION_WINDOW_MS
    }

    const fn default_session_secs() -> u32 {
        SESSION_SECS
    }

    const fn default_system_reset_cooldown_ms() -> Millis {
        SYSTEM_RESET_COOLDOWN_MS
    }

    const fn default_debounce_ms() -> Millis {
        BUTTON_DEBOUNCE_MS
    }

    const fn default_system_reset_penalty_secs() -> u32 {
        SYSTEM_RESET_TIME_PENALTY_SECS
    }

    const fn default_restart_cooldown_secs() -> u32 {
        RESTART_COOLDOWN_SECS
    }

    const fn default_temperature_history_len() -> usize {
        TEMPERATURE_HISTORY_LEN
    }

    #[must_use]
    pub const fn session_ms(&self) -> Millis {
        self.session_secs as Millis * 1_000
    }

    #[must_use]
    pub const fn system_reset_penalty_ms(&self) -> Millis {
        self.system_reset_penalty_secs as Millis * 1_000
    }

    #[must_use]
    pub const fn restart_cooldown_ms(&self) -> Millis {
        self.restart_cooldown_secs as Millis * 1_000
    }

    /// # Errors
    ///
    /// Returns `ConfigError::ZeroDuration` when a period that drives a timer is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "timing.tick_ms",
            });
        }
        if self.reaction_window_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "timing.reaction_window_ms",
            });
        }
        if self.session_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "timing.session_secs",
            });
        }
        if self.temperature_history_len == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "timing.temperature_history_len",
            });
        }
        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: Self::default_tick_ms(),
            reaction_window_ms: Self::default_reaction_window_ms(),
            session_secs: Self::default_session_secs(),
            system_reset_cooldown_ms: Self::default_system_reset_cooldown_ms(),
            debounce_ms: Self::default_debounce_ms(),
            system_reset_penalty_secs: Self::default_system_reset_penalty_secs(),
            restart_cooldown_secs: Self::default_restart_cooldown_secs(),
            temperature_history_len: Self::default_temperature_history_len(),
        }
    }
}

/// Every tunable of an assessment session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub zones: ZoneThresholds,
    #[serde(default)]
    pub difficulty: DifficultyConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub score: ScoreConfig,
    #[serde(default)]
    pub traits: TraitConfig,
    #[serde(default)]
    pub pass: PassThresholds,
    #[serde(default)]
    pub tiers: ClassificationTiers,
}

impl SimulatorConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zones.validate()?;
        self.difficulty.validate()?;
        self.timing.validate()?;
        self.score.validate()?;
        self.traits.validate()?;
        self.pass.validate()?;
        self.tiers.validate()?;
        Ok(())
    }

    /// Parse a JSON document, defaulting missing fields, and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON, otherwise any validation error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
