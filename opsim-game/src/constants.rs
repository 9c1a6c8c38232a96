//! Centralized tuning constants for the operator assessment engine.
//!
//! These are the defaults behind [`crate::SimulatorConfig`]. Every value can be
//! overridden through configuration; the constants only document the
//! calibrated baseline.

// Logging targets ----------------------------------------------------------
pub(crate) const LOG_TARGET_SESSION: &str = "opsim::session";
pub(crate) const LOG_TARGET_WINDOW: &str = "opsim::window";
pub(crate) const LOG_TARGET_SIM: &str = "opsim::sim";

// Zone thresholds ----------------------------------------------------------
pub(crate) const GENERATOR_HIGH: f64 = 80.0;
pub(crate) const GENERATOR_LOW: f64 = 40.0;
pub(crate) const TEMPERATURE_HIGH: f64 = 75.0;
pub(crate) const O2_LOW: f64 = 25.0;
pub(crate) const CO2_HIGH: f64 = 75.0;
pub(crate) const STABILIZER_LOW: f64 = 30.0;
pub(crate) const STABILIZER_HIGH: f64 = 70.0;

// Gauge bounds and safe defaults -------------------------------------------
pub const GAUGE_MIN: f64 = 0.0;
pub const GAUGE_MAX: f64 = 100.0;
pub(crate) const SAFE_GENERATOR: f64 = 50.0;
pub(crate) const SAFE_TEMPERATURE: f64 = 45.0;
pub(crate) const SAFE_O2: f64 = 55.0;
pub(crate) const SAFE_CO2: f64 = 40.0;
pub(crate) const SAFE_STABILIZER: f64 = 50.0;

// Difficulty phases ----------------------------------------------------------
pub(crate) const PHASE_2_START_SECS: u32 = 160;
pub(crate) const PHASE_3_START_SECS: u32 = 320;
pub(crate) const PHASE_1_MULTIPLIER: f64 = 1.0;
pub(crate) const PHASE_2_MULTIPLIER: f64 = 1.5;
pub(crate) const PHASE_3_MULTIPLIER: f64 = 2.0;
pub(crate) const PHASE_1_SPIKE_PROBABILITY: f64 = 0.10;
pub(crate) const PHASE_2_SPIKE_PROBABILITY: f64 = 0.15;
pub(crate) const PHASE_3_SPIKE_PROBABILITY: f64 = 0.20;
pub(crate) const SPIKE_TARGET_ODDS: f64 = 0.5;

// Timing -------------------------------------------------------------------
pub(crate) const TICK_MS: u64 = 1_500;
pub(crate) const REACTION_WINDOW_MS: u64 = 3_000;
pub(crate) const SESSION_SECS: u32 = 8 * 60;
pub(crate) const SYSTEM_RESET_COOLDOWN_MS: u64 = 10_000;
pub(crate) const BUTTON_DEBOUNCE_MS: u64 = 500;
pub(crate) const SYSTEM_RESET_TIME_PENALTY_SECS: u32 = 10;
pub(crate) const RESTART_COOLDOWN_SECS: u32 = 5;
pub(crate) const TEMPERATURE_HISTORY_LEN: usize = 30;

// Scoring ------------------------------------------------------------------
pub(crate) const SCORE_CORRECT: i32 = 10;
pub(crate) const SCORE_FAST_BONUS: i32 = 5;
pub(crate) const FAST_BONUS_THRESHOLD_MS: u64 = 1_500;
pub(crate) const SCORE_INCORRECT: i32 = -15;
pub(crate) const SCORE_MISSED: i32 = -20;
pub(crate) const SCORE_UNNECESSARY: i32 = -10;

// Traits -------------------------------------------------------------------
pub(crate) const TRAIT_NEUTRAL: u8 = 50;
pub(crate) const VIGILANCE_CEILING_MS: u64 = 2_500;
pub(crate) const CONSISTENCY_STDDEV_CEILING_MS: u64 = 1_500;
pub(crate) const IMPULSIVITY_SCALE: f64 = 2.0;

// Pass gate and classification tiers ----------------------------------------
pub(crate) const PASS_MIN_ACCURACY: u32 = 70;
pub(crate) const PASS_MIN_VIGILANCE: u8 = 60;
pub(crate) const PASS_MAX_IMPULSIVITY: u8 = 40;
pub(crate) const PASS_MIN_SCORE: i32 = 300;
pub(crate) const TIER_EXCELLENT_SCORE: i32 = 500;
pub(crate) const TIER_COMPETENT_SCORE: i32 = 400;
pub(crate) const TIER_NEEDS_IMPROVEMENT_SCORE: i32 = 300;
pub(crate) const HIGH_RISK_IMPULSIVITY: u8 = 60;
