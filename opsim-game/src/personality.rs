//! Behavioral traits derived from a finished session's action history.
use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::config::ConfigError;
use crate::constants::{
    CONSISTENCY_STDDEV_CEILING_MS, IMPULSIVITY_SCALE, TRAIT_NEUTRAL, VIGILANCE_CEILING_MS,
};
use crate::numbers::{round_to_percent, u64_to_f64, usize_to_f64};
use crate::scoring::ScoreState;
use crate::simulator::{DifficultyConfig, DifficultyPhase};

/// Calibration for the trait formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitConfig {
    /// Average reaction at or above this scores zero vigilance.
    #[serde(default = "TraitConfig::default_vigilance_ceiling_ms")]
    pub vigilance_ceiling_ms: Millis,
    /// Reaction-time standard deviation at or above this scores zero consistency.
    #[serde(default = "TraitConfig::default_consistency_ceiling_ms")]
    pub consistency_ceiling_ms: Millis,
    #[serde(default = "TraitConfig::default_impulsivity_scale")]
    pub impulsivity_scale: f64,
}

impl TraitConfig {
    const fn default_vigilance_ceiling_ms() -> Millis {
        VIGILANCE_CEILING_MS
    }

    const fn default_consistency_ceiling_ms() -> Millis {
        CONSISTENCY_STDDEV_CEILING_MS
    }

    const fn default_impulsivity_scale() -> f64 {
        IMPULSIVITY_SCALE
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for zero ceilings or a non-positive impulsivity scale.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vigilance_ceiling_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "traits.vigilance_ceiling_ms",
            });
        }
        if self.consistency_ceiling_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "traits.consistency_ceiling_ms",
            });
        }
        if self.impulsivity_scale.is_nan() || self.impulsivity_scale <= 0.0 {
            return Err(ConfigError::MinViolation {
                field: "traits.impulsivity_scale",
                min: f64::MIN_POSITIVE,
                value: self.impulsivity_scale,
            });
        }
        Ok(())
    }
}

impl Default for TraitConfig {
    fn default() -> Self {
        Self {
            vigilance_ceiling_ms: Self::default_vigilance_ceiling_ms(),
            consistency_ceiling_ms: Self::default_consistency_ceiling_ms(),
            impulsivity_scale: Self::default_impulsivity_scale(),
        }
    }
}

/// Five traits on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityTraits {
    pub vigilance: u8,
    pub compliance: u8,
    pub impulsivity: u8,
    pub stress_tolerance: u8,
    pub consistency: u8,
}

impl PersonalityTraits {
    /// Compute every trait from a finished score. Stress tolerance looks at
    /// presses made in the late phase of `difficulty`.
    #[must_use]
    pub fn compute(score: &ScoreState, cfg: &TraitConfig, difficulty: &DifficultyConfig) -> Self {
        Self {
            vigilance: vigilance(score, cfg),
            compliance: score.accuracy_percent(),
            impulsivity: impulsivity(score, cfg),
            stress_tolerance: stress_tolerance(score, difficulty),
            consistency: consistency(score, cfg),
        }
    }
}

fn vigilance(score: &ScoreState, cfg: &TraitConfig) -> u8 {
    if score.reaction_times().next().is_none() {
        return TRAIT_NEUTRAL;
    }
    let ceiling = u64_to_f64(cfg.vigilance_ceiling_ms);
    let average = u64_to_f64(score.average_reaction_ms()).min(ceiling);
    round_to_percent(100.0 * (1.0 - average / ceiling))
}

fn impulsivity(score: &ScoreState, cfg: &TraitConfig) -> u8 {
    let total = score.total_actions();
    if total == 0 {
        return 0;
    }
    let ratio = f64::from(score.unnecessary) / f64::from(total);
    round_to_percent(100.0 * (cfg.impulsivity_scale * ratio).min(1.0))
}

fn stress_tolerance(score: &ScoreState, difficulty: &DifficultyConfig) -> u8 {
    let (correct, required) = score
        .history
        .iter()
        .filter(|record| record.was_required)
        .filter(|record| difficulty.phase_at(record.elapsed_seconds) == DifficultyPhase::Late)
        .fold((0_usize, 0_usize), |(correct, required), record| {
            (correct + usize::from(record.correct), required + 1)
        });
    if required == 0 {
        return TRAIT_NEUTRAL;
    }
    round_to_percent(100.0 * usize_to_f64(correct) / usize_to_f64(required))
}

fn consistency(score: &ScoreState, cfg: &TraitConfig) -> u8 {
    let samples: Vec<f64> = score.reaction_times().map(u64_to_f64).collect();
    if samples.len() < 2 {
        return TRAIT_NEUTRAL;
    }
    let n = usize_to_f64(samples.len());
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n;
    let spread = variance.sqrt() / u64_to_f64(cfg.consistency_ceiling_ms);
    round_to_percent(100.0 * (1.0 - spread.min(1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;
    use crate::scoring::ActionRecord;

    fn record(reaction: Option<Millis>, correct: bool, required: bool, at: u32) -> ActionRecord {
        ActionRecord {
            action: ActionType::GasReset,
            timestamp: u64::from(at) * 1_000,
            reaction_time_ms: reaction,
            correct,
            was_required: required,
            elapsed_seconds: at,
        }
    }

    fn score_from(history: Vec<ActionRecord>) -> ScoreState {
        let mut score = ScoreState::default();
        for r in &history {
            match (r.was_required, r.correct) {
                (true, true) => score.correct += 1,
                (true, false) => score.incorrect += 1,
                _ => score.unnecessary += 1,
            }
        }
        score.history = history;
        score
    }

    #[test]
    fn empty_history_is_neutral() {
        let traits = PersonalityTraits::compute(
            &ScoreState::default(),
            &TraitConfig::default(),
            &DifficultyConfig::default(),
        );
        assert_eq!(
            traits,
            PersonalityTraits {
                vigilance: 50,
                compliance: 100,
                impulsivity: 0,
                stress_tolerance: 50,
                consistency: 50,
            }
        );
    }

    #[test]
    fn vigilance_scales_with_average_reaction() {
        let cfg = TraitConfig::default();
        let fast = score_from(vec![record(Some(500), true, true, 10)]);
        assert_eq!(vigilance(&fast, &cfg), 80);
        let slow = score_from(vec![record(Some(4_000), true, true, 10)]);
        assert_eq!(vigilance(&slow, &cfg), 0);
    }

    #[test]
    fn impulsivity_doubles_the_unnecessary_ratio() {
        let cfg = TraitConfig::default();
        let score = score_from(vec![
            record(Some(900), true, true, 1),
            record(Some(900), true, true, 2),
            record(Some(900), true, true, 3),
            record(None, false, false, 4),
        ]);
        assert_eq!(impulsivity(&score, &cfg), 50);
        let reckless = score_from(vec![
            record(Some(900), true, true, 1),
            record(None, false, false, 2),
        ]);
        assert_eq!(impulsivity(&reckless, &cfg), 100);
    }

    #[test]
    fn stress_tolerance_uses_late_required_presses() {
        let cfg = DifficultyConfig::default();
        let score = score_from(vec![
            record(Some(900), false, true, 100),
            record(Some(900), true, true, 320),
            record(Some(900), true, true, 400),
            record(Some(900), false, true, 450),
            record(None, false, false, 460),
        ]);
        assert_eq!(stress_tolerance(&score, &cfg), 67);
        let early = score_from(vec![record(Some(900), true, true, 100)]);
        assert_eq!(stress_tolerance(&early, &cfg), 50);
    }

    #[test]
    fn consistency_uses_population_spread() {
        let cfg = TraitConfig::default();
        let steady = score_from(vec![
            record(Some(1_000), true, true, 1),
            record(Some(1_000), true, true, 2),
        ]);
        assert_eq!(consistency(&steady, &cfg), 100);
        // stddev of {250, 1750} is 750
        let erratic = score_from(vec![
            record(Some(250), true, true, 1),
            record(Some(1_750), true, true, 2),
        ]);
        assert_eq!(consistency(&erratic, &cfg), 50);
        let single = score_from(vec![record(Some(250), true, true, 1)]);
        assert_eq!(consistency(&single, &cfg), 50);
    }

    #[test]
    fn stress_window_follows_moved_phase_boundaries() {
        let difficulty = DifficultyConfig {
            middle_starts_at_secs: 60,
            late_starts_at_secs: 120,
            ..DifficultyConfig::default()
        };
        let score = score_from(vec![
            record(Some(800), false, true, 90),
            record(Some(800), true, true, 200),
            record(Some(900), true, true, 205),
            record(Some(700), true, true, 210),
            record(Some(850), true, true, 215),
        ]);
        assert_eq!(stress_tolerance(&score, &difficulty), 100);
        let traits = PersonalityTraits::compute(&score, &TraitConfig::default(), &difficulty);
        assert_eq!(traits.stress_tolerance, 100);
        assert_eq!(stress_tolerance(&score, &DifficultyConfig::default()), 50);
    }
}
