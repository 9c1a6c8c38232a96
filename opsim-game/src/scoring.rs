//! Running score, action history and derived accuracy/reaction statistics.
use serde::{Deserialize, Serialize};

use crate::action::ActionType;
use crate::clock::Millis;
use crate::config::ConfigError;
use crate::constants::{
    FAST_BONUS_THRESHOLD_MS, SCORE_CORRECT, SCORE_FAST_BONUS, SCORE_INCORRECT, SCORE_MISSED,
    SCORE_UNNECESSARY,
};
use crate::numbers::{round_f64_to_millis, round_to_percent, u64_to_f64, usize_to_f64};

/// Score deltas applied per outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreConfig {
    #[serde(default = "ScoreConfig::default_correct")]
    pub correct: i32,
    #[serde(default = "ScoreConfig::default_fast_bonus")]
    pub fast_bonus: i32,
    /// Reactions strictly faster than this earn the bonus.
    #[serde(default = "ScoreConfig::default_fast_bonus_threshold_ms")]
    pub fast_bonus_threshold_ms: Millis,
    #[serde(default = "ScoreConfig::default_incorrect")]
    pub incorrect: i32,
    #[serde(default = "ScoreConfig::default_missed")]
    pub missed: i32,
    #[serde(default = "ScoreConfig::default_unnecessary")]
    pub unnecessary: i32,
}

impl ScoreConfig {
    const fn default_correct() -> i32 {
        SCORE_CORRECT
    }

    const fn default_fast_bonus() -> i32 {
        SCORE_FAST_BONUS
    }

    const fn default_fast_bonus_threshold_ms() -> Millis {
        FAST_BONUS_THRESHOLD_MS
    }

    const fn default_incorrect() -> i32 {
        SCORE_INCORRECT
    }

    const fn default_missed() -> i32 {
        SCORE_MISSED
    }

    const fn default_unnecessary() -> i32 {
        SCORE_UNNECESSARY
    }

    /// Rewards must not be negative and penalties must not be positive.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::SignViolation` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("score.correct", self.correct),
            ("score.fast_bonus", self.fast_bonus),
        ] {
            if value < 0 {
                return Err(ConfigError::SignViolation {
                    field,
                    expected: "non-negative",
                    value,
                });
            }
        }
        for (field, value) in [
            ("score.incorrect", self.incorrect),
            ("score.missed", self.missed),
            ("score.unnecessary", self.unnecessary),
        ] {
            if value > 0 {
                return Err(ConfigError::SignViolation {
                    field,
                    expected: "non-positive",
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            correct: Self::default_correct(),
            fast_bonus: Self::default_fast_bonus(),
            fast_bonus_threshold_ms: Self::default_fast_bonus_threshold_ms(),
            incorrect: Self::default_incorrect(),
            missed: Self::default_missed(),
            unnecessary: Self::default_unnecessary(),
        }
    }
}

/// One scored press. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: ActionType,
    pub timestamp: Millis,
    pub reaction_time_ms: Option<Millis>,
    pub correct: bool,
    pub was_required: bool,
    pub elapsed_seconds: u32,
}

/// The requirement a press is timed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequirement {
    pub action: ActionType,
    pub since: Millis,
}

/// How a press was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
    Unnecessary,
    /// The explicit "do nothing" control; never scored.
    Acknowledged,
}

/// Result of [`ScoreState::record_action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredAction {
    pub verdict: Verdict,
    pub delta: i32,
    pub reaction_time_ms: Option<Millis>,
}

/// Cumulative score for one session.
///
/// `correct + incorrect + unnecessary` always equals `history.len()`; misses
/// carry no record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub total_score: i32,
    pub correct: u32,
    pub incorrect: u32,
    pub missed: u32,
    pub unnecessary: u32,
    pub history: Vec<ActionRecord>,
    pub pending: Option<PendingRequirement>,
}

impl ScoreState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Judge a press against the currently required control.
    pub fn record_action(
        &mut self,
        required: Option<ActionType>,
        action: ActionType,
        now: Millis,
        elapsed_seconds: u32,
        cfg: &ScoreConfig,
    ) -> ScoredAction {
        if action.is_none() {
            return ScoredAction {
                verdict: Verdict::Acknowledged,
                delta: 0,
                reaction_time_ms: None,
            };
        }

        let timed = self.pending.map(|pending| now.saturating_sub(pending.since));
        let (verdict, delta, reaction_time_ms) = match required {
            Some(expected) if expected == action => {
                let fast = timed.is_some_and(|ms| ms < cfg.fast_bonus_threshold_ms);
                let bonus = if fast { cfg.fast_bonus } else { 0 };
                self.correct += 1;
                (Verdict::Correct, cfg.correct + bonus, timed)
            }
            Some(_) => {
                self.incorrect += 1;
                (Verdict::Incorrect, cfg.incorrect, timed)
            }
            None => {
                self.unnecessary += 1;
                (Verdict::Unnecessary, cfg.unnecessary, None)
            }
        };

        self.total_score = self.total_score.saturating_add(delta);
        self.history.push(ActionRecord {
            action,
            timestamp: now,
            reaction_time_ms,
            correct: verdict == Verdict::Correct,
            was_required: required.is_some(),
            elapsed_seconds,
        });
        self.pending = None;

        ScoredAction {
            verdict,
            delta,
            reaction_time_ms,
        }
    }

    /// A window expired without a press.
    pub fn record_missed_action(&mut self, cfg: &ScoreConfig) -> i32 {
        self.total_score = self.total_score.saturating_add(cfg.missed);
        self.missed += 1;
        self.pending = None;
        cfg.missed
    }

    pub fn set_pending_window(&mut self, action: ActionType, at: Millis) {
        self.pending = Some(PendingRequirement { action, since: at });
    }

    /// Presses that produced a record.
    #[must_use]
    pub const fn total_actions(&self) -> u32 {
        self.correct + self.incorrect + self.unnecessary
    }

    /// `correct / (correct + incorrect + missed)` as a rounded percentage,
    /// 100 when nothing was judged.
    #[must_use]
    pub fn accuracy_percent(&self) -> u8 {
        let judged = self.correct + self.incorrect + self.missed;
        if judged == 0 {
            return 100;
        }
        round_to_percent(f64::from(self.correct) / f64::from(judged) * 100.0)
    }

    /// Reaction times of required presses that were timed against a window.
    pub fn reaction_times(&self) -> impl Iterator<Item = Millis> + '_ {
        self.history
            .iter()
            .filter(|record| record.was_required)
            .filter_map(|record| record.reaction_time_ms)
    }

    /// Rounded mean of [`Self::reaction_times`], 0 when there are none.
    #[must_use]
    pub fn average_reaction_ms(&self) -> Millis {
        let (sum, count) = self
            .reaction_times()
            .fold((0_u64, 0_usize), |(sum, count), ms| {
                (sum.saturating_add(ms), count + 1)
            });
        if count == 0 {
            return 0;
        }
        round_f64_to_millis(u64_to_f64(sum) / usize_to_f64(count))
    }
}
