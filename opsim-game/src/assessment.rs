//! End-of-session assessment and the record persisted for history.
use chrono::{DateTime, SecondsFormat, Utc};
use num_traits::cast::cast;
use serde::{Deserialize, Serialize};

use crate::classification::{AssessmentStatus, OperatorClassification, classify};
use crate::clock::Millis;
use crate::config::SimulatorConfig;
use crate::personality::PersonalityTraits;
use crate::rng::RandomSource;
use crate::scoring::ScoreState;

/// Outcome counts carried alongside the result for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub correct: u32,
    pub incorrect: u32,
    pub missed: u32,
    pub unnecessary: u32,
}

impl From<&ScoreState> for OutcomeCounts {
    fn from(score: &ScoreState) -> Self {
        Self {
            correct: score.correct,
            incorrect: score.incorrect,
            missed: score.missed,
            unnecessary: score.unnecessary,
        }
    }
}

/// Terminal artifact of a session, produced once when it ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub final_score: i32,
    pub accuracy_percent: u8,
    pub average_reaction_ms: Millis,
    pub personality: PersonalityTraits,
    pub status: AssessmentStatus,
    pub classification: OperatorClassification,
    #[serde(default)]
    pub counts: OutcomeCounts,
}

impl AssessmentResult {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.status.is_pass()
    }
}

/// Derive traits and classification from a finished score.
#[must_use]
pub fn assess(score: &ScoreState, cfg: &SimulatorConfig) -> AssessmentResult {
    let personality = PersonalityTraits::compute(score, &cfg.traits, &cfg.difficulty);
    let accuracy_percent = score.accuracy_percent();
    let (status, classification) = classify(
        score.total_score,
        accuracy_percent,
        &personality,
        &cfg.pass,
        &cfg.tiers,
    );
    AssessmentResult {
        final_score: score.total_score,
        accuracy_percent,
        average_reaction_ms: score.average_reaction_ms(),
        personality,
        status,
        classification,
        counts: OutcomeCounts::from(score),
    }
}

/// A finished attempt as the history store keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAttempt {
    pub id: String,
    /// RFC 3339, UTC.
    pub date: String,
    pub final_score: i32,
    pub accuracy: u8,
    pub average_reaction: Millis,
    pub personality: PersonalityTraits,
    pub classification: OperatorClassification,
    pub status: AssessmentStatus,
}

impl StoredAttempt {
    pub fn from_result<R: RandomSource + ?Sized>(
        result: &AssessmentResult,
        recorded_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        Self {
            id: attempt_id(recorded_at, rng),
            date: recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            final_score: result.final_score,
            accuracy: result.accuracy_percent,
            average_reaction: result.average_reaction_ms,
            personality: result.personality,
            classification: result.classification,
            status: result.status,
        }
    }
}

const ID_SUFFIX_LEN: u32 = 7;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `attempt-<unix ms>-<7 base36 chars>`.
fn attempt_id<R: RandomSource + ?Sized>(at: DateTime<Utc>, rng: &mut R) -> String {
    let space = 36_u64.pow(ID_SUFFIX_LEN);
    let scaled = rng.uniform() * cast::<u64, f64>(space).unwrap_or(0.0);
    let mut value = cast::<f64, u64>(scaled.floor()).unwrap_or(0) % space;
    let mut suffix = [b'0'; ID_SUFFIX_LEN as usize];
    for slot in suffix.iter_mut().rev() {
        *slot = BASE36[usize::try_from(value % 36).unwrap_or(0)];
        value /= 36;
    }
    format!(
        "attempt-{}-{}",
        at.timestamp_millis(),
        String::from_utf8_lossy(&suffix)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;
    use crate::rng::SequenceSource;
    use chrono::TimeZone;

    fn perfect_score(presses: u32) -> ScoreState {
        let cfg = SimulatorConfig::default();
        let mut score = ScoreState::new();
        for i in 0..presses {
            let at = u64::from(i) * 10_000;
            score.set_pending_window(ActionType::GasReset, at);
            score.record_action(
                Some(ActionType::GasReset),
                ActionType::GasReset,
                at + 600,
                i * 10,
                &cfg.score,
            );
        }
        score
    }

    #[test]
    fn perfect_run_is_excellent() {
        let result = assess(&perfect_score(40), &SimulatorConfig::default());
        assert_eq!(result.final_score, 600);
        assert_eq!(result.accuracy_percent, 100);
        assert_eq!(result.average_reaction_ms, 600);
        assert_eq!(result.personality.vigilance, 76);
        assert!(result.passed());
        assert_eq!(result.classification, OperatorClassification::Excellent);
        assert_eq!(result.counts.correct, 40);
    }

    #[test]
    fn stored_attempt_uses_camel_case_fields() {
        let result = assess(&perfect_score(2), &SimulatorConfig::default());
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let attempt = StoredAttempt::from_result(&result, at, &mut SequenceSource::constant(0.0));
        assert_eq!(attempt.id, format!("attempt-{}-0000000", at.timestamp_millis()));
        assert_eq!(attempt.date, "2026-03-01T12:00:00.000Z");
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["finalScore"], 30);
        assert_eq!(json["averageReaction"], 600);
        assert_eq!(json["status"], "FAIL");
        assert_eq!(json["personality"]["stressTolerance"], 50);
    }

    #[test]
    fn attempt_ids_vary_with_the_draw() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let a = attempt_id(at, &mut SequenceSource::constant(0.25));
        let b = attempt_id(at, &mut SequenceSource::constant(0.75));
        assert_ne!(a, b);
        assert_eq!(a.rsplit('-').next().map(str::len), Some(7));
    }
}
