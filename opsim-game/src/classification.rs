//! Pass/fail gate and operator tiering.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;
use crate::constants::{
    HIGH_RISK_IMPULSIVITY, PASS_MAX_IMPULSIVITY, PASS_MIN_ACCURACY, PASS_MIN_SCORE,
    PASS_MIN_VIGILANCE, TIER_COMPETENT_SCORE, TIER_EXCELLENT_SCORE, TIER_NEEDS_IMPROVEMENT_SCORE,
};
use crate::personality::PersonalityTraits;

/// All four must hold for a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassThresholds {
    #[serde(default = "PassThresholds::default_min_accuracy")]
    pub min_accuracy: u32,
    #[serde(default = "PassThresholds::default_min_vigilance")]
    pub min_vigilance: u8,
    #[serde(default = "PassThresholds::default_max_impulsivity")]
    pub max_impulsivity: u8,
    #[serde(default = "PassThresholds::default_min_score")]
    pub min_score: i32,
}

impl PassThresholds {
    const fn default_min_accuracy() -> u32 {
        PASS_MIN_ACCURACY
    }

    const fn default_min_vigilance() -> u8 {
        PASS_MIN_VIGILANCE
    }

    const fn default_max_impulsivity() -> u8 {
        PASS_MAX_IMPULSIVITY
    }

    const fn default_min_score() -> i32 {
        PASS_MIN_SCORE
    }

    #[must_use]
    pub fn passes(&self, final_score: i32, accuracy: u8, traits: &PersonalityTraits) -> bool {
        u32::from(accuracy) >= self.min_accuracy
            && traits.vigilance >= self.min_vigilance
            && traits.impulsivity <= self.max_impulsivity
            && final_score >= self.min_score
    }

    /// # Errors
    ///
    /// Returns `ConfigError::RangeViolation` when a percentage leaves `[0, 100]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("pass.min_accuracy", f64::from(self.min_accuracy)),
            ("pass.min_vigilance", f64::from(self.min_vigilance)),
            ("pass.max_impulsivity", f64::from(self.max_impulsivity)),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 100.0,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for PassThresholds {
    fn default() -> Self {
        Self {
            min_accuracy: Self::default_min_accuracy(),
            min_vigilance: Self::default_min_vigilance(),
            max_impulsivity: Self::default_max_impulsivity(),
            min_score: Self::default_min_score(),
        }
    }
}

/// Score cutoffs for the four labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationTiers {
    #[serde(default = "ClassificationTiers::default_excellent")]
    pub excellent_score: i32,
    #[serde(default = "ClassificationTiers::default_competent")]
    pub competent_score: i32,
    #[serde(default = "ClassificationTiers::default_needs_improvement")]
    pub needs_improvement_score: i32,
    /// A failed run above this impulsivity is high risk regardless of score.
    #[serde(default = "ClassificationTiers::default_high_risk_impulsivity")]
    pub high_risk_impulsivity: u8,
}

impl ClassificationTiers {
    const fn default_excellent() -> i32 {
        TIER_EXCELLENT_SCORE
    }

    const fn default_competent() -> i32 {
        TIER_COMPETENT_SCORE
    }

    const fn default_needs_improvement() -> i32 {
        TIER_NEEDS_IMPROVEMENT_SCORE
    }

    const fn default_high_risk_impulsivity() -> u8 {
        HIGH_RISK_IMPULSIVITY
    }

    /// # Errors
    ///
    /// Returns `ConfigError::TierOrder` unless excellent ≥ competent ≥ needs improvement.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.excellent_score < self.competent_score
            || self.competent_score < self.needs_improvement_score
        {
            return Err(ConfigError::TierOrder {
                excellent: self.excellent_score,
                competent: self.competent_score,
                needs_improvement: self.needs_improvement_score,
            });
        }
        Ok(())
    }
}

impl Default for ClassificationTiers {
    fn default() -> Self {
        Self {
            excellent_score: Self::default_excellent(),
            competent_score: Self::default_competent(),
            needs_improvement_score: Self::default_needs_improvement(),
            high_risk_impulsivity: Self::default_high_risk_impulsivity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssessmentStatus {
    Pass,
    Fail,
}

impl AssessmentStatus {
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorClassification {
    #[serde(rename = "Excellent Operator")]
    Excellent,
    #[serde(rename = "Competent Operator")]
    Competent,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    #[serde(rename = "High Risk Operator")]
    HighRisk,
}

impl OperatorClassification {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent Operator",
            Self::Competent => "Competent Operator",
            Self::NeedsImprovement => "Needs Improvement",
            Self::HighRisk => "High Risk Operator",
        }
    }
}

impl fmt::Display for OperatorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Apply the pass gate and the tier table.
#[must_use]
pub fn classify(
    final_score: i32,
    accuracy: u8,
    traits: &PersonalityTraits,
    pass: &PassThresholds,
    tiers: &ClassificationTiers,
) -> (AssessmentStatus, OperatorClassification) {
    if !pass.passes(final_score, accuracy, traits) {
        let label = if traits.impulsivity > tiers.high_risk_impulsivity || final_score < 0 {
            OperatorClassification::HighRisk
        } else {
            OperatorClassification::NeedsImprovement
        };
        return (AssessmentStatus::Fail, label);
    }

    let label = if final_score >= tiers.excellent_score {
        OperatorClassification::Excellent
    } else if final_score >= tiers.competent_score {
        OperatorClassification::Competent
    } else if final_score >= tiers.needs_improvement_score {
        OperatorClassification::NeedsImprovement
    } else {
        OperatorClassification::HighRisk
    };
    (AssessmentStatus::Pass, label)
}
