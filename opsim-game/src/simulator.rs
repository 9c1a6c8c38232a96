//! Stochastic gauge simulation: difficulty-scaled nudges and targeted spikes.
use log::trace;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::constants::{
    LOG_TARGET_SIM, PHASE_1_MULTIPLIER, PHASE_1_SPIKE_PROBABILITY, PHASE_2_MULTIPLIER,
    PHASE_2_SPIKE_PROBABILITY, PHASE_2_START_SECS, PHASE_3_MULTIPLIER, PHASE_3_SPIKE_PROBABILITY,
    PHASE_3_START_SECS, SPIKE_TARGET_ODDS,
};
use crate::gauges::{Gauge, SystemState, clamp_gauge};
use crate::rng::RandomSource;

/// Time-based difficulty band of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyPhase {
    Early,
    Middle,
    Late,
}

impl DifficultyPhase {
    const fn index(self) -> usize {
        match self {
            Self::Early => 0,
            Self::Middle => 1,
            Self::Late => 2,
        }
    }
}

/// Phase boundaries plus the volatility applied inside each phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    #[serde(default = "DifficultyConfig::default_middle_starts_at")]
    pub middle_starts_at_secs: u32,
    #[serde(default = "DifficultyConfig::default_late_starts_at")]
    pub late_starts_at_secs: u32,
    #[serde(default = "DifficultyConfig::default_multipliers")]
    pub multipliers: [f64; 3],
    #[serde(default = "DifficultyConfig::default_spike_probabilities")]
    pub spike_probabilities: [f64; 3],
    /// Odds that a spike heads for the fault-side target rather than the recovery target.
    #[serde(default = "DifficultyConfig::default_spike_target_odds")]
    pub spike_target_odds: f64,
}

impl DifficultyConfig {
    const fn default_middle_starts_at() -> u32 {
        PHASE_2_START_SECS
    }

    const fn default_late_starts_at() -> u32 {
        PHASE_3_START_SECS
    }

    const fn default_multipliers() -> [f64; 3] {
        [PHASE_1_MULTIPLIER, PHASE_2_MULTIPLIER, PHASE_3_MULTIPLIER]
    }

    const fn default_spike_probabilities() -> [f64; 3] {
        [
            PHASE_1_SPIKE_PROBABILITY,
            PHASE_2_SPIKE_PROBABILITY,
            PHASE_3_SPIKE_PROBABILITY,
        ]
    }

    const fn default_spike_target_odds() -> f64 {
        SPIKE_TARGET_ODDS
    }

    #[must_use]
    pub const fn phase_at(&self, elapsed_secs: u32) -> DifficultyPhase {
        if elapsed_secs < self.middle_starts_at_secs {
            DifficultyPhase::Early
        } else if elapsed_secs < self.late_starts_at_secs {
            DifficultyPhase::Middle
        } else {
            DifficultyPhase::Late
        }
    }

    #[must_use]
    pub const fn multiplier(&self, phase: DifficultyPhase) -> f64 {
        self.multipliers[phase.index()]
    }

    #[must_use]
    pub const fn spike_probability(&self, phase: DifficultyPhase) -> f64 {
        self.spike_probabilities[phase.index()]
    }

    /// Validate phase ordering and probability ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when boundaries are out of order, a multiplier is
    /// not positive, or a probability leaves `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.middle_starts_at_secs > self.late_starts_at_secs {
            return Err(ConfigError::PhaseOrder {
                middle: self.middle_starts_at_secs,
                late: self.late_starts_at_secs,
            });
        }
        for (field, value) in [
            ("difficulty.multipliers[0]", self.multipliers[0]),
            ("difficulty.multipliers[1]", self.multipliers[1]),
            ("difficulty.multipliers[2]", self.multipliers[2]),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: f64::MIN_POSITIVE,
                    value,
                });
            }
        }
        for (field, value) in [
            ("difficulty.spike_probabilities[0]", self.spike_probabilities[0]),
            ("difficulty.spike_probabilities[1]", self.spike_probabilities[1]),
            ("difficulty.spike_probabilities[2]", self.spike_probabilities[2]),
            ("difficulty.spike_target_odds", self.spike_target_odds),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            middle_starts_at_secs: Self::default_middle_starts_at(),
            late_starts_at_secs: Self::default_late_starts_at(),
            multipliers: Self::default_multipliers(),
            spike_probabilities: Self::default_spike_probabilities(),
            spike_target_odds: Self::default_spike_target_odds(),
        }
    }
}

/// Targets and size of a spike for one gauge. Size is `fixed + scaled * multiplier`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeProfile {
    pub fault_target: f64,
    pub recovery_target: f64,
    pub fixed: f64,
    pub scaled: f64,
}

impl SpikeProfile {
    #[must_use]
    pub fn amount(&self, multiplier: f64) -> f64 {
        self.fixed + self.scaled * multiplier
    }
}

/// Movement constants for one gauge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeProfile {
    pub nudge_base: f64,
    pub spike: Option<SpikeProfile>,
}

impl GaugeProfile {
    #[must_use]
    pub const fn of(gauge: Gauge) -> Self {
        match gauge {
            Gauge::Generator => Self {
                nudge_base: 5.0,
                spike: Some(SpikeProfile {
                    fault_target: 90.0,
                    recovery_target: 30.0,
                    fixed: 0.0,
                    scaled: 15.0,
                }),
            },
            // 12 at x1.0 growing by 6 per unit of multiplier.
            Gauge::Temperature => Self {
                nudge_base: 4.0,
                spike: Some(SpikeProfile {
                    fault_target: 85.0,
                    recovery_target: 50.0,
                    fixed: 6.0,
                    scaled: 6.0,
                }),
            },
            Gauge::O2 => Self {
                nudge_base: 3.0,
                spike: Some(SpikeProfile {
                    fault_target: 15.0,
                    recovery_target: 60.0,
                    fixed: 0.0,
                    scaled: 10.0,
                }),
            },
            Gauge::Co2 => Self {
                nudge_base: 3.0,
                spike: Some(SpikeProfile {
                    fault_target: 85.0,
                    recovery_target: 40.0,
                    fixed: 0.0,
                    scaled: 10.0,
                }),
            },
            Gauge::StabilizerTop | Gauge::StabilizerBottom => Self {
                nudge_base: 6.0,
                spike: None,
            },
        }
    }
}

/// Random walk of at most `delta` in either direction.
pub fn nudge<R: RandomSource + ?Sized>(value: f64, delta: f64, rng: &mut R) -> f64 {
    clamp_gauge(value + rng.range(-delta, delta))
}

/// Move toward `target` by at most `amount`, never overshooting it.
#[must_use]
pub fn spike_toward(value: f64, target: f64, amount: f64) -> f64 {
    let diff = target - value;
    clamp_gauge(value + diff.signum() * diff.abs().min(amount.max(0.0)))
}

/// Advance every gauge by one tick.
///
/// A single spike roll covers the whole tick. Draw order is the spike roll
/// followed by each gauge in [`Gauge::ALL`] order, so a seed replays exactly.
pub fn advance<R: RandomSource + ?Sized>(
    state: &SystemState,
    elapsed_secs: u32,
    cfg: &DifficultyConfig,
    rng: &mut R,
) -> SystemState {
    let phase = cfg.phase_at(elapsed_secs);
    let multiplier = cfg.multiplier(phase);
    let spiking = rng.chance(cfg.spike_probability(phase));
    let mut next = *state;
    for gauge in Gauge::ALL {
        let profile = GaugeProfile::of(gauge);
        let current = state.get(gauge);
        let value = match profile.spike {
            Some(spike) if spiking => {
                let target = if rng.chance(cfg.spike_target_odds) {
                    spike.fault_target
                } else {
                    spike.recovery_target
                };
                spike_toward(current, target, spike.amount(multiplier))
            }
            _ => nudge(current, profile.nudge_base * multiplier, rng),
        };
        next.set(gauge, value);
    }
    trace!(
        target: LOG_TARGET_SIM,
        "t={elapsed_secs}s phase={phase:?} spike={spiking} -> {next:?}"
    );
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SequenceSource;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn phases_follow_boundaries() {
        let cfg = DifficultyConfig::default();
        assert_eq!(cfg.phase_at(0), DifficultyPhase::Early);
        assert_eq!(cfg.phase_at(159), DifficultyPhase::Early);
        assert_eq!(cfg.phase_at(160), DifficultyPhase::Middle);
        assert_eq!(cfg.phase_at(320), DifficultyPhase::Late);
        assert!(close(cfg.multiplier(DifficultyPhase::Late), 2.0));
        assert!(close(cfg.spike_probability(DifficultyPhase::Middle), 0.15));
    }

    #[test]
    fn spike_moves_toward_fault_targets() {
        // spike roll, then one target roll per spiking gauge, then two stabilizer nudges
        let mut rng = SequenceSource::new([0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.5]);
        let next = advance(&SystemState::SAFE, 10, &DifficultyConfig::default(), &mut rng);
        assert!(close(next.generator, 65.0));
        assert!(close(next.temperature, 57.0));
        assert!(close(next.o2, 45.0));
        assert!(close(next.co2, 50.0));
        assert!(close(next.stabilizer_top, 50.0));
        assert!(close(next.stabilizer_bottom, 50.0));
        assert_eq!(rng.served(), 7);
    }

    #[test]
    fn late_phase_spikes_are_larger() {
        let mut rng = SequenceSource::new([0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.5]);
        let next = advance(&SystemState::SAFE, 400, &DifficultyConfig::default(), &mut rng);
        assert!(close(next.generator, 80.0));
        assert!(close(next.temperature, 63.0));
        assert!(close(next.o2, 35.0));
        assert!(close(next.co2, 60.0));
    }

    #[test]
    fn quiet_tick_nudges_every_gauge() {
        let mut rng = SequenceSource::new([0.99, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let next = advance(&SystemState::SAFE, 0, &DifficultyConfig::default(), &mut rng);
        assert!(close(next.generator, 45.0));
        assert!(close(next.temperature, 41.0));
        assert!(close(next.o2, 52.0));
        assert!(close(next.co2, 37.0));
        assert!(close(next.stabilizer_top, 44.0));
        assert_eq!(rng.served(), 7);
    }

    #[test]
    fn spike_never_overshoots_target() {
        assert!(close(spike_toward(88.0, 90.0, 15.0), 90.0));
        assert!(close(spike_toward(20.0, 15.0, 10.0), 15.0));
        assert!(close(spike_toward(15.0, 15.0, 10.0), 15.0));
    }

    #[test]
    fn only_stabilizers_lack_a_spike_profile() {
        let drifting: Vec<Gauge> = Gauge::ALL
            .into_iter()
            .filter(|gauge| GaugeProfile::of(*gauge).spike.is_none())
            .collect();
        assert_eq!(drifting, vec![Gauge::StabilizerTop, Gauge::StabilizerBottom]);
    }

    #[test]
    fn results_stay_clamped_at_edges() {
        let edge = SystemState {
            generator: 100.0,
            temperature: 0.0,
            o2: 0.0,
            co2: 100.0,
            stabilizer_top: 0.0,
            stabilizer_bottom: 100.0,
        };
        let cfg = DifficultyConfig {
            multipliers: [50.0; 3],
            ..DifficultyConfig::default()
        };
        for draw in [0.0, 0.3, 0.7, 0.999] {
            let mut rng = SequenceSource::constant(draw);
            assert!(advance(&edge, 400, &cfg, &mut rng).is_bounded());
        }
    }

    #[test]
    fn validate_rejects_inverted_phases() {
        let cfg = DifficultyConfig {
            middle_starts_at_secs: 400,
            late_starts_at_secs: 300,
            ..DifficultyConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::PhaseOrder {
                middle: 400,
                late: 300
            })
        );
        let cfg = DifficultyConfig {
            spike_probabilities: [0.1, 1.5, 0.2],
            ..DifficultyConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RangeViolation { field, .. }) if field == "difficulty.spike_probabilities[1]"
        ));
        assert!(DifficultyConfig::default().validate().is_ok());
    }
}
