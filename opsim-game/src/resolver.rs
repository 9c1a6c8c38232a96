//! Priority rules that pick the single control the panel currently demands.
use serde::{Deserialize, Serialize};

use crate::action::ActionType;
use crate::gauges::SystemState;
use crate::zones::ZoneThresholds;

/// Why a control is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementReason {
    OverheatWithLowOxygen,
    GeneratorLow,
    GeneratorHigh,
    BothStabilizersOut,
    BothStabilizersIn,
    TemperatureSpike,
    ThirdTemperatureSpike,
    BothGasesFaulted,
    OneGasFaulted,
}

impl RequirementReason {
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::OverheatWithLowOxygen => "Temperature and O2 red",
            Self::GeneratorLow => "Generator low",
            Self::GeneratorHigh => "Generator high",
            Self::BothStabilizersOut => "Both stabilizers red",
            Self::BothStabilizersIn => "Both stabilizers green",
            Self::TemperatureSpike => "Temperature spike 1 or 2",
            Self::ThirdTemperatureSpike => "Temperature spike 3",
            Self::BothGasesFaulted => "Both gases red",
            Self::OneGasFaulted => "One gas red",
        }
    }
}

/// The control demanded right now, with the rule that demanded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredAction {
    pub action: ActionType,
    pub reason: RequirementReason,
}

impl RequiredAction {
    const fn new(action: ActionType, reason: RequirementReason) -> Self {
        Self { action, reason }
    }
}

/// Resolve the required control. The first matching rule wins:
/// system reset, generator, stabilizers, temperature, gases.
#[must_use]
pub fn resolve(
    state: &SystemState,
    temperature_spike_count: u8,
    zones: &ZoneThresholds,
) -> Option<RequiredAction> {
    use RequirementReason as Why;

    if zones.reset_required(state) {
        return Some(RequiredAction::new(
            ActionType::SystemReset,
            Why::OverheatWithLowOxygen,
        ));
    }

    if zones.generator_low(state.generator) {
        return Some(RequiredAction::new(ActionType::GeneratorOn, Why::GeneratorLow));
    }
    if zones.generator_high(state.generator) {
        return Some(RequiredAction::new(
            ActionType::GeneratorStabilize,
            Why::GeneratorHigh,
        ));
    }

    if zones.both_stabilizers_out(state) {
        return Some(RequiredAction::new(
            ActionType::StabilizerRecentre,
            Why::BothStabilizersOut,
        ));
    }
    if zones.both_stabilizers_in(state) {
        return Some(RequiredAction::new(
            ActionType::StabilizerReset,
            Why::BothStabilizersIn,
        ));
    }

    if zones.temperature_high(state.temperature) {
        match temperature_spike_count {
            0 | 1 => {
                return Some(RequiredAction::new(
                    ActionType::TempHigh,
                    Why::TemperatureSpike,
                ));
            }
            2 => {
                return Some(RequiredAction::new(
                    ActionType::Temp3rdHigh,
                    Why::ThirdTemperatureSpike,
                ));
            }
            _ => {}
        }
    }

    if zones.both_gases(state) {
        return Some(RequiredAction::new(ActionType::GasAlarm, Why::BothGasesFaulted));
    }
    if zones.exactly_one_gas(state) {
        return Some(RequiredAction::new(ActionType::GasReset, Why::OneGasFaulted));
    }

    None
}

/// Three-step acknowledgment cycle for temperature spikes within one fault episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureSpikeCounter {
    count: u8,
    in_fault: bool,
}

impl TemperatureSpikeCounter {
    pub const MAX: u8 = 2;

    #[must_use]
    pub const fn count(&self) -> u8 {
        self.count
    }

    /// Track the temperature fault edge after a tick. Returns true when a fresh
    /// episode begins, which restarts the cycle.
    pub fn observe(&mut self, temperature_high: bool) -> bool {
        let fresh = temperature_high && !self.in_fault;
        if fresh {
            self.count = 0;
        }
        self.in_fault = temperature_high;
        fresh
    }

    /// Apply a pressed control. Presses count whether or not they were required.
    pub fn acknowledge(&mut self, action: ActionType) {
        match action {
            ActionType::TempHigh if self.count < Self::MAX => self.count += 1,
            ActionType::Temp3rdHigh => self.count = 0,
            _ => {}
        }
    }

    /// Forget the current episode after the panel has been snapped back to safe.
    pub fn clear_episode(&mut self) {
        self.in_fault = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_default(state: &SystemState, count: u8) -> Option<ActionType> {
        resolve(state, count, &ZoneThresholds::default()).map(|r| r.action)
    }

    fn mixed_stabilizers() -> SystemState {
        SystemState {
            stabilizer_top: 10.0,
            ..SystemState::SAFE
        }
    }

    #[test]
    fn reset_beats_generator() {
        let state = SystemState {
            temperature: 90.0,
            o2: 10.0,
            generator: 95.0,
            ..SystemState::SAFE
        };
        let required = resolve(&state, 0, &ZoneThresholds::default());
        assert_eq!(
            required,
            Some(RequiredAction {
                action: ActionType::SystemReset,
                reason: RequirementReason::OverheatWithLowOxygen,
            })
        );
    }

    #[test]
    fn reasons_describe_the_triggering_rule() {
        let state = SystemState {
            generator: 95.0,
            ..SystemState::SAFE
        };
        let required = resolve(&state, 0, &ZoneThresholds::default());
        assert_eq!(
            required.map(|r| r.reason.description()),
            Some("Generator high")
        );
        let spike = SystemState {
            temperature: 90.0,
            ..mixed_stabilizers()
        };
        let required = resolve(&spike, 2, &ZoneThresholds::default());
        assert_eq!(
            required.map(|r| r.reason.description()),
            Some("Temperature spike 3")
        );
    }

    #[test]
    fn generator_beats_stabilizers() {
        let low = SystemState {
            generator: 20.0,
            ..SystemState::SAFE
        };
        assert_eq!(resolve_default(&low, 0), Some(ActionType::GeneratorOn));
        let high = SystemState {
            generator: 85.0,
            ..SystemState::SAFE
        };
        assert_eq!(resolve_default(&high, 0), Some(ActionType::GeneratorStabilize));
    }

    #[test]
    fn stabilizer_band_decides_when_generator_is_fine() {
        assert_eq!(
            resolve_default(&SystemState::SAFE, 0),
            Some(ActionType::StabilizerReset)
        );
        let out = SystemState {
            stabilizer_top: 10.0,
            stabilizer_bottom: 90.0,
            ..SystemState::SAFE
        };
        assert_eq!(resolve_default(&out, 0), Some(ActionType::StabilizerRecentre));
        assert_eq!(resolve_default(&mixed_stabilizers(), 0), None);
    }

    #[test]
    fn temperature_follows_spike_count() {
        let hot = SystemState {
            temperature: 80.0,
            ..mixed_stabilizers()
        };
        assert_eq!(resolve_default(&hot, 0), Some(ActionType::TempHigh));
        assert_eq!(resolve_default(&hot, 1), Some(ActionType::TempHigh));
        assert_eq!(resolve_default(&hot, 2), Some(ActionType::Temp3rdHigh));
    }

    #[test]
    fn gases_come_last() {
        let one = SystemState {
            co2: 90.0,
            ..mixed_stabilizers()
        };
        assert_eq!(resolve_default(&one, 0), Some(ActionType::GasReset));
        let both = SystemState {
            o2: 10.0,
            ..one
        };
        assert_eq!(resolve_default(&both, 0), Some(ActionType::GasAlarm));
    }

    #[test]
    fn counter_cycles_within_an_episode() {
        let mut counter = TemperatureSpikeCounter::default();
        assert!(counter.observe(true));
        counter.acknowledge(ActionType::TempHigh);
        assert_eq!(counter.count(), 1);
        counter.acknowledge(ActionType::TempHigh);
        assert_eq!(counter.count(), 2);
        counter.acknowledge(ActionType::TempHigh);
        assert_eq!(counter.count(), 2);
        counter.acknowledge(ActionType::Temp3rdHigh);
        assert_eq!(counter.count(), 0);
        assert!(!counter.observe(true));
    }

    #[test]
    fn fresh_episode_restarts_cycle() {
        let mut counter = TemperatureSpikeCounter::default();
        counter.observe(true);
        counter.acknowledge(ActionType::TempHigh);
        counter.acknowledge(ActionType::TempHigh);
        assert!(!counter.observe(true));
        assert_eq!(counter.count(), 2);
        counter.observe(false);
        assert_eq!(counter.count(), 2);
        assert!(counter.observe(true));
        assert_eq!(counter.count(), 0);
    }
}
