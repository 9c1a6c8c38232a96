//! Fault-zone classification for gauge readings.
//!
//! Every predicate is a total function of the [`SystemState`] and the
//! [`ZoneThresholds`] table; nothing here carries state between calls.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::ConfigError;
use crate::constants::{
    CO2_HIGH, GAUGE_MAX, GAUGE_MIN, GENERATOR_HIGH, GENERATOR_LOW, O2_LOW, STABILIZER_HIGH,
    STABILIZER_LOW, TEMPERATURE_HIGH,
};
use crate::gauges::SystemState;

/// Fault limits per gauge. High limits trip strictly above, low limits strictly below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneThresholds {
    #[serde(default = "ZoneThresholds::default_generator_high")]
    pub generator_high: f64,
    #[serde(default = "ZoneThresholds::default_generator_low")]
    pub generator_low: f64,
    #[serde(default = "ZoneThresholds::default_temperature_high")]
    pub temperature_high: f64,
    #[serde(default = "ZoneThresholds::default_o2_low")]
    pub o2_low: f64,
    #[serde(default = "ZoneThresholds::default_co2_high")]
    pub co2_high: f64,
    #[serde(default = "ZoneThresholds::default_stabilizer_low")]
    pub stabilizer_low: f64,
    #[serde(default = "ZoneThresholds::default_stabilizer_high")]
    pub stabilizer_high: f64,
}

impl ZoneThresholds {
    const fn default_generator_high() -> f64 {
        GENERATOR_HIGH
    }

    const fn default_generator_low() -> f64 {
        GENERATOR_LOW
    }

    const fn default_temperature_high() -> f64 {
        TEMPERATURE_HIGH
    }

    const fn default_o2_low() -> f64 {
        O2_LOW
    }

    const fn default_co2_high() -> f64 {
        CO2_HIGH
    }

    const fn default_stabilizer_low() -> f64 {
        STABILIZER_LOW
    }

    const fn default_stabilizer_high() -> f64 {
        STABILIZER_HIGH
    }

    #[must_use]
    pub fn generator_high(&self, value: f64) -> bool {
        value > self.generator_high
    }

    #[must_use]
    pub fn generator_low(&self, value: f64) -> bool {
        value < self.generator_low
    }

    #[must_use]
    pub fn temperature_high(&self, value: f64) -> bool {
        value > self.temperature_high
    }

    #[must_use]
    pub fn o2_low(&self, value: f64) -> bool {
        value < self.o2_low
    }

    #[must_use]
    pub fn co2_high(&self, value: f64) -> bool {
        value > self.co2_high
    }

    #[must_use]
    pub fn stabilizer_out_of_band(&self, value: f64) -> bool {
        value < self.stabilizer_low || value > self.stabilizer_high
    }

    #[must_use]
    pub fn both_stabilizers_out(&self, state: &SystemState) -> bool {
        self.stabilizer_out_of_band(state.stabilizer_top)
            && self.stabilizer_out_of_band(state.stabilizer_bottom)
    }

    #[must_use]
    pub fn both_stabilizers_in(&self, state: &SystemState) -> bool {
        !self.stabilizer_out_of_band(state.stabilizer_top)
            && !self.stabilizer_out_of_band(state.stabilizer_bottom)
    }

    #[must_use]
    pub fn exactly_one_gas(&self, state: &SystemState) -> bool {
        self.o2_low(state.o2) != self.co2_high(state.co2)
    }

    #[must_use]
    pub fn both_gases(&self, state: &SystemState) -> bool {
        self.o2_low(state.o2) && self.co2_high(state.co2)
    }

    /// Overheating while oxygen is starved needs a full system reset.
    #[must_use]
    pub fn reset_required(&self, state: &SystemState) -> bool {
        self.temperature_high(state.temperature) && self.o2_low(state.o2)
    }

    /// Number of simultaneously active fault conditions.
    #[must_use]
    pub fn red_condition_count(&self, state: &SystemState) -> usize {
        ZoneReport::classify(state, self).faults.len()
    }

    /// Two or more faults at once.
    #[must_use]
    pub fn critical_overlap(&self, state: &SystemState) -> bool {
        self.red_condition_count(state) >= 2
    }

    /// Every limit must sit on the gauge scale and each low/high pair must be ordered.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for off-scale limits or inverted bands.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("zones.generator_high", self.generator_high),
            ("zones.generator_low", self.generator_low),
            ("zones.temperature_high", self.temperature_high),
            ("zones.o2_low", self.o2_low),
            ("zones.co2_high", self.co2_high),
            ("zones.stabilizer_low", self.stabilizer_low),
            ("zones.stabilizer_high", self.stabilizer_high),
        ] {
            if !(GAUGE_MIN..=GAUGE_MAX).contains(&value) {
                return Err(ConfigError::RangeViolation {
                    field,
                    min: GAUGE_MIN,
                    max: GAUGE_MAX,
                    value,
                });
            }
        }
        if self.generator_low >= self.generator_high {
            return Err(ConfigError::BandOrder {
                field: "zones.generator",
                low: self.generator_low,
                high: self.generator_high,
            });
        }
        if self.stabilizer_low >= self.stabilizer_high {
            return Err(ConfigError::BandOrder {
                field: "zones.stabilizer",
                low: self.stabilizer_low,
                high: self.stabilizer_high,
            });
        }
        Ok(())
    }
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            generator_high: Self::default_generator_high(),
            generator_low: Self::default_generator_low(),
            temperature_high: Self::default_temperature_high(),
            o2_low: Self::default_o2_low(),
            co2_high: Self::default_co2_high(),
            stabilizer_low: Self::default_stabilizer_low(),
            stabilizer_high: Self::default_stabilizer_high(),
        }
    }
}

/// One active fault condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    GeneratorLow,
    GeneratorHigh,
    TemperatureHigh,
    O2Low,
    Co2High,
    StabilizersOut,
}

/// Maximum fault tags stored inline without additional allocations.
pub type FaultSet = SmallVec<[Fault; 6]>;

/// Snapshot of the faults active for a state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneReport {
    pub faults: FaultSet,
}

impl ZoneReport {
    #[must_use]
    pub fn classify(state: &SystemState, zones: &ZoneThresholds) -> Self {
        let mut faults = FaultSet::new();
        if zones.generator_low(state.generator) {
            faults.push(Fault::GeneratorLow);
        }
        if zones.generator_high(state.generator) {
            faults.push(Fault::GeneratorHigh);
        }
        if zones.temperature_high(state.temperature) {
            faults.push(Fault::TemperatureHigh);
        }
        if zones.o2_low(state.o2) {
            faults.push(Fault::O2Low);
        }
        if zones.co2_high(state.co2) {
            faults.push(Fault::Co2High);
        }
        if zones.both_stabilizers_out(state) {
            faults.push(Fault::StabilizersOut);
        }
        Self { faults }
    }

    #[must_use]
    pub fn is_nominal(&self) -> bool {
        self.faults.is_empty()
    }
}
