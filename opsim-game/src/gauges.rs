//! The six panel gauges and their bounded readings.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    GAUGE_MAX, GAUGE_MIN, SAFE_CO2, SAFE_GENERATOR, SAFE_O2, SAFE_STABILIZER, SAFE_TEMPERATURE,
};

/// Identifies one gauge on the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gauge {
    Generator,
    Temperature,
    O2,
    Co2,
    StabilizerTop,
    StabilizerBottom,
}

impl Gauge {
    /// Every gauge in simulation order. The simulator draws randomness in this order.
    pub const ALL: [Self; 6] = [
        Self::Generator,
        Self::Temperature,
        Self::O2,
        Self::Co2,
        Self::StabilizerTop,
        Self::StabilizerBottom,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Generator => "Generator",
            Self::Temperature => "Temperature",
            Self::O2 => "O2",
            Self::Co2 => "CO2",
            Self::StabilizerTop => "Stabilizer (top)",
            Self::StabilizerBottom => "Stabilizer (bottom)",
        }
    }
}

impl fmt::Display for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Clamp a raw reading onto the gauge scale. NaN collapses to the floor.
#[must_use]
pub fn clamp_gauge(value: f64) -> f64 {
    if value.is_nan() {
        return GAUGE_MIN;
    }
    value.clamp(GAUGE_MIN, GAUGE_MAX)
}

/// Readings for all six gauges, each kept within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub generator: f64,
    pub temperature: f64,
    pub o2: f64,
    pub co2: f64,
    pub stabilizer_top: f64,
    pub stabilizer_bottom: f64,
}

impl SystemState {
    /// All-green readings used at session start and after a system reset.
    pub const SAFE: Self = Self {
        generator: SAFE_GENERATOR,
        temperature: SAFE_TEMPERATURE,
        o2: SAFE_O2,
        co2: SAFE_CO2,
        stabilizer_top: SAFE_STABILIZER,
        stabilizer_bottom: SAFE_STABILIZER,
    };

    #[must_use]
    pub const fn get(&self, gauge: Gauge) -> f64 {
        match gauge {
            Gauge::Generator => self.generator,
            Gauge::Temperature => self.temperature,
            Gauge::O2 => self.o2,
            Gauge::Co2 => self.co2,
            Gauge::StabilizerTop => self.stabilizer_top,
            Gauge::StabilizerBottom => self.stabilizer_bottom,
        }
    }

    /// Write a reading, clamping it onto the gauge scale.
    pub fn set(&mut self, gauge: Gauge, value: f64) {
        let value = clamp_gauge(value);
        match gauge {
            Gauge::Generator => self.generator = value,
            Gauge::Temperature => self.temperature = value,
            Gauge::O2 => self.o2 = value,
            Gauge::Co2 => self.co2 = value,
            Gauge::StabilizerTop => self.stabilizer_top = value,
            Gauge::StabilizerBottom => self.stabilizer_bottom = value,
        }
    }

    /// True when every reading sits inside `[0, 100]`.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        Gauge::ALL
            .iter()
            .all(|gauge| (GAUGE_MIN..=GAUGE_MAX).contains(&self.get(*gauge)))
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::SAFE
    }
}
