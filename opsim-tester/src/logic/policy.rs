use std::fmt;
use std::str::FromStr;

use opsim_game::{ActionType, Millis, PendingWindow, RandomSource, TickSnapshot};
use serde::{Deserialize, Serialize};

/// A press a policy wants to make `delay_ms` after the moment it reacted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedPress {
    pub delay_ms: Millis,
    pub action: ActionType,
}

impl PlannedPress {
    #[must_use]
    pub const fn new(delay_ms: Millis, action: ActionType) -> Self {
        Self { delay_ms, action }
    }
}

/// Policy interface for scripted operators.
///
/// Policies draw from the operator stream only, so the gauges replay the same
/// way whatever the operator does.
pub trait OperatorPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// React to a freshly opened reaction window.
    fn on_window(
        &mut self,
        window: &PendingWindow,
        rng: &mut dyn RandomSource,
    ) -> Option<PlannedPress>;

    /// Chance to press something after a tick. `window_pending` is true while a
    /// reaction window is still open.
    fn on_tick(
        &mut self,
        _snapshot: &TickSnapshot,
        _window_pending: bool,
        _rng: &mut dyn RandomSource,
    ) -> Option<PlannedPress> {
        None
    }
}

/// Built-in operator behaviours for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatorStrategy {
    Perfect,
    Sluggish,
    Impulsive,
    Idle,
    Erratic,
}

impl OperatorStrategy {
    pub const ALL: [Self; 5] = [
        Self::Perfect,
        Self::Sluggish,
        Self::Impulsive,
        Self::Idle,
        Self::Erratic,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Perfect => "Perfect",
            Self::Sluggish => "Sluggish",
            Self::Impulsive => "Impulsive",
            Self::Idle => "Idle",
            Self::Erratic => "Erratic",
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Sluggish => "sluggish",
            Self::Impulsive => "impulsive",
            Self::Idle => "idle",
            Self::Erratic => "erratic",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Perfect => "always presses the required control within 300-700 ms",
            Self::Sluggish => "right control, but 1.8-3.4 s late",
            Self::Impulsive => "quick, and jabs at random controls between faults",
            Self::Idle => "never touches the panel",
            Self::Erratic => "coin-flip between right, wrong and nothing",
        }
    }

    #[must_use]
    pub fn create_policy(self) -> Box<dyn OperatorPolicy> {
        match self {
            Self::Perfect => Box::new(PerfectPolicy),
            Self::Sluggish => Box::new(SluggishPolicy),
            Self::Impulsive => Box::new(ImpulsivePolicy { jab_chance: 0.4 }),
            Self::Idle => Box::new(IdlePolicy),
            Self::Erratic => Box::new(ErraticPolicy),
        }
    }
}

impl fmt::Display for OperatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OperatorStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.key() == wanted)
            .ok_or_else(|| anyhow::anyhow!("unknown operator: {s}"))
    }
}

struct PerfectPolicy;
struct SluggishPolicy;
struct IdlePolicy;
struct ErraticPolicy;

struct ImpulsivePolicy {
    jab_chance: f64,
}

fn delay_between(rng: &mut dyn RandomSource, min_ms: Millis, max_ms: Millis) -> Millis {
    let span = max_ms.saturating_sub(min_ms);
    let offset = rng.uniform() * span as f64;
    min_ms + offset as Millis
}

fn random_control(rng: &mut dyn RandomSource) -> ActionType {
    let controls = ActionType::CONTROLS;
    let idx = (rng.uniform() * controls.len() as f64) as usize;
    controls[idx.min(controls.len() - 1)]
}

fn wrong_control(required: ActionType, rng: &mut dyn RandomSource) -> ActionType {
    let others: Vec<ActionType> = ActionType::CONTROLS
        .into_iter()
        .filter(|action| *action != required)
        .collect();
    let idx = (rng.uniform() * others.len() as f64) as usize;
    others
        .get(idx.min(others.len().saturating_sub(1)))
        .copied()
        .unwrap_or(required)
}

impl OperatorPolicy for PerfectPolicy {
    fn name(&self) -> &'static str {
        "Perfect"
    }

    fn on_window(
        &mut self,
        window: &PendingWindow,
        rng: &mut dyn RandomSource,
    ) -> Option<PlannedPress> {
        Some(PlannedPress::new(delay_between(rng, 300, 700), window.required))
    }
}

impl OperatorPolicy for SluggishPolicy {
    fn name(&self) -> &'static str {
        "Sluggish"
    }

    fn on_window(
        &mut self,
        window: &PendingWindow,
        rng: &mut dyn RandomSource,
    ) -> Option<PlannedPress> {
        Some(PlannedPress::new(
            delay_between(rng, 1_800, 3_400),
            window.required,
        ))
    }
}

impl OperatorPolicy for ImpulsivePolicy {
    fn name(&self) -> &'static str {
        "Impulsive"
    }

    fn on_window(
        &mut self,
        window: &PendingWindow,
        rng: &mut dyn RandomSource,
    ) -> Option<PlannedPress> {
        Some(PlannedPress::new(delay_between(rng, 150, 600), window.required))
    }

    fn on_tick(
        &mut self,
        _snapshot: &TickSnapshot,
        window_pending: bool,
        rng: &mut dyn RandomSource,
    ) -> Option<PlannedPress> {
        if window_pending || !rng.chance(self.jab_chance) {
            return None;
        }
        Some(PlannedPress::new(
            delay_between(rng, 100, 900),
            random_control(rng),
        ))
    }
}

impl OperatorPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn on_window(
        &mut self,
        _window: &PendingWindow,
        _rng: &mut dyn RandomSource,
    ) -> Option<PlannedPress> {
        None
    }
}

impl OperatorPolicy for ErraticPolicy {
    fn name(&self) -> &'static str {
        "Erratic"
    }

    fn on_window(
        &mut self,
        window: &PendingWindow,
        rng: &mut dyn RandomSource,
    ) -> Option<PlannedPress> {
        let roll = rng.uniform();
        let delay = delay_between(rng, 200, 2_500);
        if roll < 0.5 {
            Some(PlannedPress::new(delay, window.required))
        } else if roll < 0.8 {
            Some(PlannedPress::new(delay, wrong_control(window.required, rng)))
        } else {
            None
        }
    }
}
