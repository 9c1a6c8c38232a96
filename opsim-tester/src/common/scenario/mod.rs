pub mod catalog;

use anyhow::Result;
use catalog::catalog_scenarios;

use crate::logic::game_tester::SimulationSummary;
use crate::logic::{OperatorStrategy, SimulationPlan};

/// A named plan the logic tester can run against many seeds.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: String,
    pub name: String,
    pub description: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        plan: SimulationPlan,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            plan,
        }
    }
}

pub fn session_completes(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(summary.metrics.ticks > 0, "session should tick at least once");
    anyhow::ensure!(summary.ended_at > 0, "session should end after it starts");
    Ok(())
}

/// Ad-hoc scenario for `--operators`: runs the strategy with no expectation
/// beyond finishing the session.
#[must_use]
pub fn operator_scenario(strategy: OperatorStrategy) -> TestScenario {
    TestScenario::simulation(
        format!("operator:{}", strategy.key()),
        format!("{} operator", strategy.label()),
        strategy.description(),
        SimulationPlan::new(strategy).with_expectation(session_completes),
    )
}

/// Look a scenario up by key, including the `operator:<name>` form.
#[must_use]
pub fn get_scenario(key: &str) -> Option<TestScenario> {
    if let Some(operator) = key.strip_prefix("operator:") {
        return operator.parse().ok().map(operator_scenario);
    }
    catalog_scenarios()
        .into_iter()
        .find(|scenario| scenario.key == key)
}

#[must_use]
pub fn list_scenarios() -> Vec<(String, String)> {
    catalog_scenarios()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .chain(OperatorStrategy::ALL.into_iter().map(|strategy| {
            (
                format!("operator:{}", strategy.key()),
                strategy.description().to_string(),
            )
        }))
        .collect()
}
