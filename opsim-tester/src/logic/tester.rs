use anyhow::Result;
use colored::Colorize;
use opsim_game::{
    AssessmentStatus, AttemptStorage, Millis, OperatorClassification, OutcomeCounts,
    PersonalityTraits,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::game_tester::{GameTester, RunMetrics, SimulationPlan, SimulationSummary};
use crate::logic::policy::OperatorStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub operator: OperatorStrategy,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
    pub mean_score: f64,
    /// Share of runs the assessment itself graded PASS.
    pub pass_rate: f64,
}

/// One finished session, flattened for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub scenario_name: String,
    pub operator: OperatorStrategy,
    pub seed: u64,
    pub final_score: i32,
    pub accuracy_percent: u8,
    pub average_reaction_ms: Millis,
    pub personality: PersonalityTraits,
    pub status: AssessmentStatus,
    pub classification: OperatorClassification,
    pub counts: OutcomeCounts,
    pub metrics: RunMetrics,
    pub fingerprint: u64,
}

impl RunRecord {
    #[must_use]
    pub fn from_summary(scenario_name: &str, summary: &SimulationSummary) -> Self {
        Self {
            scenario_name: scenario_name.to_string(),
            operator: summary.strategy,
            seed: summary.seed,
            final_score: summary.result.final_score,
            accuracy_percent: summary.result.accuracy_percent,
            average_reaction_ms: summary.result.average_reaction_ms,
            personality: summary.result.personality,
            status: summary.result.status,
            classification: summary.result.classification,
            counts: summary.result.counts,
            metrics: summary.metrics,
            fingerprint: summary.fingerprint,
        }
    }
}

pub struct LogicTester<'a, S: AttemptStorage> {
    tester: GameTester<'a, S>,
}

impl<'a, S: AttemptStorage> LogicTester<'a, S> {
    pub const fn new(tester: GameTester<'a, S>) -> Self {
        Self { tester }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> (ScenarioResult, Vec<RunRecord>) {
        if self.tester.verbose() {
            println!(
                "🧪 Testing scenario: {} (operator: {}, seeds: {})",
                scenario.name.bright_white(),
                scenario.plan.strategy,
                seeds.len()
            );
        }

        let mut tally = ScenarioTally::new(scenario, self.tester.verbose());
        for &seed in seeds {
            for i in 0..iterations {
                let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
                let start_time = Instant::now();
                let outcome = self.run_iteration(&scenario.plan, iteration_seed);
                tally.record(i, iteration_seed, start_time.elapsed(), outcome);
            }
        }
        tally.finish()
    }

    fn run_iteration(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let summary = self.tester.run_plan(plan, seed)?;
        if plan.replay_check {
            let replay = self.tester.run_plan(plan, seed)?;
            anyhow::ensure!(
                replay.fingerprint == summary.fingerprint,
                "replay diverged: {:016x} vs {:016x}",
                summary.fingerprint,
                replay.fingerprint
            );
            anyhow::ensure!(replay.result == summary.result, "replay produced a different result");
        }
        Ok(summary)
    }
}

/// Folds finished sessions of one scenario into a [`ScenarioResult`].
/// Shared by the virtual-time runner and the wall-clock mode.
pub struct ScenarioTally<'s> {
    scenario: &'s TestScenario,
    verbose: bool,
    iterations_run: usize,
    successes: usize,
    failures: Vec<String>,
    performance_data: Vec<Duration>,
    records: Vec<RunRecord>,
}

impl<'s> ScenarioTally<'s> {
    #[must_use]
    pub const fn new(scenario: &'s TestScenario, verbose: bool) -> Self {
        Self {
            scenario,
            verbose,
            iterations_run: 0,
            successes: 0,
            failures: Vec::new(),
            performance_data: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        iteration: usize,
        seed: u64,
        duration: Duration,
        outcome: Result<SimulationSummary>,
    ) {
        self.iterations_run += 1;
        let summary = match outcome {
            Ok(summary) => summary,
            Err(err) => {
                self.failures.push(format!("Seed {seed}: {err:#}"));
                return;
            }
        };
        self.records
            .push(RunRecord::from_summary(&self.scenario.name, &summary));
        if let Some(err) = evaluate_expectations(&self.scenario.plan, &summary) {
            if self.verbose {
                println!("  ❌ seed {seed} failed: {}", err.clone().red());
            }
            self.failures.push(describe_failure(iteration, &summary, &err));
        } else {
            self.successes += 1;
            self.performance_data.push(duration);
            if self.verbose {
                println!(
                    "  ✅ seed {seed} passed ({duration:?}) score:{} {}",
                    summary.result.final_score, summary.result.classification
                );
            }
        }
    }

    #[must_use]
    pub fn finish(self) -> (ScenarioResult, Vec<RunRecord>) {
        let result = ScenarioResult {
            scenario_name: self.scenario.name.clone(),
            operator: self.scenario.plan.strategy,
            passed: self.failures.is_empty(),
            iterations_run: self.iterations_run,
            successful_iterations: self.successes,
            failures: self.failures,
            average_duration: average_duration(&self.performance_data),
            performance_data: self.performance_data,
            mean_score: mean_score(&self.records),
            pass_rate: pass_rate(&self.records),
        };
        (result, self.records)
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    for expectation in &plan.expectations {
        if let Err(err) = expectation.evaluate(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn describe_failure(iteration: usize, summary: &SimulationSummary, err: &str) -> String {
    let counts = summary.result.counts;
    format!(
        "Iteration {} (operator {}, seed {}, ended {}ms): {} | score {} accuracy {}% | correct {} incorrect {} missed {} unnecessary {}",
        iteration + 1,
        summary.strategy.label(),
        summary.seed,
        summary.ended_at,
        err,
        summary.result.final_score,
        summary.result.accuracy_percent,
        counts.correct,
        counts.incorrect,
        counts.missed,
        counts.unnecessary
    )
}

fn average_duration(samples: &[Duration]) -> Duration {
    if samples.is_empty() {
        Duration::ZERO
    } else {
        samples.iter().sum::<Duration>() / u32::try_from(samples.len()).unwrap_or(1)
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_score(records: &[RunRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|r| f64::from(r.final_score)).sum::<f64>() / records.len() as f64
}

#[allow(clippy::cast_precision_loss)]
fn pass_rate(records: &[RunRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let passed = records.iter().filter(|r| r.status.is_pass()).count();
    passed as f64 / records.len() as f64
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
