use anyhow::Result;
use opsim_game::{AssessmentStatus, OperatorClassification};

use super::{TestScenario, session_completes};
use crate::logic::game_tester::SimulationSummary;
use crate::logic::{OperatorStrategy, SimulationPlan};

pub fn catalog_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::simulation(
            "smoke",
            "Smoke",
            "perfect operator, session ends cleanly with no wrong presses",
            SimulationPlan::new(OperatorStrategy::Perfect)
                .with_expectation(session_completes)
                .with_expectation(no_wrong_presses),
        ),
        TestScenario::simulation(
            "perfect-operator",
            "Perfect Operator",
            "fast and correct: high accuracy, zero impulsivity",
            SimulationPlan::new(OperatorStrategy::Perfect)
                .with_expectation(session_completes)
                .with_expectation(perfect_expectation),
        ),
        TestScenario::simulation(
            "sluggish-operator",
            "Sluggish Operator",
            "late presses earn no speed bonus and low vigilance",
            SimulationPlan::new(OperatorStrategy::Sluggish)
                .with_expectation(session_completes)
                .with_expectation(sluggish_expectation),
        ),
        TestScenario::simulation(
            "impulsive-operator",
            "Impulsive Operator",
            "random jabs between faults are penalised",
            SimulationPlan::new(OperatorStrategy::Impulsive)
                .with_expectation(session_completes)
                .with_expectation(impulsive_expectation),
        ),
        TestScenario::simulation(
            "idle-operator",
            "Idle Operator",
            "no presses at all: only misses, always FAIL",
            SimulationPlan::new(OperatorStrategy::Idle)
                .with_expectation(session_completes)
                .with_expectation(idle_expectation),
        ),
        TestScenario::simulation(
            "erratic-operator",
            "Erratic Operator",
            "wrong controls are scored as incorrect",
            SimulationPlan::new(OperatorStrategy::Erratic)
                .with_expectation(session_completes)
                .with_expectation(erratic_expectation),
        ),
        TestScenario::simulation(
            "deterministic-replay",
            "Deterministic Replay",
            "the same seed replays the same event stream",
            SimulationPlan::new(OperatorStrategy::Erratic)
                .with_replay_check()
                .with_expectation(session_completes),
        ),
    ]
}

fn no_wrong_presses(summary: &SimulationSummary) -> Result<()> {
    let counts = summary.result.counts;
    anyhow::ensure!(counts.incorrect == 0, "{} incorrect presses", counts.incorrect);
    anyhow::ensure!(
        counts.unnecessary == 0,
        "{} unnecessary presses",
        counts.unnecessary
    );
    Ok(())
}

fn perfect_expectation(summary: &SimulationSummary) -> Result<()> {
    no_wrong_presses(summary)?;
    let result = &summary.result;
    anyhow::ensure!(
        result.accuracy_percent >= 70,
        "accuracy {}% below 70%",
        result.accuracy_percent
    );
    anyhow::ensure!(result.personality.impulsivity == 0, "impulsivity should be 0");
    anyhow::ensure!(
        result.personality.vigilance >= 60,
        "vigilance {} below 60",
        result.personality.vigilance
    );
    Ok(())
}

fn sluggish_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.metrics.fast_bonuses == 0,
        "{} fast bonuses for a sluggish operator",
        summary.metrics.fast_bonuses
    );
    anyhow::ensure!(
        summary.result.personality.vigilance <= 30,
        "vigilance {} above 30",
        summary.result.personality.vigilance
    );
    Ok(())
}

fn impulsive_expectation(summary: &SimulationSummary) -> Result<()> {
    let counts = summary.result.counts;
    anyhow::ensure!(
        counts.unnecessary + counts.incorrect > 0,
        "random jabs never cost a point"
    );
    Ok(())
}

fn idle_expectation(summary: &SimulationSummary) -> Result<()> {
    let result = &summary.result;
    anyhow::ensure!(summary.metrics.presses == 0, "idle operator pressed");
    anyhow::ensure!(result.status == AssessmentStatus::Fail, "idle operator passed");
    anyhow::ensure!(result.final_score <= 0, "score {} above 0", result.final_score);
    if result.final_score < 0 {
        anyhow::ensure!(
            result.classification == OperatorClassification::HighRisk,
            "negative score classified {}",
            result.classification
        );
    }
    Ok(())
}

fn erratic_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.result.counts.incorrect > 0,
        "wrong controls were never scored"
    );
    Ok(())
}
