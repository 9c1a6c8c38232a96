use anyhow::Result;
use colored::Colorize;
use opsim_game::StoredAttempt;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::{RunRecord, ScenarioResult};

#[allow(clippy::cast_precision_loss)]
fn success_rate(results: &[ScenarioResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    passed as f64 / results.len() as f64 * 100.0
}

pub fn generate_console_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
    records: &[RunRecord],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Assessment Run Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "=========================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(writer, "Total scenarios: {total_tests}")?;
    writeln!(writer, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(writer, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(writer, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            writer,
            "{} {} [{}]",
            status,
            result.scenario_name.bold(),
            result.operator
        )?;
        writeln!(
            writer,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(
            writer,
            "   Mean score: {:.1}  assessment pass rate: {:.0}%",
            result.mean_score,
            result.pass_rate * 100.0
        )?;
        writeln!(writer, "   Average time: {:?}", result.average_duration)?;
        if !result.failures.is_empty() {
            writeln!(writer, "   Failures:")?;
            for failure in &result.failures {
                writeln!(writer, "     • {}", failure.red())?;
            }
        }
        writeln!(writer)?;
    }

    if !records.is_empty() {
        writeln!(writer, "{}", "🧭 Operator Profiles".bright_yellow().bold())?;
        writeln!(writer, "{}", "====================".yellow())?;
        writeln!(
            writer,
            "{:<24} {:>6} {:>5} {:>7} {:>4} {:>4} {:>4} {:>4} {:>4}  {}",
            "scenario", "seed", "score", "acc%", "vig", "cmp", "imp", "str", "con", "classification"
        )?;
        for record in records {
            let traits = record.personality;
            let status = if record.status.is_pass() {
                record.status.label().green()
            } else {
                record.status.label().red()
            };
            writeln!(
                writer,
                "{:<24} {:>6} {:>5} {:>7} {:>4} {:>4} {:>4} {:>4} {:>4}  {} {}",
                record.scenario_name,
                record.seed,
                record.final_score,
                record.accuracy_percent,
                traits.vigilance,
                traits.compliance,
                traits.impulsivity,
                traits.stress_tolerance,
                traits.consistency,
                status,
                record.classification
            )?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    scenarios: &'a [ScenarioResult],
    runs: &'a [RunRecord],
}

pub fn generate_json_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
    records: &[RunRecord],
) -> Result<()> {
    let report = JsonReport {
        scenarios: results,
        runs: records,
    };
    let json_output = serde_json::to_string_pretty(&report)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(writer, "# Operator Assessment Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();

    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Total scenarios**: {total_tests}")?;
    writeln!(writer, "- **Passed**: {passed_tests}")?;
    writeln!(writer, "- **Failed**: {}", total_tests - passed_tests)?;
    writeln!(writer, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(writer, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(writer, "### {} {}\n", status, result.scenario_name)?;
        writeln!(writer, "- **Operator**: {}", result.operator)?;
        writeln!(
            writer,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "- **Mean score**: {:.1}", result.mean_score)?;
        writeln!(writer, "- **Average time**: {:?}", result.average_duration)?;
        if !result.failures.is_empty() {
            writeln!(writer, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(writer, "  - {failure}")?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn generate_csv_report<W: Write + ?Sized>(writer: &mut W, records: &[RunRecord]) -> Result<()> {
    writeln!(
        writer,
        "scenario,operator,seed,final_score,accuracy,avg_reaction_ms,vigilance,compliance,impulsivity,stress_tolerance,consistency,correct,incorrect,missed,unnecessary,status,classification,fingerprint"
    )?;
    for record in records {
        let traits = record.personality;
        let counts = record.counts;
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{:016x}",
            csv_field(&record.scenario_name),
            record.operator.key(),
            record.seed,
            record.final_score,
            record.accuracy_percent,
            record.average_reaction_ms,
            traits.vigilance,
            traits.compliance,
            traits.impulsivity,
            traits.stress_tolerance,
            traits.consistency,
            counts.correct,
            counts.incorrect,
            counts.missed,
            counts.unnecessary,
            record.status,
            csv_field(record.classification.label()),
            record.fingerprint
        )?;
    }
    Ok(())
}

/// Stored attempts, newest first.
pub fn generate_history_report<W: Write + ?Sized>(
    writer: &mut W,
    attempts: &[StoredAttempt],
) -> Result<()> {
    writeln!(writer, "{}", "🗂  Attempt History".bright_cyan().bold())?;
    if attempts.is_empty() {
        writeln!(writer, "No stored attempts.")?;
        return Ok(());
    }
    for attempt in attempts {
        let status = if attempt.status.is_pass() {
            attempt.status.label().green()
        } else {
            attempt.status.label().red()
        };
        writeln!(
            writer,
            "{}  {}  score {:>5}  accuracy {:>3}%  avg {:>5}ms  {} {}",
            attempt.date,
            attempt.id.dimmed(),
            attempt.final_score,
            attempt.accuracy,
            attempt.average_reaction,
            status,
            attempt.classification
        )?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
