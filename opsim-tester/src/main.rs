mod common;
mod history;
mod logic;
mod realtime;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use opsim_game::{AssessmentEngine, AttemptStorage, SimulatorConfig};
use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use common::scenario::catalog::catalog_scenarios;
use common::scenario::{TestScenario, get_scenario, list_scenarios, operator_scenario};
use common::split_csv;
use history::{JsonFileStorage, NoHistory};
use logic::{
    GameTester, LogicTester, OperatorStrategy, RunRecord, ScenarioResult, ScenarioTally,
    resolve_seed_inputs,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Virtual clock: sessions finish as fast as the CPU allows
    Logic,
    /// Wall clock: sessions take their configured length, Ctrl-C ends early
    Realtime,
}

#[derive(Debug, Parser)]
#[command(name = "opsim-tester", version)]
#[command(about = "Scripted operators against the operator assessment simulator")]
struct Args {
    /// Run mode: logic (virtual time) or realtime (wall clock)
    #[arg(long, value_enum, default_value_t = RunMode::Logic)]
    mode: RunMode,

    /// Scenarios to run (comma-separated, `all` for the whole catalog)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Extra operator strategies to run on their own (comma-separated)
    #[arg(long)]
    operators: Option<String>,

    /// Seeds to run (comma-separated, hex and `a..b` ranges accepted)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per seed (logic mode only)
    #[arg(long, default_value_t = 1)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON file of stored attempts; finished sessions are appended to it
    #[arg(long)]
    history: Option<PathBuf>,

    /// Print the stored attempt history and exit
    #[arg(long)]
    show_history: bool,

    /// Delete the stored attempt history and exit
    #[arg(long)]
    clear_history: bool,

    /// Simulator configuration as JSON; missing sections use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the session length in seconds
    #[arg(long)]
    session_secs: Option<u32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    let config = load_config(&args)?;
    let all_passed = match args.history.clone() {
        Some(path) => {
            let engine = AssessmentEngine::new(config, JsonFileStorage::new(path))
                .context("invalid simulator configuration")?;
            run(&args, &engine).await?
        }
        None => {
            let engine = AssessmentEngine::new(config, NoHistory)
                .context("invalid simulator configuration")?;
            run(&args, &engine).await?
        }
    };

    if !all_passed {
        std::process::exit(1);
    }
    Ok(())
}

/// Returns whether every scenario met its expectations.
async fn run<S: AttemptStorage>(args: &Args, engine: &AssessmentEngine<S>) -> Result<bool> {
    if maybe_manage_history(args, engine)? {
        return Ok(true);
    }

    announce_banner(args.mode);

    let start_time = Instant::now();
    let scenarios = resolve_scenarios(args);
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;

    let (results, records) = match args.mode {
        RunMode::Logic => run_logic_scenarios(args, engine, &scenarios, &seeds),
        RunMode::Realtime => run_realtime_scenarios(args, engine, &scenarios, &seeds).await,
    };

    write_reports(args, &results, &records, start_time)?;
    Ok(results.iter().all(|r| r.passed))
}

fn load_config(args: &Args) -> Result<SimulatorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            SimulatorConfig::from_json(&raw)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => SimulatorConfig::default(),
    };
    if let Some(secs) = args.session_secs {
        config.timing.session_secs = secs;
    }
    log::debug!("simulator config: {config:?}");
    Ok(config)
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn maybe_manage_history<S: AttemptStorage>(
    args: &Args,
    engine: &AssessmentEngine<S>,
) -> Result<bool> {
    if args.clear_history {
        engine.clear_history().context("failed to clear history")?;
        println!("{}", "🧹 Attempt history cleared".green());
        return Ok(true);
    }
    if args.show_history {
        let attempts = engine.history().context("failed to load history")?;
        let mut output_target = OutputTarget::new(args.output.clone())?;
        logic::reports::generate_history_report(&mut output_target, &attempts)?;
        output_target.flush_inner()?;
        return Ok(true);
    }
    Ok(false)
}

fn announce_banner(mode: RunMode) {
    let title = match mode {
        RunMode::Logic => "🎛  Operator Assessment Tester",
        RunMode::Realtime => "🎛  Operator Assessment Tester (real time)",
    };
    println!("{}", title.bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for scenario in catalog_scenarios() {
            if !scenarios.contains(&scenario.key) {
                scenarios.push(scenario.key);
            }
        }
    }
    scenarios
}

fn resolve_scenarios(args: &Args) -> Vec<TestScenario> {
    let mut resolved = Vec::new();
    for key in expand_scenarios(&args.scenarios) {
        match get_scenario(&key) {
            Some(scenario) => resolved.push(scenario),
            None => eprintln!("⚠️  Unknown scenario: {}", key.yellow()),
        }
    }
    for name in args.operators.as_deref().map(split_csv).unwrap_or_default() {
        match name.parse::<OperatorStrategy>() {
            Ok(strategy) => resolved.push(operator_scenario(strategy)),
            Err(err) => eprintln!("⚠️  {}", err.to_string().yellow()),
        }
    }
    resolved
}

fn run_logic_scenarios<S: AttemptStorage>(
    args: &Args,
    engine: &AssessmentEngine<S>,
    scenarios: &[TestScenario],
    seeds: &[u64],
) -> (Vec<ScenarioResult>, Vec<RunRecord>) {
    println!("{}", "🧠 Running Logic Scenarios".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let game_tester = GameTester::new(engine, args.verbose).recording(args.history.is_some());
    let logic_tester = LogicTester::new(game_tester);

    let mut results = Vec::new();
    let mut records = Vec::new();
    for scenario in scenarios {
        let (result, runs) = logic_tester.run_scenario(scenario, seeds, args.iterations);
        results.push(result);
        records.extend(runs);
    }
    (results, records)
}

async fn run_realtime_scenarios<S: AttemptStorage>(
    args: &Args,
    engine: &AssessmentEngine<S>,
    scenarios: &[TestScenario],
    seeds: &[u64],
) -> (Vec<ScenarioResult>, Vec<RunRecord>) {
    println!("{}", "⏱  Running Real-Time Sessions".bright_blue().bold());
    println!("{}", "-".repeat(30).blue());
    if args.iterations > 1 {
        log::warn!("--iterations is ignored in realtime mode");
    }

    let mut results = Vec::new();
    let mut records = Vec::new();
    for scenario in scenarios {
        let mut tally = ScenarioTally::new(scenario, args.verbose);
        for (i, &seed) in seeds.iter().enumerate() {
            let started = Instant::now();
            let outcome = realtime::run_realtime(
                engine,
                scenario.plan.strategy,
                seed,
                args.history.is_some(),
                args.verbose,
            )
            .await;
            if let Ok(summary) = &outcome {
                println!(
                    "  {} seed {seed}: {} score {} ({})",
                    scenario.name.bold(),
                    summary.result.status,
                    summary.result.final_score,
                    summary.result.classification
                );
            }
            tally.record(i, seed, started.elapsed(), outcome);
        }
        let (result, runs) = tally.finish();
        results.push(result);
        records.extend(runs);
    }
    (results, records)
}

fn write_reports(
    args: &Args,
    results: &[ScenarioResult],
    records: &[RunRecord],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, results, records)?,
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Operator Assessment Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        "csv" => logic::reports::generate_csv_report(&mut output_target, records)?,
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    records,
                    duration,
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            mode: RunMode::Logic,
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            operators: None,
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            output: None,
            history: None,
            show_history: false,
            clear_history: false,
            config: None,
            session_secs: Some(30),
            verbose: false,
        }
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("opsim-main-{label}-{}", std::process::id()))
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let scenarios = expand_scenarios("idle-operator,all");
        assert_eq!(scenarios[0], "idle-operator");
        assert!(scenarios.contains(&"smoke".to_string()));
        assert!(scenarios.contains(&"deterministic-replay".to_string()));
        assert_eq!(
            scenarios.iter().filter(|s| *s == "idle-operator").count(),
            1
        );
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        assert_eq!(
            expand_scenarios("smoke, idle-operator"),
            vec!["smoke".to_string(), "idle-operator".to_string()]
        );
    }

    #[test]
    fn resolve_scenarios_adds_operators_and_skips_unknown() {
        let args = Args {
            scenarios: "smoke,bogus".to_string(),
            operators: Some("idle,reckless,erratic".to_string()),
            ..base_args()
        };
        let keys: Vec<_> = resolve_scenarios(&args)
            .into_iter()
            .map(|scenario| scenario.key)
            .collect();
        assert_eq!(keys, vec!["smoke", "operator:idle", "operator:erratic"]);
    }

    #[test]
    fn config_override_sets_session_length() {
        let config = load_config(&base_args()).unwrap();
        assert_eq!(config.timing.session_secs, 30);
    }

    #[test]
    fn config_file_is_parsed_and_validated() {
        let path = temp_path("config.json");
        fs::write(&path, r#"{"timing": {"tick_ms": 0}}"#).unwrap();
        let args = Args {
            config: Some(path.clone()),
            session_secs: None,
            ..base_args()
        };
        assert!(load_config(&args).is_err());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_path("scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = fs::read_to_string(&temp).unwrap();
        assert!(content.contains("Available scenarios:"));
        assert!(content.contains("operator:perfect"));
        fs::remove_file(temp).unwrap();
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn logic_run_writes_json_report() {
        let temp = temp_path("report.json");
        let args = Args {
            scenarios: "idle-operator".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        let engine = AssessmentEngine::new(load_config(&args).unwrap(), NoHistory).unwrap();
        let scenarios = resolve_scenarios(&args);
        let (results, records) = run_logic_scenarios(&args, &engine, &scenarios, &[7]);
        assert!(results[0].passed, "{:?}", results[0].failures);
        write_reports(&args, &results, &records, Instant::now()).unwrap();

        let content = fs::read_to_string(&temp).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["runs"][0]["seed"], 7);
        assert_eq!(value["runs"][0]["status"], "FAIL");
        fs::remove_file(temp).unwrap();
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_path("report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], &[], Instant::now()).unwrap();
        let content = fs::read_to_string(&temp).unwrap();
        assert!(content.contains("_No scenarios executed._"));
        fs::remove_file(temp).unwrap();
    }

    #[test]
    fn history_is_recorded_shown_and_cleared() {
        let path = temp_path("history.json");
        let args = Args {
            scenarios: "idle-operator".to_string(),
            history: Some(path.clone()),
            ..base_args()
        };
        let engine =
            AssessmentEngine::new(load_config(&args).unwrap(), JsonFileStorage::new(&path))
                .unwrap();
        let scenarios = resolve_scenarios(&args);
        run_logic_scenarios(&args, &engine, &scenarios, &[1, 2]);
        assert_eq!(engine.history().unwrap().len(), 2);

        let listing = temp_path("history.txt");
        let show = Args {
            show_history: true,
            output: Some(listing.clone()),
            ..args
        };
        assert!(maybe_manage_history(&show, &engine).unwrap());
        let content = fs::read_to_string(&listing).unwrap();
        assert!(content.contains("FAIL"));
        fs::remove_file(listing).unwrap();

        let clear = Args {
            clear_history: true,
            show_history: false,
            ..show
        };
        assert!(maybe_manage_history(&clear, &engine).unwrap());
        assert!(engine.history().unwrap().is_empty());
    }
}
