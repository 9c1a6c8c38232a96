use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use opsim_game::{AssessmentEngine, AttemptStorage, Clock, RngBundle, Stream, SystemClock};
use tokio::time::{Instant, sleep_until};

use crate::logic::{OperatorLoop, OperatorStrategy, SimulationSummary};

/// Drive one session on the wall clock, sleeping until the next timer or
/// scripted press. Ctrl-C ends the session early and still assesses it.
pub async fn run_realtime<S: AttemptStorage>(
    engine: &AssessmentEngine<S>,
    strategy: OperatorStrategy,
    seed: u64,
    record_history: bool,
    verbose: bool,
) -> Result<SimulationSummary> {
    let clock = SystemClock::new();
    let (mut ctl, bundle) = engine
        .create_seeded_session(clock, seed)
        .context("building session")?;
    let mut operator = RngBundle::handle(&bundle, Stream::Operator);
    let mut driver = OperatorLoop::new(strategy, verbose);

    println!(
        "{} real-time session: operator {} seed {} ({}s)",
        "⏱".bright_blue(),
        strategy.label().bold(),
        seed,
        engine.config().timing.session_secs
    );

    ctl.start().context("starting session")?;
    let (ended_at, result) = loop {
        if let Some(done) = driver.absorb(&mut ctl, &mut operator) {
            break done;
        }
        let next = match (driver.queue.next_at(), ctl.next_deadline()) {
            (Some(press_at), Some(timer_at)) => press_at.min(timer_at),
            (Some(at), None) | (None, Some(at)) => at,
            (None, None) => anyhow::bail!("session stalled with nothing armed"),
        };
        let wake = Instant::from_std(clock.instant_at(next));
        tokio::select! {
            () = sleep_until(wake) => {
                ctl.pump();
                driver.press_due(&mut ctl);
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for ctrl-c")?;
                println!("{}", "⏹  interrupted, ending session".yellow());
                ctl.on_session_end().context("ending session")?;
            }
        }
        if verbose {
            println!(
                "  t={}ms score {} remaining {}ms",
                ctl.clock().now_ms(),
                ctl.score().total_score,
                ctl.remaining_ms()
            );
        }
    };

    let attempt = if record_history {
        Some(
            engine
                .record_result(&result, Utc::now(), &mut operator)
                .context("recording attempt")?,
        )
    } else {
        None
    };

    Ok(SimulationSummary {
        seed,
        strategy,
        result,
        metrics: driver.metrics,
        fingerprint: driver.fingerprint(),
        ended_at,
        attempt,
    })
}
