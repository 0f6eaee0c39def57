//! `rt-migrate-test`: checks that SCHED_FIFO priority order survives CPU
//! migration.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use clap::Parser;
use rt_migrate::cli::{CliError, ExitCode, ProgressBar, errors};
use rt_migrate::config::{
    DEFAULT_BASE_PRIORITY, DEFAULT_ITERATIONS, MigrateConfig, default_task_count, parse_duration,
};
use rt_migrate::harness::Coordinator;
use rt_migrate::report::{JsonSummary, write_report};
use rt_migrate::signal::{SignalKind, StopController};
use rt_migrate::trace_marker::TraceMarker;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "rt-migrate-test",
    version,
    about = "Verify that real-time tasks run in priority order while being migrated between CPUs"
)]
struct Args {
    /// Stop on the first iteration where a higher-priority task lagged
    #[arg(short = 'c', long = "check")]
    check: bool,

    /// Wall-clock limit: seconds, or a number with an s, m, h or d suffix
    #[arg(short = 'D', long = "duration", value_name = "TIME", value_parser = parse_duration)]
    duration: Option<Duration>,

    /// Give all tasks except the lowest and highest the same priority
    #[arg(short = 'e', long = "equal")]
    equal: bool,

    /// Number of iterations
    #[arg(short = 'l', long = "loops", value_name = "N", default_value_t = DEFAULT_ITERATIONS)]
    loops: usize,

    /// Tolerated start-time lag in microseconds
    #[arg(short = 'm', long = "maxerr", value_name = "USEC", default_value_t = 1000)]
    maxerr: u64,

    /// Priority of the lowest task
    #[arg(short = 'p', long = "prio", value_name = "PRIO", default_value_t = DEFAULT_BASE_PRIORITY)]
    prio: i32,

    /// No progress bar and no per-iteration table
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Busy-work per task per iteration, in milliseconds
    #[arg(short = 'r', long = "run-time", value_name = "MS", default_value_t = 20)]
    run_time: u64,

    /// Idle time between iterations, in milliseconds
    #[arg(short = 's', long = "sleep-time", value_name = "MS", default_value_t = 100)]
    sleep_time: u64,

    /// Write a JSON summary to FILE
    #[arg(long = "json", value_name = "FILE")]
    json: Option<PathBuf>,

    /// Number of tasks (default: online CPUs + 1)
    #[arg(value_name = "N")]
    tasks: Option<usize>,
}

impl Args {
    fn to_config(&self) -> MigrateConfig {
        MigrateConfig::new(self.tasks.unwrap_or_else(default_task_count))
            .with_base_priority(self.prio)
            .with_equal_priority(self.equal)
            .with_iterations(self.loops)
            .with_max_error(Duration::from_micros(self.maxerr))
            .with_run_duration(Duration::from_millis(self.run_time))
            .with_idle_duration(Duration::from_millis(self.sleep_time))
            .with_wall_clock_limit(self.duration)
            .with_check(self.check)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            let code = if err.use_stderr() {
                ExitCode::USER_ERROR
            } else {
                ExitCode::SUCCESS
            };
            std::process::exit(code);
        }
    };

    match run(&args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let _ = write!(io::stderr(), "{}", err.human_format());
            std::process::exit(err.exit_code);
        }
    }
}

fn run(args: &Args) -> Result<i32, CliError> {
    let config = args.to_config();
    config
        .validate()
        .map_err(|err| errors::invalid_config(&err.to_string()))?;

    let stop = StopController::new();
    if let Err(err) = stop.listen_for_signals(&SignalKind::DEFAULT_STOP_SIGNALS) {
        tracing::warn!(error = %err, "cannot install signal handlers, Ctrl-C will kill the run");
    }

    let marker = TraceMarker::discover();
    let mut coordinator = Coordinator::new(config, stop).with_trace_marker(marker);
    if !args.quiet {
        coordinator = coordinator.with_progress(ProgressBar::stderr());
    }

    let start_time = SystemTime::now();
    let outcome = coordinator.run().map_err(|err| CliError::from(&err))?;
    let end_time = SystemTime::now();

    let mut stdout = io::stdout().lock();
    write_report(&mut stdout, &outcome, args.quiet)
        .and_then(|()| stdout.flush())
        .map_err(|err| CliError::from(&rt_migrate::Error::from(err)))?;

    let mut code = ExitCode::for_outcome(&outcome);
    if let Some(path) = &args.json {
        let cmdline = std::env::args().collect::<Vec<_>>().join(" ");
        let summary = JsonSummary::new(&outcome, cmdline, start_time, end_time, code);
        code = write_summary(&summary, path, code);
    }

    tracing::debug!(code, meaning = ExitCode::description(code), "exiting");
    Ok(code)
}

/// Writes `summary` to `path` and returns the exit code to use.
///
/// A write failure is reported on stderr. The run's own `code` still wins,
/// so an ordering violation or a stop is never hidden behind it.
fn write_summary(summary: &JsonSummary, path: &Path, code: i32) -> i32 {
    if let Err(err) = summary.write_file(path) {
        let err = errors::report_write_failed(&path.display().to_string(), &err.to_string());
        tracing::warn!(path = %path.display(), error = %err, "JSON summary not written");
        let _ = write!(io::stderr(), "{}", err.human_format());
    }
    code
}
