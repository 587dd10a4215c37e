mod common;
mod logic;
mod maintenance;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::debug;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use common::scenario::{expand_scenarios, get_scenario, list_scenarios};
use common::{load_policy, parse_day_arg, parse_seeds, split_csv};
use logic::{LogicTester, ScenarioResult};
use reelday_game::constants::{DEFAULT_KEY_PREFIX, DEFAULT_RETENTION_DAYS};
use reelday_game::{GamePolicy, PlayerStats, StoreConfig};

pub const DEFAULT_SEED: u64 = 1337;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored human-readable summary
    Console,
    /// Machine-readable JSON
    Json,
    /// Markdown suitable for CI summaries
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "reelday-tester", version)]
#[command(about = "QA scenarios and store maintenance for the Reelday daily game")]
struct Args {
    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console, global = true)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// JSON game policy overriding the default attempt and hint limits
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Storage key prefix for per-day records
    #[arg(long, default_value = DEFAULT_KEY_PREFIX, global = true)]
    prefix: String,

    /// Days of history kept by the retention sweep
    #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS, global = true)]
    retention_days: u32,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run logic QA scenarios over seeds and iterations
    Scenarios(ScenarioArgs),
    /// Normalize a saved record and print the repair report
    Normalize {
        /// JSON file holding one saved game state
        file: PathBuf,
    },
    /// Load one day through the store and print what a player would resume
    Inspect {
        /// Directory-backed store
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, value_parser = parse_day_arg)]
        date: NaiveDate,
    },
    /// Delete records older than the retention window
    Sweep {
        #[arg(long)]
        dir: PathBuf,
        /// Defaults to the local date
        #[arg(long, value_parser = parse_day_arg)]
        today: Option<NaiveDate>,
    },
    /// Aggregate player statistics over every stored day
    Stats {
        #[arg(long)]
        dir: PathBuf,
        /// Defaults to the local date
        #[arg(long, value_parser = parse_day_arg)]
        today: Option<NaiveDate>,
    },
}

#[derive(Debug, clap::Args)]
struct ScenarioArgs {
    /// Scenarios to run (comma-separated, `all` for the whole catalog)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut output_target = OutputTarget::new(args.output.clone())?;
    let passed = run_command(&args, output_target.writer())?;
    output_target.flush_inner()?;

    if !passed {
        std::process::exit(1);
    }

    Ok(())
}

fn store_config(args: &Args) -> StoreConfig {
    StoreConfig {
        key_prefix: args.prefix.clone(),
        retention_days: args.retention_days,
    }
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Dispatch a subcommand; `Ok(false)` means the run completed but failed checks.
fn run_command(args: &Args, out: &mut dyn Write) -> Result<bool> {
    let policy = load_policy(args.policy.as_deref())?;
    debug!("using {policy:?} with key prefix {:?}", args.prefix);
    match &args.command {
        Command::Scenarios(scenario_args) => run_scenarios(args, scenario_args, policy, out),
        Command::Normalize { file } => {
            let report = maintenance::normalize_file(file, policy)?;
            let label = file.display().to_string();
            emit(out, args.report, &report, |out| {
                maintenance::write_normalized(out, &label, &report)
            })?;
            Ok(true)
        }
        Command::Inspect { dir, date } => {
            let store = maintenance::open_store(dir, store_config(args), policy)?;
            let key = store.key_for(*date);
            let report = store.load_report(*date);
            emit(out, args.report, &report, |out| match &report {
                Some(report) => maintenance::write_normalized(out, &key, report),
                None => {
                    writeln!(out, "No record stored under {key}")?;
                    Ok(())
                }
            })?;
            Ok(true)
        }
        Command::Sweep { dir, today } => {
            let store = maintenance::open_store(dir, store_config(args), policy)?;
            let report = store.sweep(today.unwrap_or_else(local_today));
            emit(out, args.report, &report, |out| {
                maintenance::write_sweep(out, &report)
            })?;
            Ok(report.failures == 0)
        }
        Command::Stats { dir, today } => {
            let store = maintenance::open_store(dir, store_config(args), policy)?;
            let today = today.unwrap_or_else(local_today);
            let stats = PlayerStats::from_states(&store.load_all(), today);
            emit(out, args.report, &stats, |out| {
                maintenance::write_stats(out, &stats, today)
            })?;
            Ok(true)
        }
    }
}

/// Render a maintenance result in the requested format.
fn emit<T, F>(out: &mut dyn Write, format: ReportFormat, value: &T, console: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    match format {
        ReportFormat::Console => console(out),
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
            Ok(())
        }
        ReportFormat::Markdown => {
            writeln!(out, "```json")?;
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out, "\n```")?;
            Ok(())
        }
    }
}

fn run_scenarios(
    args: &Args,
    scenario_args: &ScenarioArgs,
    policy: GamePolicy,
    out: &mut dyn Write,
) -> Result<bool> {
    if scenario_args.list_scenarios {
        writeln!(out, "Available scenarios:")?;
        for (key, description) in list_scenarios() {
            writeln!(out, "  {key:25} - {description}")?;
        }
        return Ok(true);
    }

    if args.report == ReportFormat::Console {
        announce_banner(out)?;
    }

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&split_csv(&scenario_args.scenarios));
    let seeds = parse_seeds(&scenario_args.seeds)?;
    let results = run_logic_scenarios(
        &scenarios,
        &seeds,
        scenario_args.iterations,
        policy,
        args.verbose,
    );

    write_reports(out, args.report, &results, start_time)?;
    Ok(results.iter().all(|r| r.passed))
}

fn announce_banner(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{}", "🎬 Reelday Automated Tester".bright_cyan().bold())?;
    writeln!(out, "{}", "================================".cyan())?;
    Ok(())
}

fn run_logic_scenarios(
    scenarios: &[String],
    seeds: &[u64],
    iterations: usize,
    policy: GamePolicy,
    verbose: bool,
) -> Vec<ScenarioResult> {
    let logic_tester = LogicTester::new(policy, verbose);
    let mut results = Vec::new();

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(logic_tester.run_scenario(&scenario, seeds, iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

fn write_reports(
    out: &mut dyn Write,
    format: ReportFormat,
    results: &[ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    match format {
        ReportFormat::Json => logic::reports::generate_json_report(out, results)?,
        ReportFormat::Markdown => {
            if results.is_empty() {
                writeln!(out, "# Reelday Logic Test Results\n\n_No scenarios executed._")?;
            } else {
                logic::reports::generate_markdown_report(out, results)?;
            }
        }
        ReportFormat::Console => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(out, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(out, results, duration)?;
            }
            writeln!(out)?;
            writeln!(out, "🏁 Total time: {duration:?}")?;
        }
    }
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
