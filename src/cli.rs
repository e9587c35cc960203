//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_decision_adapter::JsonDecisionAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::config_validation::{
    parse_baselines, parse_optional_date, validate_data_config, validate_simulation_config,
};
use crate::domain::coverage::check_coverage;
use crate::domain::error::BetbenchError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::leaderboard::Leaderboard;
use crate::domain::simulation::{self, SimulationConfig, SimulationResult};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::decision_port::DecisionPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_OUTPUT: &str = "leaderboard.json";

#[derive(Parser, Debug)]
#[command(name = "betbench", about = "Prediction-market model portfolio simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate every model's portfolio and rank the models
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a file or directory of decision records
    Validate {
        #[arg(short, long)]
        decisions: PathBuf,
    },
    /// List markets with price data and their date range
    Markets {
        #[arg(short, long)]
        prices_dir: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Simulate {
            config,
            output,
            dry_run,
        } => run_simulate(&config, output.as_deref(), dry_run),
        Command::Validate { decisions } => run_validate(&decisions),
        Command::Markets { prices_dir } => run_markets(&prices_dir),
    }
}

fn fail(err: &BetbenchError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BetbenchError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn build_simulation_config(adapter: &dyn ConfigPort) -> Result<SimulationConfig, BetbenchError> {
    validate_simulation_config(adapter)?;
    let defaults = SimulationConfig::default();
    Ok(SimulationConfig {
        initial_cash: adapter.get_double("simulation", "initial_cash", defaults.initial_cash),
        execution: ExecutionConfig {
            allowance_per_step: adapter.get_double("simulation", "allowance_per_step", 0.0),
            fee_pct: adapter.get_double("simulation", "fee_pct", 0.0),
        },
        start_date: parse_optional_date(adapter, "start_date")?,
        end_date: parse_optional_date(adapter, "end_date")?,
        baselines: parse_baselines(adapter)?,
        random_seed: adapter.get_int("simulation", "random_seed", defaults.random_seed as i64) as u64,
        invest_fraction: adapter.get_double(
            "simulation",
            "invest_fraction",
            defaults.invest_fraction,
        ),
        max_markets: adapter.get_int("simulation", "max_markets", defaults.max_markets as i64)
            as usize,
    })
}

/// Output path: `--output`, then `[report] output_path`, then the default.
pub fn resolve_output(output: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .or_else(|| {
            config
                .get_string("report", "output_path")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

/// Load, check coverage, simulate and rank.
pub fn run_simulation_pipeline(
    decision_port: &dyn DecisionPort,
    data_port: &dyn MarketDataPort,
    config: &SimulationConfig,
) -> Result<SimulationResult, BetbenchError> {
    let records = decision_port.load_decisions()?;
    eprintln!("Loaded {} decision records", records.len());

    let prepared = simulation::prepare_records(&records, config)?;
    let coverage = check_coverage(&prepared, data_port);
    if !coverage.is_complete() {
        eprintln!(
            "warning: {} market(s) lack price coverage; affected models may be excluded",
            coverage.gaps.len()
        );
    }

    simulation::run_simulation(&prepared, &coverage.series, config)
}

fn run_simulate(config_path: &Path, output: Option<&Path>, dry_run: bool) -> ExitCode {
    // Stage 1: Load and validate config
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_data_config(&adapter) {
        return fail(&e);
    }
    let sim_config = match build_simulation_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let decisions_path = adapter.get_string("data", "decisions_path").unwrap_or_default();
    let prices_dir = adapter.get_string("data", "prices_dir").unwrap_or_default();
    let decision_port = JsonDecisionAdapter::new(PathBuf::from(decisions_path.trim()));
    let data_port = CsvAdapter::new(PathBuf::from(prices_dir.trim()));

    if dry_run {
        return run_dry_run(&decision_port, &data_port, &sim_config);
    }

    // Stage 2: Simulate
    let result = match run_simulation_pipeline(&decision_port, &data_port, &sim_config) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    // Stage 3: Console summary
    print_summary(&result.leaderboard);

    // Stage 4: Write leaderboard
    let output = resolve_output(output, &adapter);
    match JsonReportAdapter.write_leaderboard(&result.leaderboard, &output.to_string_lossy()) {
        Ok(()) => {
            eprintln!("\nLeaderboard written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_dry_run(
    decision_port: &dyn DecisionPort,
    data_port: &dyn MarketDataPort,
    config: &SimulationConfig,
) -> ExitCode {
    eprintln!("Config validated successfully");

    let records = match decision_port.load_decisions() {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    let prepared = match simulation::prepare_records(&records, config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let coverage = check_coverage(&prepared, data_port);

    eprintln!("\nDecisions:");
    eprintln!("  records: {} ({} after selection)", records.len(), prepared.len());
    eprintln!("  markets: {}", coverage.series.len() + coverage.gaps.len());
    eprintln!("  coverage gaps: {}", coverage.gaps.len());
    for gap in &coverage.gaps {
        eprintln!("    {}: {:?}", gap.market_id, gap.reason);
    }
    if !config.baselines.is_empty() {
        let names: Vec<String> = config.baselines.iter().map(|k| k.to_string()).collect();
        eprintln!("  baselines: {}", names.join(", "));
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

pub fn print_summary(leaderboard: &Leaderboard) {
    eprintln!("\n=== Leaderboard ===");
    eprintln!(
        "{:>4}  {:<32} {:>10} {:>10} {:>8}",
        "Rank", "Model", "PnL", "Max DD", "Sharpe"
    );
    for entry in &leaderboard.entries {
        eprintln!(
            "{:>4}  {:<32} {:>9.2}% {:>9.1}% {:>8.2}",
            entry.rank,
            entry.model_pretty_name,
            entry.final_cumulative_pnl * 100.0,
            entry.max_drawdown * 100.0,
            entry.sharpe_ratio,
        );
    }
    if !leaderboard.excluded.is_empty() {
        eprintln!("\n=== Excluded ===");
        for excluded in &leaderboard.excluded {
            eprintln!("  {}: {:?}", excluded.model_id, excluded.reason);
        }
    }
}

fn run_validate(decisions_path: &Path) -> ExitCode {
    eprintln!("Validating decisions: {}", decisions_path.display());
    let records = match JsonDecisionAdapter::new(decisions_path.to_path_buf()).load_decisions() {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    let mut first_error: Option<BetbenchError> = None;
    let mut failures = 0usize;
    for (i, record) in records.iter().enumerate() {
        if let Err(e) = record.validate() {
            failures += 1;
            eprintln!(
                "  record {} ({} on {}): {}",
                i, record.model_id, record.target_date, e
            );
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => {
            eprintln!("\n{} of {} records failed validation", failures, records.len());
            (&e).into()
        }
        None => {
            eprintln!("\nAll {} records are valid.", records.len());
            ExitCode::SUCCESS
        }
    }
}

fn run_markets(prices_dir: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(prices_dir.to_path_buf());
    let markets = match adapter.list_markets() {
        Ok(m) => m,
        Err(e) => return fail(&e),
    };

    if markets.is_empty() {
        eprintln!("No markets found in {}", prices_dir.display());
        return ExitCode::SUCCESS;
    }

    for market in &markets {
        match adapter.get_data_range(market) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} points, {} to {}", market, count, first, last);
            }
            Ok(None) => eprintln!("{}: no data found", market),
            Err(e) => eprintln!("error reading {}: {}", market, e),
        }
    }
    eprintln!("{} markets found", markets.len());
    ExitCode::SUCCESS
}
