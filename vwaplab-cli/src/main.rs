//! VwapLab CLI — replay bar files through a strategy and save the decisions.
//!
//! Commands:
//! - `run` — load a TOML strategy config and one or more CSV bar files,
//!   replay every file in parallel, print a summary per symbol and write
//!   `<output-dir>/<SYMBOL>.json`
//! - `check-config` — parse and validate a config file, then print it back
//!   with every default filled in
//!
//! Logging goes to stderr and is filtered with `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vwaplab_core::data::{load_csv, symbol_from_path};
use vwaplab_core::{replay_many, Bar, InputError, SessionReport, StrategyConfig};

#[derive(Parser)]
#[command(
    name = "vwaplab",
    about = "VwapLab CLI — VWAP retest and EMA crossover signal replay"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay CSV bar files through the strategy in a TOML config file.
    Run {
        /// Path to the strategy config (TOML).
        #[arg(long)]
        config: PathBuf,

        /// CSV bar files. The symbol is the upper-cased file stem.
        #[arg(required = true)]
        data: Vec<PathBuf>,

        /// Output directory for per-symbol report JSON.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Parse and validate a config file, printing the resolved config.
    CheckConfig {
        /// Path to the strategy config (TOML).
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            output_dir,
        } => run_replay_cmd(&config, &data, &output_dir),
        Commands::CheckConfig { config } => run_check_config(&config),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse and validate a config file.
fn load_config(path: &Path) -> Result<StrategyConfig> {
    StrategyConfig::load(path)
        .with_context(|| format!("failed to load config: {}", path.display()))
}

fn run_replay_cmd(config_path: &Path, data: &[PathBuf], output_dir: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::info!(
        strategy = config.strategy.name(),
        files = data.len(),
        "starting replay"
    );

    let mut inputs: Vec<(String, Vec<Bar>)> = Vec::with_capacity(data.len());
    for path in data {
        let symbol = symbol_from_path(path);
        if inputs.iter().any(|(s, _)| *s == symbol) {
            bail!("duplicate symbol {symbol} (from {})", path.display());
        }
        let bars =
            load_csv(path).with_context(|| format!("failed to load bars: {}", path.display()))?;
        inputs.push((symbol, bars));
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let failures = report_results(replay_many(inputs, &config), output_dir);
    if failures > 0 {
        bail!("{failures} of {} symbols failed", data.len());
    }
    Ok(())
}

/// Print and save every successful report. Returns the number of symbols
/// that failed to replay or to save; one failure never stops the rest.
fn report_results(
    results: Vec<(String, Result<SessionReport, InputError>)>,
    output_dir: &Path,
) -> usize {
    let mut failures = 0usize;
    for (symbol, result) in results {
        let saved = result
            .map_err(anyhow::Error::from)
            .and_then(|report| {
                print_summary(&symbol, &report);
                save_report(&symbol, &report, output_dir)
            });
        match saved {
            Ok(path) => println!("Report saved to: {}", path.display()),
            Err(err) => {
                tracing::error!(symbol = %symbol, error = %format!("{err:#}"), "symbol failed");
                eprintln!("Error for {symbol}: {err:#}");
                failures += 1;
            }
        }
    }
    failures
}

fn save_report(symbol: &str, report: &SessionReport, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(format!("{symbol}.json"));
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write report: {}", path.display()))?;
    Ok(path)
}

fn run_check_config(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    println!("# {} (config hash {})", path.display(), config.full_hash().0);
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn print_summary(symbol: &str, report: &SessionReport) {
    let wins = report.trades.iter().filter(|t| t.pnl > 0.0).count();
    let realised: f64 = report.trades.iter().map(|t| t.pnl).sum();

    println!();
    println!("=== Replay Result ===");
    println!("Symbol:         {symbol}");
    println!("Strategy:       {}", report.fingerprint.strategy);
    println!(
        "Bars:           {} ({} warmup)",
        report.fingerprint.bar_count, report.bars_skipped
    );
    println!("Decisions:      {}", report.decisions.len());
    println!("Trades:         {}", report.trades.len());
    if !report.trades.is_empty() {
        println!(
            "Win Rate:       {:.1}%",
            wins as f64 / report.trades.len() as f64 * 100.0
        );
    }
    println!("Realised PnL:   {realised:.2}");
    println!("Final Cash:     {:.2}", report.final_cash);
    println!("Final Equity:   {:.2}", report.final_equity);
    println!("Open Position:  {:?}", report.final_position.side);
}
