//! ReplayLab CLI — replay an algorithm and inspect upstream metadata.
//!
//! Commands:
//! - `run` — replay a demo algorithm over the symbols of a run request and
//!   write the result tree as JSON
//! - `info` — print the exchange list served by the candle source

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use replaylab_core::data::{MarketData, MarketSource, MemorySource};
use replaylab_core::domain::AssetIdentifier;
use replaylab_runner::demos::{EmaCross, Linked, RollingHigh};
use replaylab_runner::{Algorithm, EngineConfig, EvalOptions, Evaluator, RunRequest};

/// Slots of synthetic history generated before the end of the run.
const SYNTHETIC_SLOTS: i64 = 2_000;

#[derive(Parser)]
#[command(name = "replaylab", about = "ReplayLab CLI — replay algorithms over historical candles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmName {
    EmaCross,
    RollingHigh,
    Linked,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an algorithm and write its result tree.
    Run {
        /// Which demo algorithm to replay.
        #[arg(long, value_enum)]
        algorithm: AlgorithmName,

        /// Run request (JSON, or TOML with a .toml extension).
        #[arg(long)]
        request: PathBuf,

        /// Engine config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Worker threads. Overrides the config.
        #[arg(long)]
        threads: Option<usize>,

        /// Replay seeded synthetic candles instead of querying the services.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Write the result tree here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the exchange list served by the candle source.
    Info {
        /// Engine config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            algorithm,
            request,
            config,
            threads,
            synthetic,
            output,
        } => {
            let args = RunArgs {
                request,
                config,
                threads,
                synthetic,
                output,
            };
            match algorithm {
                AlgorithmName::EmaCross => run_cmd(EmaCross, &args),
                AlgorithmName::RollingHigh => run_cmd(RollingHigh, &args),
                AlgorithmName::Linked => run_cmd(Linked, &args),
            }
        }
        Commands::Info { config } => run_info(config.as_deref()),
    }
}

struct RunArgs {
    request: PathBuf,
    config: Option<PathBuf>,
    threads: Option<usize>,
    synthetic: bool,
    output: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading engine config {}", path.display())),
        None => Ok(EngineConfig::default().with_env()),
    }
}

fn run_cmd<A: Algorithm>(algorithm: A, args: &RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let request = RunRequest::from_file(&args.request)
        .with_context(|| format!("loading run request {}", args.request.display()))?;
    let until = request
        .until
        .unwrap_or_else(|| chrono::Utc::now().timestamp());

    let market = if args.synthetic {
        synthetic_market(&config, &request, until)?
    } else {
        config
            .http_market_data()
            .context("building HTTP market data client")?
    };

    let keys = match &request.keys {
        Some(keys) => keys.clone(),
        None => algorithm.keys().iter().map(|k| k.to_string()).collect(),
    };
    let mut evaluator = Evaluator::new(
        algorithm,
        market,
        EvalOptions {
            symbols: request.symbols.clone(),
            resolution: request.resolution,
            until: Some(until),
        },
    );
    evaluator.set_max_threads(args.threads.unwrap_or_else(|| config.max_threads()));

    let results = evaluator
        .run(&request.scenarios, &keys)
        .with_context(|| format!("replaying {}", evaluator.algorithm().name()))?;

    let metrics = evaluator.metrics();
    info!(
        events = results.event_count(),
        blocks = metrics.completed_blocks,
        elapsed_secs = metrics.elapsed,
        digest = %results.digest(),
        "replay complete"
    );

    let json = serde_json::to_string_pretty(&*results)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("writing results to {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

fn synthetic_market(
    config: &EngineConfig,
    request: &RunRequest,
    until: i64,
) -> Result<Arc<MarketData>> {
    if request.resolution <= 0 {
        bail!("resolution must be positive, got {}", request.resolution);
    }
    let symbols = request
        .symbols
        .iter()
        .map(|s| AssetIdentifier::parse(s))
        .collect::<Result<Vec<_>, _>>()?;
    let start = until - SYNTHETIC_SLOTS * request.resolution;
    let source: Arc<dyn MarketSource> = Arc::new(MemorySource::synthetic(
        &symbols,
        request.resolution,
        start,
        until + request.resolution,
    ));
    Ok(config.market_data_with(source))
}

fn run_info(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let market = config
        .http_market_data()
        .context("building HTTP market data client")?;
    let exchanges = market
        .exchange_info()
        .with_context(|| format!("fetching exchange info from {}", config.sources.candles_url))?;

    for exchange in &exchanges.exchanges {
        println!("{} ({} symbols)", exchange.broker_id, exchange.symbols.len());
        for asset in &exchange.symbols {
            let onboard = chrono::DateTime::from_timestamp(asset.on_board_date, 0)
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| asset.on_board_date.to_string());
            println!("  {:<24} {:<32} since {onboard}", asset.symbol, asset.name);
        }
    }
    Ok(())
}
