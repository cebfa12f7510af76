mod batch;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use liquidity_structure::data::{find_candle_files, load_candles};
use liquidity_structure::structure::{build_anchor, replay, EngineConfig, LevelSourceKind, StructureEngine};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pipeline")]
#[command(about = "Offline market-structure evaluation over candle files")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Variant {
    /// Prior day high / low
    Pd,
    /// Weekly VWAP band
    Vwap,
}

impl From<Variant> for LevelSourceKind {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::Pd => LevelSourceKind::PriorDay,
            Variant::Vwap => LevelSourceKind::WeeklyVwap,
        }
    }
}

#[derive(clap::Args, Debug)]
struct EngineArgs {
    /// Anchor variant
    #[arg(long, value_enum, default_value = "pd")]
    variant: Variant,

    /// Timezone that defines trading days
    #[arg(long, env = "SESSION_TZ", default_value = "UTC")]
    tz: String,

    /// Engine parameters (JSON)
    #[arg(short, long, env = "ENGINE_CONFIG")]
    config: Option<PathBuf>,
}

impl EngineArgs {
    fn resolve(&self) -> Result<(LevelSourceKind, Tz, EngineConfig)> {
        let tz: Tz = self
            .tz
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid timezone: {}", self.tz))?;
        let config = EngineConfig::load(self.config.as_deref())?;
        Ok((self.variant.into(), tz, config))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate the latest session of a candle history and print the report
    Analyze {
        /// Candle file (.json, .json.zst, .csv, .csv.zst)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Feed the latest session candle by candle and print each state change
    Replay {
        /// Candle file (.json, .json.zst, .csv, .csv.zst)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Evaluate every candle file in a directory in parallel
    Batch {
        /// Directory of candle files, one symbol per file
        #[arg(short, long)]
        dir: PathBuf,

        /// Also write the summaries as .json.zst
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Commands::Analyze { input, engine } => run_analyze(input, engine),
        Commands::Replay { input, engine } => run_replay(input, engine),
        Commands::Batch { dir, output, engine } => run_batch(dir, output, engine),
    }
}

fn run_analyze(input: PathBuf, engine: EngineArgs) -> Result<()> {
    let (kind, tz, config) = engine.resolve()?;
    let (session, report, candles) = batch::evaluate_file(&input, kind, tz, &config)?;

    info!("{} session {}: {} candles", kind, session, candles);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_replay(input: PathBuf, engine: EngineArgs) -> Result<()> {
    let (kind, tz, config) = engine.resolve()?;
    let history = load_candles(&input)?;
    let anchored = build_anchor(kind, &history, tz, config.atr_period)
        .with_context(|| format!("Not enough history in {:?} to build {} levels", input, kind))?;

    let engine = StructureEngine::new(anchored.source, config);
    let levels = engine.levels();

    println!("=== {} REPLAY {} ===", kind, anchored.session);
    println!(
        "Levels: upper {:.2}  mid {:.2}  lower {:.2}  trend {}",
        levels.upper,
        levels.mid,
        levels.lower,
        engine.trend()
    );

    let changes = replay(&engine, &anchored.window);
    for change in &changes {
        println!(
            "[{:>4}] t={} close={:.2}  {}",
            change.index, change.time, change.close, change.transition
        );
    }

    let report = engine.evaluate(&anchored.window);
    println!(
        "Final: {}  rev {}% / cont {}% / range {}%  conf {}",
        report.analysis.state,
        report.probabilities.reversal,
        report.probabilities.continuation,
        report.probabilities.range,
        report.confidence
    );
    info!("{} state changes over {} candles", changes.len(), anchored.window.len());
    Ok(())
}

fn run_batch(dir: PathBuf, output: Option<PathBuf>, engine: EngineArgs) -> Result<()> {
    let (kind, tz, config) = engine.resolve()?;
    let files = find_candle_files(&dir)?;
    if files.is_empty() {
        warn!("No candle files in {:?}", dir);
        return Ok(());
    }

    let mut summaries = Vec::new();
    for (path, result) in batch::summarize_parallel(&files, kind, tz, &config) {
        match result {
            Ok(summary) => {
                println!("{}", summary);
                summaries.push(summary);
            }
            Err(e) => warn!("Skipping {:?}: {:#}", path, e),
        }
    }

    info!("Evaluated {}/{} files", summaries.len(), files.len());

    if let Some(output) = output {
        batch::save_summaries(&summaries, &output)?;
        info!("Saved summaries to {:?}", output);
    }
    Ok(())
}
