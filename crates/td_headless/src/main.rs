//! Headless tower-defense runner.
//!
//! This binary runs matches without a front end, controlled via JSON on
//! stdin/stdout or by scripted strategies.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p td_headless
//!
//! # Interactive session that remembers the bonus unlock
//! cargo run -p td_headless -- run --scenario serpent --store unlocks.json
//!
//! # Auto-play one match and print its metrics
//! cargo run -p td_headless -- auto --scenario standard --strategy sniper_nest
//!
//! # Balance batch
//! cargo run -p td_headless -- batch --scenarios standard,serpent --strategies balanced,darts
//!
//! # Determinism check
//! cargo run -p td_headless -- verify --scenario standard --runs 5
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use td_core::prelude::{MapCatalog, MemoryUnlockStore, UnlockStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use td_headless::{
    batch::{run_batch_with_catalog, verify_determinism, BatchConfig},
    game_runner::{AutoPlayConfig, GameRunner},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
    store::FileUnlockStore,
    strategies::Strategy,
};

#[derive(Parser)]
#[command(name = "td_headless")]
#[command(about = "Headless tower-defense runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// RON map catalog used instead of the built-in maps (run, auto, batch)
    #[arg(long, global = true)]
    maps: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single interactive match
    Run {
        /// Scenario name or RON file
        #[arg(short, long, default_value = "standard")]
        scenario: String,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,

        /// JSON file persisting the bonus unlock
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Play one match with a scripted strategy and print its metrics
    Auto {
        /// Scenario name or RON file
        #[arg(short, long, default_value = "standard")]
        scenario: String,

        /// Strategy name or RON file (defaults to the scenario's)
        #[arg(long)]
        strategy: Option<String>,

        /// Tick budget (defaults to the scenario's)
        #[arg(long)]
        max_ticks: Option<u64>,

        /// JSON file persisting the bonus unlock
        #[arg(long)]
        store: Option<PathBuf>,

        /// Write metrics here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every scenario against every strategy for balance testing
    Batch {
        /// Scenario names or RON files
        #[arg(long, value_delimiter = ',', default_value = "standard")]
        scenarios: Vec<String>,

        /// Strategy names or RON files
        #[arg(long, value_delimiter = ',', default_value = "balanced")]
        strategies: Vec<String>,

        /// Games per scenario/strategy pair
        #[arg(short, long, default_value = "2")]
        repeats: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Tick budget override for every game
        #[arg(long)]
        max_ticks: Option<u64>,
    },

    /// Verify determinism by playing the same match several times
    Verify {
        /// Scenario name or RON file
        #[arg(short, long, default_value = "standard")]
        scenario: String,

        /// Strategy name or RON file
        #[arg(long, default_value = "balanced")]
        strategy: String,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Tick budget per run
        #[arg(long, default_value = "36000")]
        max_ticks: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logging to stderr; stdout is for protocol
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let catalog = match &cli.maps {
        Some(path) => load_catalog(path),
        None => MapCatalog::builtin(),
    };

    match cli.command {
        Some(Commands::Run {
            scenario,
            auto_state,
            store,
        }) => cmd_run(&catalog, &scenario, auto_state, store.as_deref()),
        Some(Commands::Auto {
            scenario,
            strategy,
            max_ticks,
            store,
            output,
        }) => cmd_auto(
            catalog,
            &scenario,
            strategy.as_deref(),
            max_ticks,
            store.as_deref(),
            output.as_deref(),
        ),
        Some(Commands::Batch {
            scenarios,
            strategies,
            repeats,
            parallel,
            output,
            max_ticks,
        }) => {
            let config = BatchConfig {
                scenarios,
                strategies,
                repeats,
                parallel_games: parallel,
                output_dir: output,
                max_ticks,
            };
            cmd_batch(catalog, config);
        }
        Some(Commands::Verify {
            scenario,
            strategy,
            runs,
            max_ticks,
        }) => cmd_verify(&scenario, &strategy, runs, max_ticks),
        None => cmd_run(&catalog, "standard", false, None),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    tracing::error!("{message}");
    eprintln!("FATAL: {message}");
    std::process::exit(1);
}

fn load_catalog(path: &Path) -> MapCatalog {
    let source = std::fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("Cannot read map catalog '{}': {e}", path.display())));
    let catalog = MapCatalog::from_ron_str_labeled(&path.display().to_string(), &source)
        .unwrap_or_else(|e| fail(e));
    tracing::info!(path = %path.display(), maps = catalog.names().count(), "Map catalog loaded");
    catalog
}

fn open_store(path: &Path) -> FileUnlockStore {
    FileUnlockStore::open(path)
        .unwrap_or_else(|e| fail(format!("Cannot open unlock store '{}': {e}", path.display())))
}

/// Run a single interactive match
fn cmd_run(catalog: &MapCatalog, scenario: &str, auto_state: bool, store: Option<&Path>) {
    let scenario = Scenario::resolve(scenario).unwrap_or_else(|e| fail(e));
    tracing::info!(scenario = %scenario.name, "Starting interactive session");
    let config = HeadlessConfig {
        auto_state_output: auto_state,
    };
    let result = match store {
        Some(path) => session(catalog, &scenario, config, open_store(path)),
        None => session(catalog, &scenario, config, MemoryUnlockStore::new()),
    };
    if let Err(e) = result {
        fail(format!("Session failed: {e}"));
    }
}

fn session<S: UnlockStore>(
    catalog: &MapCatalog,
    scenario: &Scenario,
    config: HeadlessConfig,
    store: S,
) -> io::Result<()> {
    let game = scenario
        .build_game(catalog, store)
        .unwrap_or_else(|e| fail(e));
    let mut runner = HeadlessRunner::with_config(game, config);
    runner.run(io::stdin().lock(), io::stdout().lock())
}

/// Auto-play one match
fn cmd_auto(
    catalog: MapCatalog,
    scenario: &str,
    strategy: Option<&str>,
    max_ticks: Option<u64>,
    store: Option<&Path>,
    output: Option<&Path>,
) {
    let scenario = Scenario::resolve(scenario).unwrap_or_else(|e| fail(e));
    let strategy = Strategy::resolve(strategy.unwrap_or(&scenario.strategy))
        .unwrap_or_else(|e| fail(e));
    let game_id = format!("{}-{}", scenario.name, strategy.name);
    let mut config = AutoPlayConfig::new(game_id, scenario, strategy);
    config.max_ticks = max_ticks;

    let runner = GameRunner::new(catalog);
    let metrics = match store {
        Some(path) => runner.run_with_store(&config, open_store(path)),
        None => runner.run(&config),
    }
    .unwrap_or_else(|e| fail(e));

    let json = serde_json::to_string_pretty(&metrics).unwrap_or_else(|e| fail(e));
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, json) {
                fail(format!("Failed to write metrics to '{}': {e}", path.display()));
            }
            tracing::info!(path = %path.display(), "Metrics written");
        }
        None => println!("{json}"),
    }
}

/// Run a balance batch
fn cmd_batch(catalog: MapCatalog, config: BatchConfig) {
    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        scenarios = ?config.scenarios,
        strategies = ?config.strategies,
        repeats = config.repeats,
        parallel = config.parallel_games,
        cpus_available = num_cpus,
        output = %config.output_dir.display(),
        "Batch configuration"
    );

    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        fail(format!(
            "Cannot create output directory '{}': {e}",
            config.output_dir.display()
        ));
    }

    let output = config.output_dir.clone();
    let results = run_batch_with_catalog(config, catalog);

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        fail(format!("Failed to save results: {e}"));
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", summary.total_games);
    if !results.errors.is_empty() {
        eprintln!("Games failed: {}", results.errors.len());
    }
    eprintln!(
        "Victories: {}  Defeats: {}  Timeouts: {}",
        summary.victories, summary.defeats, summary.timeouts
    );
    eprintln!("Average waves: {:.1}", summary.average_waves);
    for (strategy, rate) in &summary.win_rate_by_strategy {
        eprintln!("  {strategy:<16} win rate {:>5.1}%", rate * 100.0);
    }
    if !summary.nondeterministic.is_empty() {
        eprintln!("NONDETERMINISTIC: {}", summary.nondeterministic.join(", "));
    }
    eprintln!("Results: {}", results_path.display());

    if !results.errors.is_empty() || !summary.nondeterministic.is_empty() {
        std::process::exit(1);
    }
}

/// Verify determinism
fn cmd_verify(scenario: &str, strategy: &str, runs: u32, max_ticks: u64) {
    tracing::info!(scenario, strategy, runs, max_ticks, "Verifying determinism");
    if verify_determinism(scenario, strategy, runs, max_ticks) {
        eprintln!("✓ Determinism verified: {runs} runs of {scenario}/{strategy} match");
    } else {
        fail(format!("Determinism check failed for {scenario}/{strategy}"));
    }
}
