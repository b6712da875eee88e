//! Batch match runner for balance testing.
//!
//! Plays every scenario against every strategy, `repeats` times each, in
//! parallel with rayon. The simulation has no randomness, so repeats of the
//! same pair must end in the same state; [`BatchSummary::nondeterministic`]
//! lists any pair that did not.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use td_core::prelude::MapCatalog;
use tracing::{debug, info, warn};

use crate::game_runner::{AutoPlayConfig, GameRunner};
use crate::metrics::{BatchSummary, GameMetrics};
use crate::scenario::Scenario;
use crate::strategies::Strategy;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario names or RON paths.
    pub scenarios: Vec<String>,
    /// Strategy names or RON paths.
    pub strategies: Vec<String>,
    /// Runs per scenario/strategy pair.
    pub repeats: u32,
    /// Maximum parallel games (0 = use rayon default).
    pub parallel_games: u32,
    /// Output directory for results.
    pub output_dir: PathBuf,
    /// Tick budget override for every game.
    pub max_ticks: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenarios: vec!["standard".to_string()],
            strategies: vec!["balanced".to_string()],
            repeats: 2,
            parallel_games: 0,
            output_dir: PathBuf::from("results"),
            max_ticks: None,
        }
    }
}

impl BatchConfig {
    /// Set output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Total games this batch plays.
    #[must_use]
    pub fn game_count(&self) -> u32 {
        let pairs = self.scenarios.len() * self.strategies.len();
        u32::try_from(pairs)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.repeats)
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual game metrics.
    pub games: Vec<GameMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Games that could not be played.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file.
    ///
    /// # Errors
    /// Fails when the file cannot be written.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file.
    ///
    /// # Errors
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// A game that could not be played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Game identifier.
    pub game_id: String,
    /// Error message.
    pub message: String,
}

/// One scheduled game.
#[derive(Debug, Clone)]
struct Job {
    game_id: String,
    scenario: String,
    strategy: String,
}

fn jobs(config: &BatchConfig) -> Vec<Job> {
    let mut jobs = Vec::new();
    for scenario in &config.scenarios {
        for strategy in &config.strategies {
            for repeat in 0..config.repeats {
                jobs.push(Job {
                    game_id: format!("{scenario}-{strategy}-{repeat}"),
                    scenario: scenario.clone(),
                    strategy: strategy.clone(),
                });
            }
        }
    }
    jobs
}

fn run_job(runner: &GameRunner, job: &Job, max_ticks: Option<u64>) -> Result<GameMetrics, String> {
    let scenario = Scenario::resolve(&job.scenario).map_err(|e| e.to_string())?;
    let strategy = Strategy::resolve(&job.strategy).map_err(|e| e.to_string())?;
    let mut config = AutoPlayConfig::new(job.game_id.clone(), scenario, strategy);
    config.max_ticks = max_ticks;
    runner.run(&config).map_err(|e| e.to_string())
}

/// Run a batch of games.
#[must_use]
pub fn run_batch(config: BatchConfig) -> BatchResults {
    run_batch_with_catalog(config, MapCatalog::builtin())
}

/// Run a batch of games with maps from `catalog`.
#[must_use]
pub fn run_batch_with_catalog(config: BatchConfig, catalog: MapCatalog) -> BatchResults {
    let start = Instant::now();
    let total = config.game_count();
    let completed = AtomicU32::new(0);
    let runner = GameRunner::new(catalog);
    let jobs = jobs(&config);

    info!(
        games = total,
        scenarios = config.scenarios.len(),
        strategies = config.strategies.len(),
        "Starting batch run"
    );

    let play_all = || -> Vec<Result<GameMetrics, BatchError>> {
        jobs.par_iter()
            .map(|job| {
                let result = run_job(&runner, job, config.max_ticks);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(done, total, game_id = %job.game_id, "Game finished");
                result.map_err(|message| {
                    warn!(game_id = %job.game_id, error = %message, "Game failed");
                    BatchError {
                        game_id: job.game_id.clone(),
                        message,
                    }
                })
            })
            .collect()
    };

    let pool = (config.parallel_games > 0)
        .then(|| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.parallel_games as usize)
                .build()
        })
        .transpose();
    let results = match pool {
        Ok(Some(pool)) => pool.install(play_all),
        Ok(None) => play_all(),
        Err(e) => {
            warn!(error = %e, "Could not build thread pool, using the global one");
            play_all()
        }
    };

    let mut games = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(metrics) => games.push(metrics),
            Err(error) => errors.push(error),
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    if !summary.nondeterministic.is_empty() {
        warn!(pairs = ?summary.nondeterministic, "Repeated runs diverged");
    }
    info!(
        games = games.len(),
        errors = errors.len(),
        win_rate = summary.win_rate,
        duration_seconds,
        "Batch complete"
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Play the same scenario and strategy `runs` times and check that every
/// run ends in the same state.
#[must_use]
pub fn verify_determinism(scenario: &str, strategy: &str, runs: u32, max_ticks: u64) -> bool {
    let runner = GameRunner::default();
    let job = Job {
        game_id: "determinism".to_string(),
        scenario: scenario.to_string(),
        strategy: strategy.to_string(),
    };
    let mut hashes = Vec::new();
    for run in 0..runs {
        match run_job(&runner, &job, Some(max_ticks)) {
            Ok(metrics) => {
                debug!(run, hash = metrics.final_state_hash, "Determinism run");
                hashes.push(metrics.final_state_hash);
            }
            Err(e) => {
                warn!(error = %e, "Determinism run failed");
                return false;
            }
        }
    }
    hashes.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_batch() -> BatchConfig {
        BatchConfig {
            scenarios: vec!["standard".to_string(), "serpent".to_string()],
            strategies: vec!["balanced".to_string(), "idle".to_string()],
            repeats: 2,
            parallel_games: 2,
            max_ticks: Some(3_000),
            ..BatchConfig::default()
        }
    }

    #[test]
    fn test_batch_plays_full_matrix() {
        let config = small_batch();
        assert_eq!(config.game_count(), 8);
        let results = run_batch(config);
        assert_eq!(results.games.len(), 8);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_games, 8);
        assert!(results.summary.nondeterministic.is_empty());
    }

    #[test]
    fn test_unknown_strategy_is_reported_per_game() {
        let config = BatchConfig {
            strategies: vec!["no_such_strategy".to_string()],
            repeats: 1,
            max_ticks: Some(10),
            ..BatchConfig::default()
        };
        let results = run_batch(config);
        assert!(results.games.is_empty());
        assert_eq!(results.errors.len(), 1);
        assert_eq!(results.errors[0].game_id, "standard-no_such_strategy-0");
    }

    #[test]
    fn test_results_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig {
            repeats: 1,
            max_ticks: Some(200),
            ..BatchConfig::default()
        }
        .with_output(dir.path().to_path_buf());
        let results = run_batch(config);
        let path = dir.path().join("nested").join("results.json");
        results.save(&path).unwrap();

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.config, results.config);
        assert_eq!(loaded.games, results.games);
    }

    #[test]
    fn test_verify_determinism() {
        assert!(verify_determinism("standard", "balanced", 3, 2_000));
        assert!(!verify_determinism("standard", "no_such_strategy", 2, 10));
    }
}
