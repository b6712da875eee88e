//! Automated match execution.
//!
//! Plays a [`Scenario`] with a [`Strategy`] through the player facade,
//! starting each wave as soon as the previous one clears, and collects
//! [`GameMetrics`] along the way.
//!
//! Every loop here is bounded: the match loop by the tick budget and the
//! per-tick strategy loop by [`MAX_ACTIONS_PER_TICK`].

use std::time::Instant;

use td_core::prelude::{Game, MapCatalog, MemoryUnlockStore, PlayerFacade, UnlockStore};
use tracing::{debug, info, warn};

use crate::metrics::{GameMetrics, Outcome};
use crate::scenario::{Scenario, ScenarioError};
use crate::strategies::{Strategy, StrategyExecutor};

/// Strategy actions allowed per tick before the runner moves on.
pub const MAX_ACTIONS_PER_TICK: usize = 32;

/// Progress logging interval (ticks).
const PROGRESS_LOG_INTERVAL: u64 = 3600;

/// Configuration for a single automated match.
#[derive(Debug, Clone)]
pub struct AutoPlayConfig {
    /// Game ID for tracking.
    pub game_id: String,
    /// Scenario to play.
    pub scenario: Scenario,
    /// Strategy playing it.
    pub strategy: Strategy,
    /// Tick budget; the scenario's own budget when `None`.
    pub max_ticks: Option<u64>,
}

impl AutoPlayConfig {
    /// Play `scenario` with `strategy` under the scenario's tick budget.
    #[must_use]
    pub fn new(game_id: impl Into<String>, scenario: Scenario, strategy: Strategy) -> Self {
        Self {
            game_id: game_id.into(),
            scenario,
            strategy,
            max_ticks: None,
        }
    }

    /// Tick budget in effect.
    #[must_use]
    pub fn tick_budget(&self) -> u64 {
        self.max_ticks.unwrap_or(self.scenario.max_ticks)
    }
}

/// Runs automated matches against a map catalog.
#[derive(Debug, Clone)]
pub struct GameRunner {
    catalog: MapCatalog,
}

impl Default for GameRunner {
    fn default() -> Self {
        Self::new(MapCatalog::builtin())
    }
}

impl GameRunner {
    /// Create a runner resolving scenario maps in `catalog`.
    #[must_use]
    pub fn new(catalog: MapCatalog) -> Self {
        Self { catalog }
    }

    /// Map catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &MapCatalog {
        &self.catalog
    }

    /// Play a match with a fresh in-memory unlock store.
    ///
    /// # Errors
    /// Fails when the scenario does not describe a playable match.
    pub fn run(&self, config: &AutoPlayConfig) -> Result<GameMetrics, ScenarioError> {
        self.run_with_store(config, MemoryUnlockStore::new())
    }

    /// Play a match against `store`.
    ///
    /// # Errors
    /// Fails when the scenario does not describe a playable match.
    pub fn run_with_store<S: UnlockStore>(
        &self,
        config: &AutoPlayConfig,
        store: S,
    ) -> Result<GameMetrics, ScenarioError> {
        let mut game = config.scenario.build_game(&self.catalog, store)?;
        Ok(play(&mut game, config))
    }
}

/// Play `game` to the end or to the tick budget.
pub fn play<S: UnlockStore>(game: &mut Game<S>, config: &AutoPlayConfig) -> GameMetrics {
    let started = Instant::now();
    let max_ticks = config.tick_budget();
    info!(
        game_id = %config.game_id,
        scenario = %config.scenario.name,
        strategy = %config.strategy.name,
        max_ticks,
        "Starting automated match"
    );

    let mut metrics = GameMetrics::new(
        config.game_id.clone(),
        config.scenario.name.clone(),
        config.strategy.name.clone(),
    );
    let mut executor = StrategyExecutor::new(config.strategy.clone());

    while game.tick_count() < max_ticks && !game.economy().is_over() {
        for _ in 0..MAX_ACTIONS_PER_TICK {
            match executor.act(game) {
                Some(action) => metrics.record_action(&action),
                None => break,
            }
        }

        if !game.economy().wave_active {
            match game.start_wave() {
                Ok(wave) => debug!(wave, tick = game.tick_count(), "Wave started"),
                Err(e) => warn!(error = %e, "Could not start wave"),
            }
        }

        let events = game.tick();
        let tick = game.tick_count();
        metrics.record_tick(tick, &events);

        if let Some(completion) = events.wave_completed {
            debug!(
                wave = completion.wave,
                tick,
                currency = game.economy().currency,
                multiplier = completion.cash_multiplier_percent,
                "Wave cleared"
            );
        }
        if tick % PROGRESS_LOG_INTERVAL == 0 {
            debug!(
                tick,
                wave = game.economy().wave,
                enemies = game.enemies().len(),
                towers = game.towers().len(),
                elapsed_ms = started.elapsed().as_millis(),
                "Match progress"
            );
        }
    }

    let economy = game.economy();
    metrics.outcome = if economy.victory {
        Outcome::Victory
    } else if economy.game_over {
        Outcome::Defeat
    } else {
        Outcome::Timeout
    };
    metrics.duration_ticks = game.tick_count();
    metrics.lives_left = economy.lives;
    metrics.final_currency = economy.currency;
    metrics.final_cash_multiplier_percent = economy.cash_multiplier_percent;
    metrics.final_state_hash = game.state_hash();

    info!(
        game_id = %config.game_id,
        outcome = ?metrics.outcome,
        waves = metrics.waves_completed,
        ticks = metrics.duration_ticks,
        kills = metrics.total_kills(),
        leaks = metrics.leaks,
        elapsed_ms = started.elapsed().as_millis(),
        "Automated match finished"
    );
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use td_core::prelude::GameConfig;

    fn quick_scenario(config: GameConfig, max_ticks: u64) -> Scenario {
        Scenario {
            name: "quick".to_string(),
            config,
            max_ticks,
            ..Scenario::standard()
        }
    }

    #[test]
    fn test_idle_strategy_loses() {
        let config = AutoPlayConfig::new(
            "idle",
            quick_scenario(GameConfig::default(), 60 * 60 * 30),
            Strategy::idle(),
        );
        let metrics = GameRunner::default().run(&config).unwrap();
        assert_eq!(metrics.outcome, Outcome::Defeat);
        assert_eq!(metrics.lives_left, 0);
        assert_eq!(metrics.currency_spent, 0);
        assert!(metrics.leaks > 0);
        assert_eq!(metrics.total_kills(), 0);
    }

    #[test]
    fn test_rich_balanced_strategy_wins_short_match() {
        let scenario = quick_scenario(
            GameConfig {
                starting_currency: 20_000,
                scripted_waves: 3,
                ..GameConfig::default()
            },
            60 * 60 * 10,
        );
        let config = AutoPlayConfig::new("rich", scenario, Strategy::balanced());
        let metrics = GameRunner::default().run(&config).unwrap();
        assert_eq!(metrics.outcome, Outcome::Victory);
        assert_eq!(metrics.waves_completed, 3);
        assert_eq!(metrics.wave_completion_ticks.len(), 3);
        assert_eq!(metrics.leaks, 0);
        assert!(metrics.currency_spent > 0);
        assert_eq!(
            metrics.final_currency,
            20_000 + metrics.currency_earned - metrics.currency_spent
        );
    }

    #[test]
    fn test_tick_budget_times_out() {
        let mut config = AutoPlayConfig::new("short", Scenario::endless(), Strategy::balanced());
        config.max_ticks = Some(100);
        let metrics = GameRunner::default().run(&config).unwrap();
        assert_eq!(metrics.outcome, Outcome::Timeout);
        assert_eq!(metrics.duration_ticks, 100);
    }

    #[test]
    fn test_repeated_runs_match() {
        let mut config = AutoPlayConfig::new("a", Scenario::standard(), Strategy::balanced());
        config.max_ticks = Some(5_000);
        let runner = GameRunner::default();
        let first = runner.run(&config).unwrap();
        let second = runner.run(&config).unwrap();
        assert_eq!(first.final_state_hash, second.final_state_hash);
        assert_eq!(first, second);
    }
}
