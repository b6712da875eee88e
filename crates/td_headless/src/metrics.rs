//! Match metrics for balance analysis.
//!
//! [`GameMetrics`] is filled in while an automated match runs and written
//! out as JSON; [`BatchSummary`] aggregates many of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use td_core::prelude::TickEvents;

use crate::strategies::StrategyAction;

/// How an automated match ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// All scripted waves cleared.
    Victory,
    /// The base fell.
    Defeat,
    /// The tick budget ran out first.
    #[default]
    Timeout,
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Strategy name.
    pub strategy: String,
    /// Ticks simulated.
    pub duration_ticks: u64,
    /// How the match ended.
    pub outcome: Outcome,
    /// Waves completed.
    pub waves_completed: u32,
    /// Tick on which each wave completed, in order.
    pub wave_completion_ticks: Vec<u64>,
    /// Kills per enemy archetype.
    pub kills: BTreeMap<String, u32>,
    /// Enemies that reached the base.
    pub leaks: u32,
    /// Base damage taken.
    pub base_damage_taken: u32,
    /// Lives left at the end.
    pub lives_left: u32,
    /// Currency earned from kills.
    pub currency_earned: u32,
    /// Currency spent by the strategy.
    pub currency_spent: u32,
    /// Currency held at the end.
    pub final_currency: u32,
    /// Towers built per archetype.
    pub towers_built: BTreeMap<String, u32>,
    /// Tower upgrades bought.
    pub upgrades_bought: u32,
    /// Base upgrades bought.
    pub base_upgrades: u32,
    /// Projectiles fired.
    pub shots_fired: u32,
    /// Projectiles that lost their target.
    pub shots_fizzled: u32,
    /// Tick of the bonus unlock, if it happened.
    pub bonus_unlock_tick: Option<u64>,
    /// Final cash multiplier, in percent.
    pub final_cash_multiplier_percent: u32,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Create a new game metrics instance.
    #[must_use]
    pub fn new(
        game_id: impl Into<String>,
        scenario: impl Into<String>,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            scenario: scenario.into(),
            strategy: strategy.into(),
            ..Default::default()
        }
    }

    /// Record the events of tick `tick`.
    pub fn record_tick(&mut self, tick: u64, events: &TickEvents) {
        for kill in &events.kills {
            *self.kills.entry(format!("{:?}", kill.kind)).or_insert(0) += 1;
            self.currency_earned += kill.reward;
        }
        for leak in &events.leaks {
            self.leaks += 1;
            self.base_damage_taken += leak.damage;
        }
        self.shots_fired += u32::try_from(events.shots.len()).unwrap_or(u32::MAX);
        self.shots_fizzled += events.fizzled;
        if let Some(completion) = events.wave_completed {
            self.waves_completed = completion.wave;
            self.wave_completion_ticks.push(tick);
        }
        if events.bonus_unlocked {
            self.bonus_unlock_tick = Some(tick);
        }
    }

    /// Record something the strategy did.
    pub fn record_action(&mut self, action: &StrategyAction) {
        self.currency_spent += action.cost();
        match action {
            StrategyAction::Built { kind, .. } => {
                *self.towers_built.entry(format!("{kind:?}")).or_insert(0) += 1;
            }
            StrategyAction::Upgraded { .. } => self.upgrades_bought += 1,
            StrategyAction::BaseUpgraded { .. } => self.base_upgrades += 1,
            StrategyAction::Retargeted { .. } => {}
        }
    }

    /// Total kills across archetypes.
    #[must_use]
    pub fn total_kills(&self) -> u32 {
        self.kills.values().sum()
    }
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games summarised.
    pub total_games: u32,
    /// Games won.
    pub victories: u32,
    /// Games lost.
    pub defeats: u32,
    /// Games that hit the tick budget.
    pub timeouts: u32,
    /// Victories over total games.
    pub win_rate: f64,
    /// Mean waves completed.
    pub average_waves: f64,
    /// Mean match length in ticks.
    pub average_duration_ticks: f64,
    /// Mean leaks per game.
    pub average_leaks: f64,
    /// Games that unlocked the bonus tower.
    pub bonus_unlocks: u32,
    /// Win rate per strategy.
    pub win_rate_by_strategy: BTreeMap<String, f64>,
    /// Scenario/strategy pairs whose repeated runs ended in different
    /// states.
    pub nondeterministic: Vec<String>,
}

impl BatchSummary {
    /// Summarise a set of games.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        let total = games.len();
        if total == 0 {
            return Self::default();
        }
        let count = |outcome: Outcome| {
            let n = games.iter().filter(|g| g.outcome == outcome).count();
            u32::try_from(n).unwrap_or(u32::MAX)
        };
        #[allow(clippy::cast_precision_loss)]
        let mean = |f: &dyn Fn(&GameMetrics) -> f64| {
            games.iter().map(f).sum::<f64>() / total as f64
        };

        let mut by_strategy: BTreeMap<String, (u32, u32)> = BTreeMap::new();
        let mut hashes: BTreeMap<(String, String), Vec<u64>> = BTreeMap::new();
        for game in games {
            let entry = by_strategy.entry(game.strategy.clone()).or_default();
            entry.1 += 1;
            if game.outcome == Outcome::Victory {
                entry.0 += 1;
            }
            hashes
                .entry((game.scenario.clone(), game.strategy.clone()))
                .or_default()
                .push(game.final_state_hash);
        }

        let victories = count(Outcome::Victory);
        #[allow(clippy::cast_precision_loss)]
        let average_duration_ticks = mean(&|g| g.duration_ticks as f64);
        Self {
            total_games: u32::try_from(total).unwrap_or(u32::MAX),
            victories,
            defeats: count(Outcome::Defeat),
            timeouts: count(Outcome::Timeout),
            win_rate: mean(&|g| f64::from(u8::from(g.outcome == Outcome::Victory))),
            average_waves: mean(&|g| f64::from(g.waves_completed)),
            average_duration_ticks,
            average_leaks: mean(&|g| f64::from(g.leaks)),
            bonus_unlocks: u32::try_from(
                games.iter().filter(|g| g.bonus_unlock_tick.is_some()).count(),
            )
            .unwrap_or(u32::MAX),
            win_rate_by_strategy: by_strategy
                .into_iter()
                .map(|(name, (wins, played))| (name, f64::from(wins) / f64::from(played)))
                .collect(),
            nondeterministic: hashes
                .into_iter()
                .filter(|(_, runs)| runs.windows(2).any(|w| w[0] != w[1]))
                .map(|((scenario, strategy), _)| format!("{scenario}/{strategy}"))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(strategy: &str, outcome: Outcome, waves: u32, hash: u64) -> GameMetrics {
        GameMetrics {
            outcome,
            waves_completed: waves,
            final_state_hash: hash,
            duration_ticks: 1000,
            ..GameMetrics::new("g", "standard", strategy)
        }
    }

    #[test]
    fn test_record_action_tracks_spending() {
        let mut metrics = GameMetrics::new("g", "standard", "balanced");
        metrics.record_action(&StrategyAction::Built {
            tower: td_core::prelude::TowerId(1),
            kind: td_core::prelude::TowerKind::Dart,
            cost: 100,
        });
        metrics.record_action(&StrategyAction::BaseUpgraded { cost: 150 });
        assert_eq!(metrics.currency_spent, 250);
        assert_eq!(metrics.towers_built["Dart"], 1);
        assert_eq!(metrics.base_upgrades, 1);
    }

    #[test]
    fn test_summary_rates() {
        let games = vec![
            game("balanced", Outcome::Victory, 20, 7),
            game("balanced", Outcome::Victory, 20, 7),
            game("idle", Outcome::Defeat, 1, 9),
            game("idle", Outcome::Defeat, 1, 9),
        ];
        let summary = BatchSummary::from_games(&games);
        assert_eq!(summary.total_games, 4);
        assert_eq!(summary.victories, 2);
        assert_eq!(summary.defeats, 2);
        assert!((summary.win_rate - 0.5).abs() < 1e-9);
        assert!((summary.average_waves - 10.5).abs() < 1e-9);
        assert!((summary.win_rate_by_strategy["balanced"] - 1.0).abs() < 1e-9);
        assert!(summary.nondeterministic.is_empty());
    }

    #[test]
    fn test_summary_flags_divergent_repeats() {
        let games = vec![
            game("balanced", Outcome::Victory, 20, 1),
            game("balanced", Outcome::Victory, 20, 2),
        ];
        let summary = BatchSummary::from_games(&games);
        assert_eq!(summary.nondeterministic, vec!["standard/balanced".to_string()]);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }
}
