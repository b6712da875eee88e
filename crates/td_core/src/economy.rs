//! Currency, base health, lives and wave progression.
//!
//! All calculations use integer math for deterministic simulation. The cash
//! multiplier is tracked in percent so kill rewards floor exactly.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::ActionError;
use crate::math::Fixed;

/// Cash multiplier at the start of a match, in percent.
pub const BASE_CASH_MULTIPLIER_PERCENT: u32 = 100;

/// Multiplier gain on every third completed wave, in percent.
pub const THIRD_WAVE_BONUS_PERCENT: u32 = 10;

/// Multiplier gain on every fifth completed wave in endless mode, in percent.
pub const ENDLESS_FIFTH_WAVE_BONUS_PERCENT: u32 = 25;

/// Base upgrade price per current base level.
pub const BASE_UPGRADE_COST_PER_LEVEL: u32 = 150;

/// Max base hit points gained per base upgrade.
pub const BASE_UPGRADE_HEALTH: u32 = 50;

/// Result of damage reaching the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakOutcome {
    /// Base hit points lost.
    pub damage: u32,
    /// This leak emptied the base and cost a life.
    pub life_lost: bool,
    /// The match is now lost.
    pub defeat: bool,
}

/// Effects of a wave completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveCompletion {
    /// Wave that just finished.
    pub wave: u32,
    /// Cash multiplier after the completion bonuses, in percent.
    pub cash_multiplier_percent: u32,
    /// That was the last scripted wave and the match is won.
    pub victory: bool,
}

/// Match-level economy and progression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EconomyState {
    /// Spendable currency. Never negative.
    pub currency: u32,
    /// Remaining lives.
    pub lives: u32,
    /// Current base hit points.
    pub base_health: u32,
    /// Maximum base hit points.
    pub base_max_health: u32,
    /// Base upgrade level, starting at 1.
    pub base_level: u32,
    /// Total base damage taken this match.
    pub damage_taken: u32,
    /// Kill reward multiplier, in percent.
    pub cash_multiplier_percent: u32,
    /// Current wave, 0 before the first wave starts.
    pub wave: u32,
    /// A wave is spawning or enemies from it are still on the field.
    pub wave_active: bool,
    /// Match lost.
    pub game_over: bool,
    /// Match won.
    pub victory: bool,
    /// Waves continue past the scripted table.
    pub endless: bool,
    /// Wave whose completion wins a non-endless match.
    pub final_wave: u32,
}

impl EconomyState {
    /// Starting economy for a match under `config`.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        Self {
            currency: config.starting_currency,
            lives: config.starting_lives,
            base_health: config.base_health,
            base_max_health: config.base_health,
            base_level: 1,
            damage_taken: 0,
            cash_multiplier_percent: BASE_CASH_MULTIPLIER_PERCENT,
            wave: 0,
            wave_active: false,
            game_over: false,
            victory: false,
            endless: config.endless,
            final_wave: config.scripted_waves,
        }
    }

    /// Whether the match has ended either way.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.game_over || self.victory
    }

    /// Check if the player can afford a cost.
    #[must_use]
    pub const fn can_afford(&self, cost: u32) -> bool {
        self.currency >= cost
    }

    /// Deduct `cost`, or reject with no change.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InsufficientFunds`] when the balance is short.
    pub fn spend(&mut self, cost: u32) -> Result<(), ActionError> {
        if !self.can_afford(cost) {
            return Err(ActionError::InsufficientFunds {
                required: cost,
                available: self.currency,
            });
        }
        self.currency -= cost;
        Ok(())
    }

    /// Add currency from a sale.
    pub fn refund(&mut self, amount: u32) {
        self.currency = self.currency.saturating_add(amount);
    }

    /// Current cash multiplier as a number.
    #[must_use]
    pub fn cash_multiplier(&self) -> Fixed {
        Fixed::from_num(self.cash_multiplier_percent) / Fixed::from_num(100)
    }

    /// Reward for a kill worth `base_reward`, with the multiplier applied.
    #[must_use]
    pub const fn kill_reward(&self, base_reward: u32) -> u32 {
        base_reward * self.cash_multiplier_percent / 100
    }

    /// Credit a kill. Returns the amount granted.
    pub fn grant_kill_reward(&mut self, base_reward: u32) -> u32 {
        let reward = self.kill_reward(base_reward);
        self.currency = self.currency.saturating_add(reward);
        reward
    }

    /// Apply damage from an enemy reaching the base.
    ///
    /// Emptying the base costs one life and the base stays at zero. The
    /// match is lost once lives run out or the base is empty.
    pub fn record_leak(&mut self, damage: u32) -> LeakOutcome {
        let was_standing = self.base_health > 0;
        self.base_health = self.base_health.saturating_sub(damage);
        self.damage_taken += damage;

        let life_lost = was_standing && self.base_health == 0;
        if life_lost {
            self.lives = self.lives.saturating_sub(1);
        }

        if self.lives == 0 || self.base_health == 0 {
            self.game_over = true;
        }

        LeakOutcome {
            damage,
            life_lost,
            defeat: self.game_over,
        }
    }

    /// Price of the next base upgrade.
    #[must_use]
    pub const fn base_upgrade_cost(&self) -> u32 {
        self.base_level * BASE_UPGRADE_COST_PER_LEVEL
    }

    /// Buy a base upgrade: more max hit points and a full heal.
    ///
    /// # Errors
    ///
    /// Rejects after the match has ended or when the player cannot pay.
    pub fn upgrade_base(&mut self) -> Result<u32, ActionError> {
        if self.is_over() {
            return Err(ActionError::MatchOver);
        }
        let cost = self.base_upgrade_cost();
        self.spend(cost)?;
        self.base_level += 1;
        self.base_max_health += BASE_UPGRADE_HEALTH;
        self.base_health = self.base_max_health;
        Ok(cost)
    }

    /// Mark the next wave as running and return its number.
    ///
    /// # Errors
    ///
    /// Rejects after the match has ended or while a wave is running.
    pub fn begin_wave(&mut self) -> Result<u32, ActionError> {
        if self.is_over() {
            return Err(ActionError::MatchOver);
        }
        if self.wave_active {
            return Err(ActionError::WaveInProgress);
        }
        self.wave += 1;
        self.wave_active = true;
        Ok(self.wave)
    }

    /// Close the running wave and apply completion bonuses.
    ///
    /// Called exactly once per wave.
    pub fn complete_wave(&mut self) -> WaveCompletion {
        self.wave_active = false;
        let wave = self.wave;

        if wave % 3 == 0 {
            self.cash_multiplier_percent += THIRD_WAVE_BONUS_PERCENT;
        }
        if self.endless && wave % 5 == 0 {
            self.cash_multiplier_percent += ENDLESS_FIFTH_WAVE_BONUS_PERCENT;
        }
        if !self.endless && wave >= self.final_wave && !self.game_over {
            self.victory = true;
        }

        WaveCompletion {
            wave,
            cash_multiplier_percent: self.cash_multiplier_percent,
            victory: self.victory,
        }
    }
}
