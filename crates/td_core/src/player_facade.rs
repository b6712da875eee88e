//! Unified player interface for the UI layer, scripts and auto-players.
//!
//! Everything a player can do to a match goes through [`PlayerFacade`].
//! A rejected action returns an [`ActionError`] and leaves the match exactly
//! as it was; nothing here panics.

use crate::config::GameConfig;
use crate::economy::EconomyState;
use crate::error::ActionError;
use crate::math::{fixed_int, Fixed, Vec2Fixed};
use crate::path::PathCurve;
use crate::simulation::Game;
use crate::towers::{
    TargetingPolicy, Tower, TowerId, TowerKind, UpgradeStat, TOWER_FOOTPRINT, TOWER_MIN_SPACING,
};
use crate::unlock::UnlockStore;

/// Clicks within this distance of a tower centre select it.
pub const TOWER_SELECT_RADIUS: Fixed = fixed_int(20);

/// Actions and queries available to whoever is playing.
pub trait PlayerFacade {
    /// Choose the kind `place_selected_tower` builds.
    ///
    /// # Errors
    /// Returns [`ActionError::TowerLocked`] for a bonus kind not yet unlocked.
    fn set_tower_type(&mut self, kind: TowerKind) -> Result<(), ActionError>;

    /// Kind `place_selected_tower` builds.
    fn selected_kind(&self) -> TowerKind;

    /// Check whether a tower of `kind` could be placed at `position` now.
    ///
    /// # Errors
    /// Returns the reason placement would be rejected.
    fn can_place(&self, position: Vec2Fixed, kind: TowerKind) -> Result<(), ActionError>;

    /// Buy and place a tower.
    ///
    /// # Errors
    /// Rejected after the match ends, for a locked kind, outside the map,
    /// on the path, too close to another tower, or when unaffordable.
    fn place_tower(
        &mut self,
        position: Vec2Fixed,
        kind: TowerKind,
    ) -> Result<TowerId, ActionError>;

    /// Place a tower of the selected kind.
    ///
    /// # Errors
    /// Same as [`place_tower`](Self::place_tower).
    fn place_selected_tower(&mut self, position: Vec2Fixed) -> Result<TowerId, ActionError> {
        let kind = self.selected_kind();
        self.place_tower(position, kind)
    }

    /// Select the tower nearest `position` within [`TOWER_SELECT_RADIUS`],
    /// or clear the selection when there is none. Points outside the map
    /// select nothing.
    fn select_tower(&mut self, position: Vec2Fixed) -> Option<TowerId>;

    /// Buy one level of `stat` for a tower. Returns the price paid.
    ///
    /// # Errors
    /// Rejected after the match ends, for an unknown tower, or when
    /// unaffordable.
    fn upgrade_tower(&mut self, tower: TowerId, stat: UpgradeStat) -> Result<u32, ActionError>;

    /// Sell a tower. Returns the refund.
    ///
    /// # Errors
    /// Rejected after the match ends or for an unknown tower.
    fn sell_tower(&mut self, tower: TowerId) -> Result<u32, ActionError>;

    /// Change how a tower picks targets.
    ///
    /// # Errors
    /// Rejected after the match ends or for an unknown tower.
    fn set_targeting_policy(
        &mut self,
        tower: TowerId,
        policy: TargetingPolicy,
    ) -> Result<(), ActionError>;

    /// Launch the next wave. Returns its number.
    ///
    /// # Errors
    /// Rejected after the match ends or while a wave is running.
    fn start_wave(&mut self) -> Result<u32, ActionError>;

    /// Buy a base upgrade. Returns the price paid.
    ///
    /// # Errors
    /// Rejected after the match ends or when unaffordable.
    fn upgrade_base(&mut self) -> Result<u32, ActionError>;

    /// Economy and progression.
    fn economy(&self) -> &EconomyState;

    /// Placed towers.
    fn towers(&self) -> &[Tower];

    /// The path.
    fn curve(&self) -> &PathCurve;

    /// Match configuration.
    fn config(&self) -> &GameConfig;
}

impl<S: UnlockStore> Game<S> {
    fn ensure_running(&self) -> Result<(), ActionError> {
        if self.state.economy.is_over() {
            return Err(ActionError::MatchOver);
        }
        Ok(())
    }

    fn ensure_available(&self, kind: TowerKind) -> Result<(), ActionError> {
        if kind.is_bonus() && !self.bonus_unlocked {
            return Err(ActionError::TowerLocked(kind));
        }
        Ok(())
    }

    fn tower_index(&self, id: TowerId) -> Result<usize, ActionError> {
        self.state
            .towers
            .iter()
            .position(|tower| tower.id == id)
            .ok_or(ActionError::UnknownTower(id))
    }
}

impl<S: UnlockStore> PlayerFacade for Game<S> {
    fn set_tower_type(&mut self, kind: TowerKind) -> Result<(), ActionError> {
        self.ensure_available(kind)?;
        self.state.selected_kind = kind;
        Ok(())
    }

    fn selected_kind(&self) -> TowerKind {
        self.state.selected_kind
    }

    fn can_place(&self, position: Vec2Fixed, kind: TowerKind) -> Result<(), ActionError> {
        self.ensure_running()?;
        self.ensure_available(kind)?;
        if !self.config.contains(position) {
            return Err(ActionError::OutOfBounds);
        }
        if self.curve.is_within_corridor(position, TOWER_FOOTPRINT) {
            return Err(ActionError::OnPath);
        }
        let min_spacing_sq = TOWER_MIN_SPACING * TOWER_MIN_SPACING;
        if let Some(tower) = self
            .state
            .towers
            .iter()
            .find(|tower| tower.position.distance_squared(position) < min_spacing_sq)
        {
            return Err(ActionError::TooCloseToTower(tower.id));
        }
        let cost = kind.cost();
        if !self.state.economy.can_afford(cost) {
            return Err(ActionError::InsufficientFunds {
                required: cost,
                available: self.state.economy.currency,
            });
        }
        Ok(())
    }

    fn place_tower(
        &mut self,
        position: Vec2Fixed,
        kind: TowerKind,
    ) -> Result<TowerId, ActionError> {
        self.can_place(position, kind)?;
        self.state.economy.spend(kind.cost())?;

        let id = self.state.allocate_tower_id();
        self.state.towers.push(Tower::new(id, kind, position));
        self.state.achievements.record_placement(kind);
        tracing::debug!(tower = ?id, ?kind, "Tower placed");
        Ok(id)
    }

    fn select_tower(&mut self, position: Vec2Fixed) -> Option<TowerId> {
        if !self.config.contains(position) {
            self.state.selected_tower = None;
            return None;
        }
        let selected = self
            .state
            .towers
            .iter()
            .filter(|tower| tower.position.within(position, TOWER_SELECT_RADIUS))
            .min_by_key(|tower| tower.position.distance_squared(position))
            .map(|tower| tower.id);
        self.state.selected_tower = selected;
        selected
    }

    fn upgrade_tower(&mut self, tower: TowerId, stat: UpgradeStat) -> Result<u32, ActionError> {
        self.ensure_running()?;
        let index = self.tower_index(tower)?;
        let cost = self.state.towers[index].upgrade_cost(stat);
        self.state.economy.spend(cost)?;
        self.state.towers[index].apply_upgrade(stat, cost);
        tracing::debug!(?tower, ?stat, cost, "Tower upgraded");
        Ok(cost)
    }

    fn sell_tower(&mut self, tower: TowerId) -> Result<u32, ActionError> {
        self.ensure_running()?;
        let index = self.tower_index(tower)?;
        let removed = self.state.towers.remove(index);
        let refund = removed.sell_value();
        self.state.economy.refund(refund);
        if self.state.selected_tower == Some(tower) {
            self.state.selected_tower = None;
        }
        tracing::debug!(?tower, refund, "Tower sold");
        Ok(refund)
    }

    fn set_targeting_policy(
        &mut self,
        tower: TowerId,
        policy: TargetingPolicy,
    ) -> Result<(), ActionError> {
        self.ensure_running()?;
        let index = self.tower_index(tower)?;
        self.state.towers[index].policy = policy;
        Ok(())
    }

    fn start_wave(&mut self) -> Result<u32, ActionError> {
        self.launch_wave()
    }

    fn upgrade_base(&mut self) -> Result<u32, ActionError> {
        self.state.economy.upgrade_base()
    }

    fn economy(&self) -> &EconomyState {
        &self.state.economy
    }

    fn towers(&self) -> &[Tower] {
        &self.state.towers
    }

    fn curve(&self) -> &PathCurve {
        &self.curve
    }

    fn config(&self) -> &GameConfig {
        &self.config
    }
}
