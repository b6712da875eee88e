//! Scripted strategies for automated play.
//!
//! A strategy is a build order followed by a spending policy. The
//! [`StrategyExecutor`] plays it through [`PlayerFacade`], so it can only do
//! what a human player could.

use std::path::Path;

use serde::{Deserialize, Serialize};
use td_core::prelude::{
    ActionError, PlayerFacade, TargetingPolicy, TowerId, TowerKind, UpgradeStat, Vec2Fixed,
};
use thiserror::Error;

/// Error type for strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// File not found.
    #[error("Strategy file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read strategy file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse strategy: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// Offsets from a path sample tried when looking for a tower site.
const SITE_OFFSETS: [(i32, i32); 8] = [
    (0, 45),
    (0, -45),
    (45, 0),
    (-45, 0),
    (35, 35),
    (-35, -35),
    (35, -35),
    (-35, 35),
];

/// Path samples skipped between site probes.
const SITE_STRIDE: usize = 6;

/// One entry of a build order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStep {
    /// Place a tower at the first free site along the path.
    Tower(TowerKind),
    /// Place a tower at an exact position.
    TowerAt { kind: TowerKind, x: i32, y: i32 },
    /// Upgrade the n-th tower this strategy built.
    Upgrade { slot: usize, stat: UpgradeStat },
    /// Retarget the n-th tower this strategy built.
    Target {
        slot: usize,
        policy: TargetingPolicy,
    },
    /// Buy a base upgrade.
    UpgradeBase,
}

/// A complete strategy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Steps followed in order; a step waits until it is affordable.
    pub build_order: Vec<BuildStep>,
    /// Tower kinds added in rotation once the build order is done.
    #[serde(default)]
    pub expansion: Vec<TowerKind>,
    /// Stats bought on existing towers once the build order is done.
    #[serde(default)]
    pub upgrade_priority: Vec<UpgradeStat>,
    /// Automatic upgrades stop at this level.
    #[serde(default = "default_max_upgrade_level")]
    pub max_upgrade_level: u32,
    /// Buy a base upgrade when base health drops below this percentage.
    #[serde(default)]
    pub repair_below_percent: u32,
}

fn default_max_upgrade_level() -> u32 {
    4
}

impl Default for Strategy {
    fn default() -> Self {
        Self::balanced()
    }
}

impl Strategy {
    /// Load a strategy from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StrategyError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let strategy: Strategy = ron::from_str(&contents)?;
        Ok(strategy)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, StrategyError> {
        let strategy: Strategy = ron::from_str(ron)?;
        Ok(strategy)
    }

    /// Built-in strategy by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "balanced" => Some(Self::balanced()),
            "dart_rush" | "darts" => Some(Self::dart_rush()),
            "sniper_nest" => Some(Self::sniper_nest()),
            "idle" => Some(Self::idle()),
            _ => None,
        }
    }

    /// A built-in strategy name, or else a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, StrategyError> {
        match Self::builtin(name_or_path) {
            Some(strategy) => Ok(strategy),
            None => Self::load(name_or_path),
        }
    }

    /// Every base tower kind early, then steady upgrades.
    #[must_use]
    pub fn balanced() -> Self {
        Self {
            name: "balanced".to_string(),
            description: "One of each base tower, then grow and upgrade".to_string(),
            build_order: vec![
                BuildStep::Tower(TowerKind::Dart),
                BuildStep::Tower(TowerKind::Dart),
                BuildStep::Tower(TowerKind::Ice),
                BuildStep::Tower(TowerKind::Bomb),
                BuildStep::Tower(TowerKind::Sniper),
                BuildStep::Target {
                    slot: 4,
                    policy: TargetingPolicy::Strong,
                },
            ],
            expansion: vec![
                TowerKind::Dart,
                TowerKind::Bomb,
                TowerKind::Sniper,
                TowerKind::Ice,
            ],
            upgrade_priority: vec![UpgradeStat::Damage, UpgradeStat::FireRate, UpgradeStat::Range],
            max_upgrade_level: 4,
            repair_below_percent: 40,
        }
    }

    /// Cheap darts everywhere, damage first.
    #[must_use]
    pub fn dart_rush() -> Self {
        Self {
            name: "dart_rush".to_string(),
            description: "Only darts, as many as possible".to_string(),
            build_order: vec![BuildStep::Tower(TowerKind::Dart); 6],
            expansion: vec![TowerKind::Dart],
            upgrade_priority: vec![UpgradeStat::Damage, UpgradeStat::FireRate],
            max_upgrade_level: 3,
            repair_below_percent: 0,
        }
    }

    /// Few towers, heavily upgraded snipers.
    #[must_use]
    pub fn sniper_nest() -> Self {
        Self {
            name: "sniper_nest".to_string(),
            description: "Snipers on the strongest target, upgraded hard".to_string(),
            build_order: vec![
                BuildStep::Tower(TowerKind::Dart),
                BuildStep::Tower(TowerKind::Sniper),
                BuildStep::Target {
                    slot: 1,
                    policy: TargetingPolicy::Strong,
                },
                BuildStep::Tower(TowerKind::Sniper),
            ],
            expansion: vec![TowerKind::Sniper],
            upgrade_priority: vec![UpgradeStat::Damage, UpgradeStat::FireRate],
            max_upgrade_level: 8,
            repair_below_percent: 50,
        }
    }

    /// Builds nothing. Baseline for leak behaviour.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            name: "idle".to_string(),
            description: "Never builds anything".to_string(),
            build_order: Vec::new(),
            expansion: Vec::new(),
            upgrade_priority: Vec::new(),
            max_upgrade_level: 0,
            repair_below_percent: 0,
        }
    }
}

/// Something the executor did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyAction {
    /// Placed a tower.
    Built {
        tower: TowerId,
        kind: TowerKind,
        cost: u32,
    },
    /// Upgraded a tower.
    Upgraded {
        tower: TowerId,
        stat: UpgradeStat,
        cost: u32,
    },
    /// Changed a tower's targeting.
    Retargeted {
        tower: TowerId,
        policy: TargetingPolicy,
    },
    /// Bought a base upgrade.
    BaseUpgraded { cost: u32 },
}

impl StrategyAction {
    /// Currency this action spent.
    #[must_use]
    pub fn cost(&self) -> u32 {
        match *self {
            Self::Built { cost, .. }
            | Self::Upgraded { cost, .. }
            | Self::BaseUpgraded { cost } => cost,
            Self::Retargeted { .. } => 0,
        }
    }
}

/// What to do with the current build step.
enum StepOutcome {
    Done(Option<StrategyAction>),
    Wait,
    Skip(ActionError),
}

/// Plays a [`Strategy`] against a match.
#[derive(Debug, Clone)]
pub struct StrategyExecutor {
    strategy: Strategy,
    next_step: usize,
    next_expansion: usize,
    built: Vec<TowerId>,
}

impl StrategyExecutor {
    /// Create an executor at the start of the build order.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            next_step: 0,
            next_expansion: 0,
            built: Vec::new(),
        }
    }

    /// The strategy being played.
    #[must_use]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Towers built so far, in build order.
    #[must_use]
    pub fn built(&self) -> &[TowerId] {
        &self.built
    }

    /// Whether the build order has been worked through.
    #[must_use]
    pub fn build_order_done(&self) -> bool {
        self.next_step >= self.strategy.build_order.len()
    }

    /// Take at most one action. Returns `None` when the strategy wants to
    /// wait for more currency or has nothing left to do.
    pub fn act(&mut self, player: &mut impl PlayerFacade) -> Option<StrategyAction> {
        if player.economy().is_over() {
            return None;
        }
        if let Some(action) = self.repair(player) {
            return Some(action);
        }

        while let Some(step) = self.strategy.build_order.get(self.next_step).cloned() {
            match self.run_step(player, &step) {
                StepOutcome::Done(action) => {
                    self.next_step += 1;
                    return action;
                }
                StepOutcome::Wait => return None,
                StepOutcome::Skip(reason) => {
                    tracing::debug!(step = ?step, %reason, "Skipping build step");
                    self.next_step += 1;
                }
            }
        }

        self.spend_surplus(player)
    }

    fn repair(&self, player: &mut impl PlayerFacade) -> Option<StrategyAction> {
        let economy = player.economy();
        let threshold = economy.base_max_health * self.strategy.repair_below_percent;
        let healthy = economy.base_health * 100 >= threshold;
        if healthy || !economy.can_afford(economy.base_upgrade_cost()) {
            return None;
        }
        let cost = player.upgrade_base().ok()?;
        Some(StrategyAction::BaseUpgraded { cost })
    }

    fn run_step(&mut self, player: &mut impl PlayerFacade, step: &BuildStep) -> StepOutcome {
        let result = match *step {
            BuildStep::Tower(kind) => {
                if !player.economy().can_afford(kind.cost()) {
                    return StepOutcome::Wait;
                }
                match find_site(&*player, kind) {
                    Ok(Some(position)) => self.build(player, position, kind),
                    Ok(None) => {
                        tracing::debug!(?kind, "No free site, dropping build step");
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            }
            BuildStep::TowerAt { kind, x, y } => {
                self.build(player, Vec2Fixed::from_ints(x, y), kind)
            }
            BuildStep::Upgrade { slot, stat } => match self.built.get(slot) {
                Some(&tower) => player
                    .upgrade_tower(tower, stat)
                    .map(|cost| Some(StrategyAction::Upgraded { tower, stat, cost })),
                None => Err(ActionError::UnknownTower(TowerId(0))),
            },
            BuildStep::Target { slot, policy } => match self.built.get(slot) {
                Some(&tower) => player
                    .set_targeting_policy(tower, policy)
                    .map(|()| Some(StrategyAction::Retargeted { tower, policy })),
                None => Err(ActionError::UnknownTower(TowerId(0))),
            },
            BuildStep::UpgradeBase => player
                .upgrade_base()
                .map(|cost| Some(StrategyAction::BaseUpgraded { cost })),
        };

        match result {
            Ok(action) => StepOutcome::Done(action),
            Err(ActionError::InsufficientFunds { .. }) => StepOutcome::Wait,
            Err(e) => StepOutcome::Skip(e),
        }
    }

    fn build(
        &mut self,
        player: &mut impl PlayerFacade,
        position: Vec2Fixed,
        kind: TowerKind,
    ) -> Result<Option<StrategyAction>, ActionError> {
        let tower = player.place_tower(position, kind)?;
        self.built.push(tower);
        Ok(Some(StrategyAction::Built {
            tower,
            kind,
            cost: kind.cost(),
        }))
    }

    /// Cheapest useful purchase after the build order: an upgrade within
    /// the level cap or the next expansion tower.
    fn spend_surplus(&mut self, player: &mut impl PlayerFacade) -> Option<StrategyAction> {
        let upgrade = self.cheapest_upgrade(&*player);
        let expansion = self
            .strategy
            .expansion
            .get(self.next_expansion % self.strategy.expansion.len().max(1))
            .copied();

        let build_first = match (upgrade, expansion) {
            (Some((_, _, cost)), Some(kind)) => kind.cost() <= cost,
            (None, Some(_)) => true,
            (_, None) => false,
        };

        if build_first {
            if let Some(action) = expansion.and_then(|kind| self.expand(player, kind)) {
                return Some(action);
            }
        }

        let (tower, stat, cost) = upgrade?;
        if !player.economy().can_afford(cost) {
            return None;
        }
        player.upgrade_tower(tower, stat).ok()?;
        Some(StrategyAction::Upgraded { tower, stat, cost })
    }

    fn expand(
        &mut self,
        player: &mut impl PlayerFacade,
        kind: TowerKind,
    ) -> Option<StrategyAction> {
        if !player.economy().can_afford(kind.cost()) {
            return None;
        }
        let position = find_site(&*player, kind).ok().flatten()?;
        let action = self.build(player, position, kind).ok().flatten()?;
        self.next_expansion += 1;
        Some(action)
    }

    fn cheapest_upgrade(&self, player: &impl PlayerFacade) -> Option<(TowerId, UpgradeStat, u32)> {
        let cap = self.strategy.max_upgrade_level;
        player
            .towers()
            .iter()
            .filter(|tower| self.built.contains(&tower.id))
            .flat_map(|tower| {
                self.strategy
                    .upgrade_priority
                    .iter()
                    .filter(move |&&stat| tower.level(stat) < cap)
                    .map(move |&stat| (tower.id, stat, tower.upgrade_cost(stat)))
            })
            .min_by_key(|&(_, _, cost)| cost)
    }
}

/// First legal site for a tower of `kind`, probing around the path from the
/// start.
///
/// Returns `Ok(None)` when no site is free and an error when the kind
/// cannot be placed at all right now.
fn find_site(
    player: &impl PlayerFacade,
    kind: TowerKind,
) -> Result<Option<Vec2Fixed>, ActionError> {
    for sample in player.curve().samples().iter().step_by(SITE_STRIDE) {
        for (dx, dy) in SITE_OFFSETS {
            let candidate = *sample + Vec2Fixed::from_ints(dx, dy);
            match player.can_place(candidate, kind) {
                Ok(()) => return Ok(Some(candidate)),
                Err(
                    ActionError::OnPath
                    | ActionError::OutOfBounds
                    | ActionError::TooCloseToTower(_),
                ) => {}
                Err(e) => return Err(e),
            }
        }
    }
    Ok(None)
}
