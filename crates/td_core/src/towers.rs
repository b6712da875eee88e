//! Tower archetypes, upgrades, targeting and firing.
//!
//! Towers are stationary. Each tick a tower either counts down its cooldown
//! or looks for a target among live enemies in range and, if it finds one,
//! emits a [`Shot`] that the simulation turns into a projectile.

use serde::{Deserialize, Serialize};

use crate::enemies::{Enemy, EnemyId};
use crate::math::{fixed_int, fixed_ratio, Fixed, Vec2Fixed};
use crate::projectiles::DamageShape;

/// Fire interval never drops below this many ticks, however many rate
/// upgrades are bought.
pub const MIN_FIRE_INTERVAL: u32 = 5;

/// Percentage of total spend returned when a tower is sold.
pub const SELL_REFUND_PERCENT: u32 = 70;

/// Towers must keep at least this much clearance from the path corridor.
pub const TOWER_FOOTPRINT: Fixed = fixed_int(15);

/// Minimum distance between two tower centres.
pub const TOWER_MIN_SPACING: Fixed = fixed_int(30);

/// Damage dealt to every live enemy by the rainbow special shot.
pub const RAINBOW_GLOBAL_DAMAGE: u32 = 50;

/// Damage multiplier of the burn special shot.
pub const BURN_DAMAGE_MULTIPLIER: u32 = 4;

/// Unique identifier for a tower within a match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct TowerId(pub u32);

/// Tower archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TowerKind {
    /// Cheap single-target shooter.
    Dart,
    /// Slow splash damage.
    Bomb,
    /// Slows everything around the impact.
    Ice,
    /// Long range, heavy single hits.
    Sniper,
    /// Bonus tower with a rotating special shot. Locked until earned.
    Rainbow,
}

/// Per-level stat increments for an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeSteps {
    /// Added to range per range upgrade.
    pub range: Fixed,
    /// Added to damage per damage upgrade.
    pub damage: u32,
    /// Removed from the fire interval per rate upgrade.
    pub interval: u32,
}

/// Static stats for a tower archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TowerArchetype {
    /// Display name.
    pub name: &'static str,
    /// Purchase price.
    pub cost: u32,
    /// Targeting radius in world units.
    pub range: Fixed,
    /// Damage per projectile.
    pub damage: u32,
    /// Ticks between shots.
    pub fire_interval: u32,
    /// Projectile speed in world units per tick.
    pub projectile_speed: Fixed,
    /// Shape of a regular shot.
    pub shape: DamageShape,
    /// Upgrade increments.
    pub steps: UpgradeSteps,
}

impl TowerKind {
    /// Every archetype, including the bonus tower.
    pub const ALL: [TowerKind; 5] = [
        TowerKind::Dart,
        TowerKind::Bomb,
        TowerKind::Ice,
        TowerKind::Sniper,
        TowerKind::Rainbow,
    ];

    /// The four archetypes available from the start.
    pub const BASE: [TowerKind; 4] = [
        TowerKind::Dart,
        TowerKind::Bomb,
        TowerKind::Ice,
        TowerKind::Sniper,
    ];

    /// Whether this kind must be unlocked before it can be selected.
    #[must_use]
    pub const fn is_bonus(self) -> bool {
        matches!(self, TowerKind::Rainbow)
    }

    /// Static stats for this archetype.
    #[must_use]
    pub const fn archetype(self) -> TowerArchetype {
        match self {
            TowerKind::Dart => TowerArchetype {
                name: "Dart",
                cost: 100,
                range: fixed_int(120),
                damage: 8,
                fire_interval: 30,
                projectile_speed: fixed_int(8),
                shape: DamageShape::Single,
                steps: UpgradeSteps {
                    range: fixed_int(15),
                    damage: 4,
                    interval: 3,
                },
            },
            TowerKind::Bomb => TowerArchetype {
                name: "Bomb",
                cost: 250,
                range: fixed_int(110),
                damage: 12,
                fire_interval: 60,
                projectile_speed: fixed_int(6),
                shape: DamageShape::Splash {
                    radius: fixed_int(50),
                },
                steps: UpgradeSteps {
                    range: fixed_int(15),
                    damage: 6,
                    interval: 6,
                },
            },
            TowerKind::Ice => TowerArchetype {
                name: "Ice",
                cost: 200,
                range: fixed_int(100),
                damage: 2,
                fire_interval: 45,
                projectile_speed: fixed_int(7),
                shape: DamageShape::Slow {
                    radius: fixed_int(60),
                    factor: fixed_ratio(1, 2),
                },
                steps: UpgradeSteps {
                    range: fixed_int(10),
                    damage: 1,
                    interval: 5,
                },
            },
            TowerKind::Sniper => TowerArchetype {
                name: "Sniper",
                cost: 350,
                range: fixed_int(300),
                damage: 40,
                fire_interval: 90,
                projectile_speed: fixed_int(16),
                shape: DamageShape::Single,
                steps: UpgradeSteps {
                    range: fixed_int(40),
                    damage: 20,
                    interval: 10,
                },
            },
            TowerKind::Rainbow => TowerArchetype {
                name: "Rainbow",
                cost: 1000,
                range: fixed_int(200),
                damage: 20,
                fire_interval: 20,
                projectile_speed: fixed_int(10),
                shape: DamageShape::Single,
                steps: UpgradeSteps {
                    range: fixed_int(20),
                    damage: 10,
                    interval: 2,
                },
            },
        }
    }

    /// Purchase price.
    #[must_use]
    pub const fn cost(self) -> u32 {
        self.archetype().cost
    }
}

/// How a tower picks among enemies in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetingPolicy {
    /// Furthest along the path.
    #[default]
    First,
    /// Least far along the path.
    Last,
    /// Most current hit points.
    Strong,
}

impl TargetingPolicy {
    /// Whether `candidate` beats the current `best`.
    ///
    /// Strict comparisons: on a tie the enemy seen first keeps the slot.
    fn prefers(self, candidate: &Enemy, best: &Enemy) -> bool {
        match self {
            TargetingPolicy::First => candidate.progress > best.progress,
            TargetingPolicy::Last => candidate.progress < best.progress,
            TargetingPolicy::Strong => candidate.health > best.health,
        }
    }
}

/// Independently upgradable tower stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeStat {
    /// Targeting radius.
    Range,
    /// Damage per shot.
    Damage,
    /// Shorter fire interval.
    FireRate,
}

impl UpgradeStat {
    /// Every stat.
    pub const ALL: [UpgradeStat; 3] = [
        UpgradeStat::Range,
        UpgradeStat::Damage,
        UpgradeStat::FireRate,
    ];

    /// Price per level of this stat.
    #[must_use]
    pub const fn cost_coefficient(self) -> u32 {
        match self {
            UpgradeStat::Range => 50,
            UpgradeStat::Damage => 75,
            UpgradeStat::FireRate => 60,
        }
    }
}

/// Special shots of the rainbow tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialShot {
    /// Fixed damage to every live enemy.
    Rainbow,
    /// Multiplied single-target damage.
    Burn,
    /// Map-scaled splash.
    Bomb,
}

/// Special shot schedule, checked in order. The first divisor that divides
/// the 1-based shot number wins.
pub const SPECIAL_CYCLE: [(u32, SpecialShot); 3] = [
    (10, SpecialShot::Rainbow),
    (4, SpecialShot::Burn),
    (2, SpecialShot::Bomb),
];

/// Special shot fired on the given 1-based shot number, if any.
#[must_use]
pub fn special_for_shot(shot_number: u32) -> Option<SpecialShot> {
    SPECIAL_CYCLE
        .iter()
        .find(|(divisor, _)| shot_number % divisor == 0)
        .map(|&(_, special)| special)
}

/// A projectile launch requested by a tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shot {
    /// Firing tower.
    pub source: TowerId,
    /// Enemy aimed at.
    pub target: EnemyId,
    /// Launch position.
    pub origin: Vec2Fixed,
    /// Projectile speed.
    pub speed: Fixed,
    /// Damage on impact.
    pub damage: u32,
    /// Impact shape.
    pub shape: DamageShape,
}

/// A placed tower.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tower {
    /// Identifier.
    pub id: TowerId,
    /// Archetype.
    pub kind: TowerKind,
    /// World position.
    pub position: Vec2Fixed,
    /// Current targeting radius.
    #[serde(with = "crate::math::fixed_serde")]
    pub range: Fixed,
    /// Current damage per shot.
    pub damage: u32,
    /// Current ticks between shots.
    pub fire_interval: u32,
    /// Ticks left before the tower may fire.
    pub cooldown: u32,
    /// Range upgrade level, starting at 1.
    pub range_level: u32,
    /// Damage upgrade level, starting at 1.
    pub damage_level: u32,
    /// Fire rate upgrade level, starting at 1.
    pub rate_level: u32,
    /// How targets are chosen.
    pub policy: TargetingPolicy,
    /// Shots fired so far.
    pub shots_fired: u32,
    /// Currency spent on upgrades.
    pub invested: u32,
}

impl Tower {
    /// Build a fresh tower of `kind` at `position`, ready to fire.
    #[must_use]
    pub fn new(id: TowerId, kind: TowerKind, position: Vec2Fixed) -> Self {
        let archetype = kind.archetype();
        Self {
            id,
            kind,
            position,
            range: archetype.range,
            damage: archetype.damage,
            fire_interval: archetype.fire_interval,
            cooldown: 0,
            range_level: 1,
            damage_level: 1,
            rate_level: 1,
            policy: TargetingPolicy::default(),
            shots_fired: 0,
            invested: 0,
        }
    }

    /// Current level of `stat`.
    #[must_use]
    pub const fn level(&self, stat: UpgradeStat) -> u32 {
        match stat {
            UpgradeStat::Range => self.range_level,
            UpgradeStat::Damage => self.damage_level,
            UpgradeStat::FireRate => self.rate_level,
        }
    }

    /// Price of the next upgrade of `stat`.
    #[must_use]
    pub const fn upgrade_cost(&self, stat: UpgradeStat) -> u32 {
        self.level(stat) * stat.cost_coefficient()
    }

    /// Apply one level of `stat`, recording `cost` as invested.
    ///
    /// Payment is the caller's job.
    pub fn apply_upgrade(&mut self, stat: UpgradeStat, cost: u32) {
        let steps = self.kind.archetype().steps;
        match stat {
            UpgradeStat::Range => {
                self.range += steps.range;
                self.range_level += 1;
            }
            UpgradeStat::Damage => {
                self.damage += steps.damage;
                self.damage_level += 1;
            }
            UpgradeStat::FireRate => {
                self.fire_interval = self
                    .fire_interval
                    .saturating_sub(steps.interval)
                    .max(MIN_FIRE_INTERVAL);
                self.rate_level += 1;
            }
        }
        self.invested += cost;
    }

    /// Currency returned if this tower is sold now.
    #[must_use]
    pub const fn sell_value(&self) -> u32 {
        (self.kind.cost() + self.invested) * SELL_REFUND_PERCENT / 100
    }

    /// Pick a target among `enemies` according to the current policy.
    ///
    /// Only live enemies within range are considered.
    #[must_use]
    pub fn select_target<'a>(&self, enemies: &'a [Enemy]) -> Option<&'a Enemy> {
        enemies
            .iter()
            .filter(|enemy| enemy.is_live() && self.position.within(enemy.position, self.range))
            .fold(None, |best, candidate| match best {
                Some(current) if !self.policy.prefers(candidate, current) => Some(current),
                _ => Some(candidate),
            })
    }

    /// Run one tick of the firing state machine.
    ///
    /// Counts the cooldown down if it is running. Otherwise looks for a
    /// target; with none in range the tower stays ready. `bomb_radius` sizes
    /// the rainbow tower's map-wide splash.
    pub fn update(&mut self, enemies: &[Enemy], bomb_radius: Fixed) -> Option<Shot> {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return None;
        }

        let target = self.select_target(enemies)?.id;
        self.shots_fired += 1;
        self.cooldown = self.fire_interval;

        let (damage, shape) = self.payload(bomb_radius);
        Some(Shot {
            source: self.id,
            target,
            origin: self.position,
            speed: self.kind.archetype().projectile_speed,
            damage,
            shape,
        })
    }

    /// Damage and shape of the shot just counted in `shots_fired`.
    fn payload(&self, bomb_radius: Fixed) -> (u32, DamageShape) {
        if self.kind != TowerKind::Rainbow {
            return (self.damage, self.kind.archetype().shape);
        }
        match special_for_shot(self.shots_fired) {
            Some(SpecialShot::Rainbow) => (RAINBOW_GLOBAL_DAMAGE, DamageShape::Global),
            Some(SpecialShot::Burn) => (self.damage * BURN_DAMAGE_MULTIPLIER, DamageShape::Burn),
            Some(SpecialShot::Bomb) => (self.damage, DamageShape::Splash { radius: bomb_radius }),
            None => (self.damage, DamageShape::Single),
        }
    }
}
