//! Enemy archetypes, live enemies, and path-following motion.
//!
//! Enemies never leave the curve: their state is a progress value in
//! `[0, 1]` and everything else (position, arrival) derives from it.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_int, fixed_ratio, Fixed, Vec2Fixed};
use crate::path::PathCurve;

/// Hit point multiplier applied to bosses.
pub const BOSS_HEALTH_MULTIPLIER: u32 = 10;

/// Bosses move at `1 / BOSS_SPEED_DIVISOR` of their archetype speed.
pub const BOSS_SPEED_DIVISOR: i32 = 3;

/// Base damage dealt by a normal enemy reaching the end of the path.
pub const LEAK_DAMAGE: u32 = 1;

/// Base damage dealt by a boss reaching the end of the path.
pub const BOSS_LEAK_DAMAGE: u32 = 10;

/// Speed regained per tick while slowed.
pub const SPEED_RECOVERY_PER_TICK: Fixed = fixed_ratio(1, 100);

/// Slow effects never push speed below this fraction of base speed.
pub const SLOW_FLOOR: Fixed = fixed_ratio(1, 4);

/// Unique identifier for an enemy within a match.
///
/// Projectiles hold these as non-owning handles and re-validate them every
/// tick, so a dead enemy can never be dereferenced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct EnemyId(pub u32);

/// Enemy archetypes, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Slow, fragile starter enemy.
    Red,
    /// Slightly faster and tougher.
    Blue,
    /// Mid-tier runner.
    Green,
    /// Fast.
    Yellow,
    /// Fastest archetype.
    Pink,
    /// Slow heavyweight.
    Black,
}

/// Static stats for an enemy archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyArchetype {
    /// Display name.
    pub name: &'static str,
    /// Movement speed in world units per tick.
    pub speed: Fixed,
    /// Hit points at spawn.
    pub health: u32,
    /// Currency granted on kill, before the cash multiplier.
    pub reward: u32,
    /// Visual radius; not used for collision.
    pub radius: Fixed,
}

impl EnemyKind {
    /// Every archetype, weakest first.
    pub const ALL: [EnemyKind; 6] = [
        EnemyKind::Red,
        EnemyKind::Blue,
        EnemyKind::Green,
        EnemyKind::Yellow,
        EnemyKind::Pink,
        EnemyKind::Black,
    ];

    /// Static stats for this archetype.
    #[must_use]
    pub const fn archetype(self) -> EnemyArchetype {
        match self {
            EnemyKind::Red => EnemyArchetype {
                name: "Red",
                speed: fixed_int(1),
                health: 20,
                reward: 10,
                radius: fixed_int(10),
            },
            EnemyKind::Blue => EnemyArchetype {
                name: "Blue",
                speed: fixed_ratio(7, 5),
                health: 35,
                reward: 15,
                radius: fixed_int(11),
            },
            EnemyKind::Green => EnemyArchetype {
                name: "Green",
                speed: fixed_ratio(9, 5),
                health: 50,
                reward: 20,
                radius: fixed_int(12),
            },
            EnemyKind::Yellow => EnemyArchetype {
                name: "Yellow",
                speed: fixed_ratio(5, 2),
                health: 70,
                reward: 30,
                radius: fixed_int(13),
            },
            EnemyKind::Pink => EnemyArchetype {
                name: "Pink",
                speed: fixed_int(3),
                health: 90,
                reward: 40,
                radius: fixed_int(13),
            },
            EnemyKind::Black => EnemyArchetype {
                name: "Black",
                speed: fixed_ratio(3, 2),
                health: 200,
                reward: 60,
                radius: fixed_int(15),
            },
        }
    }

    /// Position of this kind in [`EnemyKind::ALL`].
    #[must_use]
    pub fn tier(self) -> usize {
        Self::ALL.iter().position(|&k| k == self).unwrap_or(0)
    }
}

/// A live enemy walking the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enemy {
    /// Handle used by projectiles.
    pub id: EnemyId,
    /// Archetype.
    pub kind: EnemyKind,
    /// Amplified variant injected every fifth wave.
    pub is_boss: bool,
    /// Progress along the curve, `0` at spawn and `1` at the base.
    #[serde(with = "crate::math::fixed_serde")]
    pub progress: Fixed,
    /// Current speed; lowered by slows, recovers toward `base_speed`.
    #[serde(with = "crate::math::fixed_serde")]
    pub speed: Fixed,
    /// Unslowed speed.
    #[serde(with = "crate::math::fixed_serde")]
    pub base_speed: Fixed,
    /// Current hit points.
    pub health: u32,
    /// Hit points at spawn.
    pub max_health: u32,
    /// World position, derived from `progress`.
    pub position: Vec2Fixed,
    /// Walked off the end of the path this tick.
    pub reached_end: bool,
    /// Killed this tick.
    pub dead: bool,
}

impl Enemy {
    /// Create an enemy at the start of the curve.
    #[must_use]
    pub fn spawn(id: EnemyId, kind: EnemyKind, is_boss: bool, curve: &PathCurve) -> Self {
        let archetype = kind.archetype();
        let (health, speed) = if is_boss {
            (
                archetype.health * BOSS_HEALTH_MULTIPLIER,
                archetype.speed / Fixed::from_num(BOSS_SPEED_DIVISOR),
            )
        } else {
            (archetype.health, archetype.speed)
        };

        Self {
            id,
            kind,
            is_boss,
            progress: Fixed::ZERO,
            speed,
            base_speed: speed,
            health,
            max_health: health,
            position: curve.start(),
            reached_end: false,
            dead: false,
        }
    }

    /// Still on the field: neither killed nor through to the base.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        !self.dead && !self.reached_end
    }

    /// Damage dealt to the base if this enemy leaks.
    #[must_use]
    pub const fn leak_damage(&self) -> u32 {
        if self.is_boss {
            BOSS_LEAK_DAMAGE
        } else {
            LEAK_DAMAGE
        }
    }

    /// Currency granted for the kill, before the cash multiplier.
    #[must_use]
    pub const fn reward(&self) -> u32 {
        self.kind.archetype().reward
    }

    /// Subtract hit points. Returns `true` if this hit was the killing blow.
    ///
    /// Enemies that are already dead or gone ignore further damage, so a kill
    /// is reported exactly once.
    pub fn apply_damage(&mut self, amount: u32) -> bool {
        if !self.is_live() {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.dead = true;
            return true;
        }
        false
    }

    /// Cap speed at `factor` of base speed, never below [`SLOW_FLOOR`].
    ///
    /// Works from base speed, so repeated slows do not compound.
    pub fn apply_slow(&mut self, factor: Fixed) {
        let floor = self.base_speed * SLOW_FLOOR;
        let slowed = (self.base_speed * factor).max(floor);
        self.speed = self.speed.min(slowed);
    }

    /// Advance along the curve by one tick.
    ///
    /// The step is divided by the length of the sample segment the enemy is
    /// on, so on-screen speed stays constant whether samples are bunched up on
    /// a tight bend or spread out on a straight.
    pub fn advance(&mut self, curve: &PathCurve) {
        if !self.is_live() {
            return;
        }

        self.speed = (self.speed + SPEED_RECOVERY_PER_TICK).min(self.base_speed);

        let per_segment = curve.progress_per_segment();
        let segment_length = curve.segment_length_at(self.progress);
        let step = if segment_length > Fixed::ZERO {
            self.speed / segment_length * per_segment
        } else {
            per_segment
        };

        self.progress += step;
        if self.progress >= Fixed::from_num(1) {
            self.progress = Fixed::from_num(1);
            self.reached_end = true;
        }
        self.position = curve.position_at_progress(self.progress);
    }
}
