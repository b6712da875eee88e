//! Projectile flight and impact resolution.
//!
//! Projectiles home on an [`EnemyId`]. The handle is looked up again every
//! tick; if the enemy is gone the projectile is dropped without effect.

use serde::{Deserialize, Serialize};

use crate::enemies::{Enemy, EnemyId, EnemyKind};
use crate::math::{fixed_int, Fixed, Vec2Fixed};
use crate::towers::TowerId;

/// Projectiles closer than this to their target always connect, however
/// slow they are.
pub const MIN_HIT_DISTANCE: Fixed = fixed_int(10);

/// Unique identifier for a projectile within a match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ProjectileId(pub u32);

/// What a projectile does on impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageShape {
    /// Damage the target only.
    Single,
    /// Damage every live enemy within `radius` of the impact.
    Splash {
        /// Blast radius.
        #[serde(with = "crate::math::fixed_serde")]
        radius: Fixed,
    },
    /// Damage every live enemy on the field.
    Global,
    /// Damage the target only; carries boosted damage.
    Burn,
    /// Damage the target, then slow every live enemy within `radius`.
    Slow {
        /// Slow radius.
        #[serde(with = "crate::math::fixed_serde")]
        radius: Fixed,
        /// Speed cap as a fraction of base speed.
        #[serde(with = "crate::math::fixed_serde")]
        factor: Fixed,
    },
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    /// Identifier.
    pub id: ProjectileId,
    /// Tower that fired it.
    pub source: TowerId,
    /// Enemy it homes on.
    pub target: EnemyId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Travel per tick.
    #[serde(with = "crate::math::fixed_serde")]
    pub speed: Fixed,
    /// Damage on impact.
    pub damage: u32,
    /// Impact shape.
    pub shape: DamageShape,
}

/// An enemy killed by a projectile impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kill {
    /// Killed enemy.
    pub enemy: EnemyId,
    /// Its archetype.
    pub kind: EnemyKind,
    /// Archetype reward, before the cash multiplier.
    pub base_reward: u32,
    /// Tower whose projectile landed the blow.
    pub source: TowerId,
}

/// Result of one projectile resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionOutcome {
    /// Enemies killed this pass, in impact order.
    pub kills: Vec<Kill>,
    /// Projectiles that landed.
    pub impacts: u32,
    /// Projectiles dropped because their target was gone.
    pub fizzled: u32,
}

/// Advance every projectile one tick and resolve impacts.
///
/// Processes projectiles in order; each one either keeps flying, lands and
/// is removed, or is dropped because its target is no longer live.
pub fn resolve_projectiles(
    projectiles: &mut Vec<Projectile>,
    enemies: &mut [Enemy],
) -> ResolutionOutcome {
    let mut outcome = ResolutionOutcome::default();

    projectiles.retain_mut(|projectile| {
        let Some(index) = enemies
            .iter()
            .position(|enemy| enemy.id == projectile.target && enemy.is_live())
        else {
            outcome.fizzled += 1;
            return false;
        };

        let target_position = enemies[index].position;
        let reach = projectile.speed.max(MIN_HIT_DISTANCE);
        if !projectile.position.within(target_position, reach) {
            projectile.position = projectile
                .position
                .move_toward(target_position, projectile.speed);
            return true;
        }

        projectile.position = target_position;
        apply_impact(projectile, index, enemies, &mut outcome.kills);
        outcome.impacts += 1;
        false
    });

    outcome
}

/// Apply a landed projectile's damage according to its shape.
fn apply_impact(
    projectile: &Projectile,
    target: usize,
    enemies: &mut [Enemy],
    kills: &mut Vec<Kill>,
) {
    let impact = projectile.position;
    let mut hit = |enemy: &mut Enemy| {
        if enemy.apply_damage(projectile.damage) {
            kills.push(Kill {
                enemy: enemy.id,
                kind: enemy.kind,
                base_reward: enemy.reward(),
                source: projectile.source,
            });
        }
    };

    match projectile.shape {
        DamageShape::Single | DamageShape::Burn => hit(&mut enemies[target]),
        DamageShape::Splash { radius } => {
            for enemy in enemies
                .iter_mut()
                .filter(|enemy| enemy.is_live() && enemy.position.within(impact, radius))
            {
                hit(enemy);
            }
        }
        DamageShape::Global => {
            for enemy in enemies.iter_mut().filter(|enemy| enemy.is_live()) {
                hit(enemy);
            }
        }
        DamageShape::Slow { radius, factor } => {
            hit(&mut enemies[target]);
            for enemy in enemies
                .iter_mut()
                .filter(|enemy| enemy.is_live() && enemy.position.within(impact, radius))
            {
                enemy.apply_slow(factor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathCurve;

    fn line() -> PathCurve {
        PathCurve::build(&[Vec2Fixed::from_ints(0, 100), Vec2Fixed::from_ints(600, 100)]).unwrap()
    }

    fn enemy_at(id: u32, kind: EnemyKind, x: i32, curve: &PathCurve) -> Enemy {
        let mut enemy = Enemy::spawn(EnemyId(id), kind, false, curve);
        enemy.position = Vec2Fixed::from_ints(x, 100);
        enemy
    }

    fn projectile(target: u32, at: Vec2Fixed, damage: u32, shape: DamageShape) -> Projectile {
        Projectile {
            id: ProjectileId(1),
            source: TowerId(1),
            target: EnemyId(target),
            position: at,
            speed: Fixed::from_num(8),
            damage,
            shape,
        }
    }

    #[test]
    fn test_stale_target_is_discarded() {
        let curve = line();
        let mut enemies = vec![enemy_at(1, EnemyKind::Red, 100, &curve)];
        enemies[0].dead = true;
        let mut projectiles = vec![
            projectile(1, Vec2Fixed::from_ints(100, 150), 8, DamageShape::Single),
            projectile(99, Vec2Fixed::from_ints(100, 150), 8, DamageShape::Single),
        ];

        let outcome = resolve_projectiles(&mut projectiles, &mut enemies);
        assert!(projectiles.is_empty());
        assert_eq!(outcome.fizzled, 2);
        assert!(outcome.kills.is_empty());
    }

    #[test]
    fn test_flies_then_lands() {
        let curve = line();
        let mut enemies = vec![enemy_at(1, EnemyKind::Red, 100, &curve)];
        let mut projectiles = vec![projectile(
            1,
            Vec2Fixed::from_ints(100, 130),
            8,
            DamageShape::Single,
        )];

        let outcome = resolve_projectiles(&mut projectiles, &mut enemies);
        assert_eq!(outcome.impacts, 0);
        let remaining = projectiles[0].position.distance(enemies[0].position);
        assert!((remaining - Fixed::from_num(22)).abs() < Fixed::from_num(0.001));

        for _ in 0..3 {
            resolve_projectiles(&mut projectiles, &mut enemies);
        }
        assert!(projectiles.is_empty());
        assert_eq!(enemies[0].health, 12);
    }

    #[test]
    fn test_splash_hits_only_within_radius() {
        let curve = line();
        let mut enemies = vec![
            enemy_at(1, EnemyKind::Black, 100, &curve),
            enemy_at(2, EnemyKind::Black, 140, &curve),
            enemy_at(3, EnemyKind::Black, 300, &curve),
        ];
        let mut projectiles = vec![projectile(
            1,
            Vec2Fixed::from_ints(100, 105),
            12,
            DamageShape::Splash {
                radius: Fixed::from_num(50),
            },
        )];

        let outcome = resolve_projectiles(&mut projectiles, &mut enemies);
        assert_eq!(outcome.impacts, 1);
        assert_eq!(enemies[0].health, 188);
        assert_eq!(enemies[1].health, 188);
        assert_eq!(enemies[2].health, 200);
    }

    #[test]
    fn test_global_hits_everything_live() {
        let curve = line();
        let mut enemies = vec![
            enemy_at(1, EnemyKind::Red, 100, &curve),
            enemy_at(2, EnemyKind::Red, 500, &curve),
            enemy_at(3, EnemyKind::Black, 580, &curve),
        ];
        enemies[2].reached_end = true;
        let mut projectiles = vec![projectile(
            1,
            Vec2Fixed::from_ints(100, 100),
            50,
            DamageShape::Global,
        )];

        let outcome = resolve_projectiles(&mut projectiles, &mut enemies);
        assert_eq!(outcome.kills.len(), 2);
        assert_eq!(enemies[2].health, 200);
    }

    #[test]
    fn test_slow_damages_target_and_slows_area() {
        let curve = line();
        let mut enemies = vec![
            enemy_at(1, EnemyKind::Pink, 100, &curve),
            enemy_at(2, EnemyKind::Pink, 150, &curve),
            enemy_at(3, EnemyKind::Pink, 400, &curve),
        ];
        let mut projectiles = vec![projectile(
            1,
            Vec2Fixed::from_ints(100, 100),
            2,
            DamageShape::Slow {
                radius: Fixed::from_num(60),
                factor: Fixed::from_num(0.5),
            },
        )];

        resolve_projectiles(&mut projectiles, &mut enemies);
        assert_eq!(enemies[0].health, 88);
        assert_eq!(enemies[1].health, 90);
        assert_eq!(enemies[0].speed, Fixed::from_num(1.5));
        assert_eq!(enemies[1].speed, Fixed::from_num(1.5));
        assert_eq!(enemies[2].speed, Fixed::from_num(3));
    }

    #[test]
    fn test_kill_reported_once_across_projectiles() {
        let curve = line();
        let mut enemies = vec![enemy_at(1, EnemyKind::Red, 100, &curve)];
        let at = Vec2Fixed::from_ints(100, 100);
        let mut projectiles = vec![
            projectile(1, at, 20, DamageShape::Single),
            projectile(1, at, 20, DamageShape::Single),
        ];

        let outcome = resolve_projectiles(&mut projectiles, &mut enemies);
        assert_eq!(outcome.kills.len(), 1);
        assert_eq!(outcome.kills[0].base_reward, 10);
        assert_eq!(outcome.fizzled, 1);
    }
}
