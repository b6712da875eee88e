//! Combat integration tests: targeting, projectiles, kills and leaks
//! through the full tick pipeline.

use td_core::prelude::*;
use td_test_utils::fixtures::{fixed_f, fortified_game, play_wave, straight_game, tick_until};

fn enemy(game: &Game, id: EnemyId) -> Option<&Enemy> {
    game.enemies().iter().find(|e| e.id == id)
}

#[test]
fn test_dart_kills_red_in_three_hits() {
    let mut game = straight_game();
    let dart = game
        .place_tower(Vec2Fixed::from_ints(400, 340), TowerKind::Dart)
        .unwrap();
    let red = game.inject_enemy(EnemyKind::Red, false, fixed_f(0.3));
    let currency_before = game.economy().currency;

    let mut health_seen = vec![20];
    let mut kill = None;
    for _ in 0..2_000 {
        let events = game.tick();
        if let Some(e) = enemy(&game, red) {
            health_seen.push(e.health);
        }
        if let Some(k) = events.kills.first() {
            kill = Some(*k);
            break;
        }
    }

    let kill = kill.expect("dart should kill the red");
    assert_eq!(kill.enemy, red);
    assert_eq!(kill.tower, dart);
    assert_eq!(kill.reward, 10);
    assert_eq!(game.tower(dart).unwrap().shots_fired, 3);
    assert_eq!(game.economy().currency, currency_before + 10);
    assert!(enemy(&game, red).is_none());

    // Hit points only ever go down, in steps of 8.
    assert!(health_seen.windows(2).all(|w| w[1] <= w[0]));
    let mut distinct = health_seen.clone();
    distinct.dedup();
    assert_eq!(distinct, vec![20, 12, 4]);
}

#[test]
fn test_kill_reward_uses_cash_multiplier() {
    let mut game = fortified_game();
    for _ in 0..3 {
        play_wave(&mut game, 20_000);
    }
    assert_eq!(game.economy().cash_multiplier_percent, 110);

    let currency_before = game.economy().currency;
    game.inject_enemy(EnemyKind::Red, false, fixed_f(0.2));
    let mut rewards = Vec::new();
    tick_until(&mut game, 2_000, |_, events| {
        rewards.extend(events.kills.iter().map(|k| k.reward));
        !rewards.is_empty()
    });

    assert_eq!(rewards, vec![11]);
    assert_eq!(game.economy().currency, currency_before + 11);
}

#[test]
fn test_leak_costs_one_base_health_and_pays_nothing() {
    let mut game = straight_game();
    let red = game.inject_enemy(EnemyKind::Red, false, fixed_f(0.9999));
    let events = game.tick();

    assert_eq!(events.leaks.len(), 1);
    assert_eq!(events.leaks[0].enemy, red);
    assert_eq!(events.leaks[0].damage, 1);
    assert!(events.kills.is_empty());
    assert_eq!(game.economy().base_health, 99);
    assert_eq!(game.economy().damage_taken, 1);
    assert_eq!(game.economy().currency, 650);
    assert!(game.enemies().is_empty());
}

#[test]
fn test_boss_leak_costs_ten() {
    let mut game = straight_game();
    game.inject_enemy(EnemyKind::Blue, true, fixed_f(0.9999));
    let events = game.tick();
    assert_eq!(events.leaks[0].damage, 10);
    assert_eq!(game.economy().base_health, 90);
}

#[test]
fn test_splash_only_damages_enemies_in_radius() {
    let mut game = straight_game();
    game.place_tower(Vec2Fixed::from_ints(400, 360), TowerKind::Bomb)
        .unwrap();
    let lead = game.inject_enemy(EnemyKind::Black, false, fixed_f(0.47));
    let front = game.inject_enemy(EnemyKind::Black, false, fixed_f(0.45));
    let beside = game.inject_enemy(EnemyKind::Black, false, fixed_f(0.45));
    let far = game.inject_enemy(EnemyKind::Black, false, fixed_f(0.05));
    let clustered = [lead, front, beside];

    tick_until(&mut game, 1_000, |game, _| {
        game.enemies().iter().any(|e| e.health < e.max_health)
    });
    for id in clustered {
        assert_eq!(enemy(&game, id).unwrap().health, 188);
    }
    assert_eq!(enemy(&game, far).unwrap().health, 200);

    // Second bomb lands and nothing is left in flight.
    tick_until(&mut game, 1_000, |game, _| {
        game.projectiles().is_empty()
            && clustered
                .iter()
                .all(|&id| enemy(game, id).is_some_and(|e| e.health <= 176))
    });
    for id in clustered {
        assert_eq!(enemy(&game, id).unwrap().health, 176);
    }
    assert_eq!(enemy(&game, far).unwrap().health, 200);
}

#[test]
fn test_ice_slows_then_speed_recovers() {
    let mut game = straight_game();
    let ice = game
        .place_tower(Vec2Fixed::from_ints(400, 360), TowerKind::Ice)
        .unwrap();
    let pink = game.inject_enemy(EnemyKind::Pink, false, fixed_f(0.4));

    tick_until(&mut game, 1_000, |game, _| {
        enemy(game, pink).is_some_and(|e| e.speed < e.base_speed)
    });
    let slowed = enemy(&game, pink).unwrap();
    assert_eq!(slowed.speed, Fixed::from_num(1.5));
    assert!(slowed.speed >= slowed.base_speed / Fixed::from_num(4));

    game.sell_tower(ice).unwrap();
    tick_until(&mut game, 200, |game, _| game.projectiles().is_empty());
    let before = enemy(&game, pink).unwrap().speed;
    for _ in 0..10 {
        game.tick();
    }
    let after = enemy(&game, pink).unwrap();
    assert!(after.speed > before || after.speed == after.base_speed);
}

#[test]
fn test_tower_respects_cooldown_under_load() {
    let mut game = straight_game();
    let sniper = game
        .place_tower(Vec2Fixed::from_ints(400, 360), TowerKind::Sniper)
        .unwrap();
    for i in 0..6 {
        game.inject_enemy(EnemyKind::Black, false, fixed_f(0.1 + 0.05 * f64::from(i)));
    }

    let mut shot_ticks = Vec::new();
    for tick in 0..600u32 {
        let events = game.tick();
        if events.shots.iter().any(|s| s.tower == sniper) {
            shot_ticks.push(tick);
            assert_eq!(game.tower(sniper).unwrap().cooldown, 90);
        }
    }

    assert!(shot_ticks.len() >= 3);
    assert!(shot_ticks.windows(2).all(|w| w[1] - w[0] > 90));
}

#[test]
fn test_killed_enemies_rewarded_once() {
    let mut game = fortified_game();
    let mut killed = Vec::new();
    let mut leaked = Vec::new();
    for _ in 0..4 {
        let summary = play_wave(&mut game, 20_000);
        killed.extend(summary.kills().map(|k| k.enemy));
        leaked.extend(summary.leaks().map(|l| l.enemy));
    }

    let total = killed.len();
    killed.sort_unstable();
    killed.dedup();
    assert_eq!(killed.len(), total, "an enemy was rewarded twice");
    assert!(leaked.iter().all(|id| !killed.contains(id)));
    assert!(game.enemies().is_empty());
}

#[test]
fn test_stale_projectiles_fizzle() {
    let mut game = straight_game();
    for x in [300, 340, 380] {
        game.place_tower(Vec2Fixed::from_ints(x, 400), TowerKind::Sniper)
            .unwrap_or_else(|_| panic!("placement at {x}"));
    }
    game.inject_enemy(EnemyKind::Red, false, fixed_f(0.35));

    let mut fizzled = 0;
    let mut kills = 0;
    tick_until(&mut game, 400, |_, events| {
        fizzled += events.fizzled;
        kills += events.kills.len();
        false
    });

    // Three snipers fire at once; the first 40-damage hit kills the red and
    // the other two projectiles lose their target.
    assert_eq!(kills, 1);
    assert_eq!(fizzled, 2);
    assert!(game.projectiles().is_empty());
}
