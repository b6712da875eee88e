//! Property tests over random curves and random player scripts.

use td_core::prelude::{Fixed, PathCurve, Vec2Fixed};
use td_test_utils::fixtures::{config_with_currency, straight_game, straight_game_with};
use td_test_utils::proptest::prelude::*;
use td_test_utils::strategies::{
    apply_action, arb_control_points, arb_enemy_kind, arb_progress, arb_script, ActionOutcome,
};

fn distinct_points() -> impl Strategy<Value = Vec<Vec2Fixed>> {
    arb_control_points().prop_filter("needs two distinct points", |points| {
        points.len() >= 2 && points.windows(2).any(|w| w[0] != w[1])
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_curve_position_is_continuous(points in distinct_points(), t in arb_progress()) {
        let curve = PathCurve::build(&points).unwrap();
        let max_segment = curve
            .samples()
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .max()
            .unwrap_or(Fixed::ZERO);

        let step = curve.progress_per_segment() / Fixed::from_num(64);
        let next = (t + step).min(Fixed::from_num(1));
        let gap = curve.position_at_progress(t).distance(curve.position_at_progress(next));
        prop_assert!(gap <= max_segment / Fixed::from_num(32) + Fixed::from_num(0.01));
    }

    #[test]
    fn test_curve_starts_and_ends_on_control_points(points in distinct_points()) {
        let curve = PathCurve::build(&points).unwrap();
        prop_assert_eq!(curve.position_at_progress(Fixed::ZERO), points[0]);
        prop_assert_eq!(curve.position_at_progress(Fixed::from_num(1)), points[points.len() - 1]);
    }

    #[test]
    fn test_enemy_progress_never_decreases(kind in arb_enemy_kind(), start in arb_progress()) {
        let mut game = straight_game();
        let id = game.inject_enemy(kind, false, start);
        let mut last = start;
        for _ in 0..100 {
            game.tick();
            match game.enemies().iter().find(|e| e.id == id) {
                Some(enemy) => {
                    prop_assert!(enemy.progress >= last);
                    prop_assert!(enemy.progress <= Fixed::from_num(1));
                    last = enemy.progress;
                }
                None => break,
            }
        }
    }

    #[test]
    fn test_rejected_actions_change_nothing(script in arb_script(40)) {
        let mut game = straight_game();
        for action in &script {
            let before = game.state_hash();
            let currency = game.economy().currency;
            let tower_count = game.towers().len();
            if let ActionOutcome::Rejected(_) | ActionOutcome::NoTarget =
                apply_action(&mut game, action)
            {
                prop_assert_eq!(game.state_hash(), before);
                prop_assert_eq!(game.economy().currency, currency);
                prop_assert_eq!(game.towers().len(), tower_count);
            }
        }
    }

    #[test]
    fn test_scripts_replay_identically(script in arb_script(40)) {
        let mut first = straight_game_with(config_with_currency(5_000));
        let mut second = straight_game_with(config_with_currency(5_000));
        let outcomes_a: Vec<_> = script.iter().map(|a| apply_action(&mut first, a)).collect();
        let outcomes_b: Vec<_> = script.iter().map(|a| apply_action(&mut second, a)).collect();
        prop_assert_eq!(outcomes_a, outcomes_b);
        prop_assert_eq!(first.state_hash(), second.state_hash());
    }

    #[test]
    fn test_currency_only_moves_through_actions_and_kills(script in arb_script(40)) {
        let mut game = straight_game_with(config_with_currency(2_000));
        for action in &script {
            let before = i64::from(game.economy().currency);
            let outcome = apply_action(&mut game, action);
            let after = i64::from(game.economy().currency);
            match outcome {
                ActionOutcome::Ticked(events) => {
                    let rewards: i64 = events
                        .iter()
                        .flat_map(|e| e.kills.iter())
                        .map(|k| i64::from(k.reward))
                        .sum();
                    prop_assert_eq!(after - before, rewards);
                }
                ActionOutcome::Accepted => {}
                ActionOutcome::Rejected(_) | ActionOutcome::NoTarget => {
                    prop_assert_eq!(after, before);
                }
            }
        }
    }

    #[test]
    fn test_every_enemy_leaves_exactly_once(script in arb_script(40)) {
        let mut game = straight_game_with(config_with_currency(3_000));
        let mut gone = Vec::new();
        for action in &script {
            if let ActionOutcome::Ticked(events) = apply_action(&mut game, action) {
                for tick in &events {
                    gone.extend(tick.kills.iter().map(|k| k.enemy));
                    gone.extend(tick.leaks.iter().map(|l| l.enemy));
                }
            }
        }
        let total = gone.len();
        gone.sort_unstable();
        gone.dedup();
        prop_assert_eq!(gone.len(), total);
        for enemy in game.enemies() {
            prop_assert!(!gone.contains(&enemy.id));
            prop_assert!(enemy.health > 0);
        }
    }
}
