//! Proptest strategies for simulation testing.
//!
//! These strategies generate random but reproducible inputs: positions,
//! archetypes, and whole player action scripts that can be replayed
//! against a [`Game`].

use proptest::prelude::*;
use td_core::prelude::*;

/// Generate a progress value in `[0, 1]` at 1/10000 resolution.
pub fn arb_progress() -> impl Strategy<Value = Fixed> {
    (0i32..=10_000).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(10_000))
}

/// Generate a position anywhere on the default 800x600 map.
pub fn arb_map_position() -> impl Strategy<Value = Vec2Fixed> {
    (0i32..=800, 0i32..=600).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
}

/// Generate a list of control points, possibly degenerate.
pub fn arb_control_points() -> impl Strategy<Value = Vec<Vec2Fixed>> {
    prop::collection::vec(arb_map_position(), 0..8)
}

/// Generate an enemy archetype.
pub fn arb_enemy_kind() -> impl Strategy<Value = EnemyKind> {
    prop::sample::select(EnemyKind::ALL.to_vec())
}

/// Generate a tower archetype, bonus tower included.
pub fn arb_tower_kind() -> impl Strategy<Value = TowerKind> {
    prop::sample::select(TowerKind::ALL.to_vec())
}

/// Generate an upgradable stat.
pub fn arb_upgrade_stat() -> impl Strategy<Value = UpgradeStat> {
    prop::sample::select(UpgradeStat::ALL.to_vec())
}

/// Generate a targeting policy.
pub fn arb_policy() -> impl Strategy<Value = TargetingPolicy> {
    prop_oneof![
        Just(TargetingPolicy::First),
        Just(TargetingPolicy::Last),
        Just(TargetingPolicy::Strong),
    ]
}

/// One scripted player action.
///
/// Towers are addressed by slot: the index into the current tower list,
/// wrapped, so scripts stay meaningful whatever earlier actions did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedAction {
    /// Place a tower.
    Place(Vec2Fixed, TowerKind),
    /// Upgrade the tower in a slot.
    Upgrade(usize, UpgradeStat),
    /// Sell the tower in a slot.
    Sell(usize),
    /// Retarget the tower in a slot.
    Target(usize, TargetingPolicy),
    /// Launch the next wave.
    StartWave,
    /// Buy a base upgrade.
    UpgradeBase,
    /// Advance this many ticks.
    Tick(u16),
}

/// Generate a single action, weighted toward placing and ticking.
pub fn arb_action() -> impl Strategy<Value = ScriptedAction> {
    prop_oneof![
        4 => (arb_map_position(), arb_tower_kind())
            .prop_map(|(pos, kind)| ScriptedAction::Place(pos, kind)),
        2 => (0usize..16, arb_upgrade_stat())
            .prop_map(|(slot, stat)| ScriptedAction::Upgrade(slot, stat)),
        1 => (0usize..16).prop_map(ScriptedAction::Sell),
        1 => (0usize..16, arb_policy())
            .prop_map(|(slot, policy)| ScriptedAction::Target(slot, policy)),
        2 => Just(ScriptedAction::StartWave),
        1 => Just(ScriptedAction::UpgradeBase),
        4 => (1u16..200).prop_map(ScriptedAction::Tick),
    ]
}

/// Generate an action script.
pub fn arb_script(max_len: usize) -> impl Strategy<Value = Vec<ScriptedAction>> {
    prop::collection::vec(arb_action(), 1..max_len)
}

/// What applying one action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action was accepted.
    Accepted,
    /// The action was rejected.
    Rejected(ActionError),
    /// The slot pointed at no tower.
    NoTarget,
    /// Ticks ran; their events are attached.
    Ticked(Vec<TickEvents>),
}

fn slot_id<S: UnlockStore>(game: &Game<S>, slot: usize) -> Option<TowerId> {
    let towers = game.towers();
    if towers.is_empty() {
        return None;
    }
    Some(towers[slot % towers.len()].id)
}

fn outcome<T>(result: std::result::Result<T, ActionError>) -> ActionOutcome {
    match result {
        Ok(_) => ActionOutcome::Accepted,
        Err(e) => ActionOutcome::Rejected(e),
    }
}

/// Apply one scripted action to a game.
pub fn apply_action<S: UnlockStore>(
    game: &mut Game<S>,
    action: &ScriptedAction,
) -> ActionOutcome {
    match *action {
        ScriptedAction::Place(pos, kind) => outcome(game.place_tower(pos, kind)),
        ScriptedAction::Upgrade(slot, stat) => match slot_id(game, slot) {
            Some(id) => outcome(game.upgrade_tower(id, stat)),
            None => ActionOutcome::NoTarget,
        },
        ScriptedAction::Sell(slot) => match slot_id(game, slot) {
            Some(id) => outcome(game.sell_tower(id)),
            None => ActionOutcome::NoTarget,
        },
        ScriptedAction::Target(slot, policy) => match slot_id(game, slot) {
            Some(id) => outcome(game.set_targeting_policy(id, policy)),
            None => ActionOutcome::NoTarget,
        },
        ScriptedAction::StartWave => outcome(game.start_wave()),
        ScriptedAction::UpgradeBase => outcome(game.upgrade_base()),
        ScriptedAction::Tick(n) => ActionOutcome::Ticked((0..n).map(|_| game.tick()).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::straight_game;

    proptest! {
        #[test]
        fn test_scripts_never_panic(script in arb_script(30)) {
            let mut game = straight_game();
            for action in &script {
                let _ = apply_action(&mut game, action);
            }
        }

        #[test]
        fn test_progress_in_unit_range(t in arb_progress()) {
            prop_assert!(t >= Fixed::ZERO);
            prop_assert!(t <= Fixed::from_num(1));
        }
    }

    #[test]
    fn test_slot_addressing_wraps() {
        let mut game = straight_game();
        assert_eq!(
            apply_action(&mut game, &ScriptedAction::Sell(3)),
            ActionOutcome::NoTarget
        );
        let place = ScriptedAction::Place(Vec2Fixed::from_ints(100, 400), TowerKind::Dart);
        assert_eq!(apply_action(&mut game, &place), ActionOutcome::Accepted);
        assert_eq!(
            apply_action(&mut game, &ScriptedAction::Target(7, TargetingPolicy::Last)),
            ActionOutcome::Accepted
        );
        assert_eq!(game.towers()[0].policy, TargetingPolicy::Last);
    }
}
