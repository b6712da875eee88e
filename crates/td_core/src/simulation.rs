//! Core simulation loop.
//!
//! [`Game`] owns one match and advances it with [`Game::tick`], a single
//! ordered pipeline:
//!
//! 1. Spawn from the wave queue
//! 2. Enemy motion
//! 3. Tower targeting and firing
//! 4. Projectile flight and impacts (kill rewards paid here)
//! 5. Pruning: leaks damage the base, dead and leaked enemies are removed
//! 6. Wave completion
//! 7. Progression: achievements and the bonus unlock
//!
//! Player actions live in [`crate::player_facade`] and run between ticks.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::data::{MapCatalog, MapData};
use crate::economy::{EconomyState, WaveCompletion};
use crate::enemies::{Enemy, EnemyId, EnemyKind};
use crate::error::{ActionError, Result};
use crate::math::Fixed;
use crate::path::PathCurve;
use crate::projectiles::{resolve_projectiles, Projectile, ProjectileId};
use crate::towers::{Tower, TowerId, TowerKind};
use crate::unlock::{Achievements, MemoryUnlockStore, UnlockStore};
use crate::waves::{Spawner, WaveDefinition, WaveTable};

/// A projectile launched this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotEvent {
    /// Firing tower.
    pub tower: TowerId,
    /// Enemy aimed at.
    pub target: EnemyId,
    /// New projectile.
    pub projectile: ProjectileId,
}

/// An enemy killed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillEvent {
    /// Killed enemy.
    pub enemy: EnemyId,
    /// Its archetype.
    pub kind: EnemyKind,
    /// Tower credited with the kill.
    pub tower: TowerId,
    /// Currency granted, multiplier applied.
    pub reward: u32,
}

/// An enemy that reached the base this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakEvent {
    /// Leaked enemy.
    pub enemy: EnemyId,
    /// Base damage dealt.
    pub damage: u32,
    /// The leak cost a life.
    pub life_lost: bool,
}

/// Events generated during a simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Enemies that entered the path.
    pub spawned: Vec<EnemyId>,
    /// Projectiles fired.
    pub shots: Vec<ShotEvent>,
    /// Enemies killed.
    pub kills: Vec<KillEvent>,
    /// Enemies that reached the base.
    pub leaks: Vec<LeakEvent>,
    /// Projectiles dropped because their target was gone.
    pub fizzled: u32,
    /// Set on the tick the running wave finished.
    pub wave_completed: Option<WaveCompletion>,
    /// The bonus tower was unlocked on this tick.
    pub bonus_unlocked: bool,
    /// The match was lost on this tick.
    pub defeat: bool,
    /// The match was won on this tick.
    pub victory: bool,
}

/// Everything that belongs to one match. Restarting replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchState {
    /// Ticks simulated so far.
    pub tick: u64,
    /// Currency, base, lives and wave progress.
    pub economy: EconomyState,
    /// Live enemies in spawn order.
    pub enemies: Vec<Enemy>,
    /// Placed towers in placement order.
    pub towers: Vec<Tower>,
    /// Projectiles in flight in launch order.
    pub projectiles: Vec<Projectile>,
    /// Pending spawns of the running wave.
    pub spawner: Spawner,
    /// Per-match achievement progress.
    pub achievements: Achievements,
    /// Tower highlighted by the player, if any.
    pub selected_tower: Option<TowerId>,
    /// Kind placed by `place_selected_tower`.
    pub selected_kind: TowerKind,
    next_enemy_id: u32,
    next_tower_id: u32,
    next_projectile_id: u32,
}

impl MatchState {
    /// Fresh match under `config`.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        Self {
            tick: 0,
            economy: EconomyState::new(config),
            enemies: Vec::new(),
            towers: Vec::new(),
            projectiles: Vec::new(),
            spawner: Spawner::new(config.spawn_interval),
            achievements: Achievements::default(),
            selected_tower: None,
            selected_kind: TowerKind::Dart,
            next_enemy_id: 1,
            next_tower_id: 1,
            next_projectile_id: 1,
        }
    }

    fn allocate_enemy_id(&mut self) -> EnemyId {
        let id = EnemyId(self.next_enemy_id);
        self.next_enemy_id += 1;
        id
    }

    pub(crate) fn allocate_tower_id(&mut self) -> TowerId {
        let id = TowerId(self.next_tower_id);
        self.next_tower_id += 1;
        id
    }

    fn allocate_projectile_id(&mut self) -> ProjectileId {
        let id = ProjectileId(self.next_projectile_id);
        self.next_projectile_id += 1;
        id
    }
}

/// A tower-defense match on one map.
///
/// Generic over the unlock store so callers decide where the bonus unlock
/// is persisted.
#[derive(Debug, Clone)]
pub struct Game<S: UnlockStore = MemoryUnlockStore> {
    pub(crate) config: GameConfig,
    pub(crate) curve: PathCurve,
    pub(crate) waves: WaveTable,
    pub(crate) store: S,
    pub(crate) bonus_unlocked: bool,
    pub(crate) state: MatchState,
}

impl Game<MemoryUnlockStore> {
    /// Default configuration on the default built-in map, with an in-memory
    /// unlock store.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in catalog is broken.
    pub fn with_defaults() -> Result<Self> {
        let catalog = MapCatalog::builtin();
        let map = catalog.get(crate::data::DEFAULT_MAP)?;
        Self::with_map(GameConfig::default(), map, MemoryUnlockStore::new())
    }
}

impl<S: UnlockStore> Game<S> {
    /// Start a match on a prebuilt curve.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GameError::InvalidConfig`] for unusable
    /// configuration values.
    pub fn new(config: GameConfig, curve: PathCurve, store: S) -> Result<Self> {
        config.validate()?;
        let bonus_unlocked = store.is_unlocked();
        Ok(Self {
            waves: WaveTable::new(config.scripted_waves),
            state: MatchState::new(&config),
            config,
            curve,
            store,
            bonus_unlocked,
        })
    }

    /// Start a match on `map`.
    ///
    /// # Errors
    ///
    /// Fails on a degenerate map or invalid configuration.
    pub fn with_map(config: GameConfig, map: &MapData, store: S) -> Result<Self> {
        let curve = map.build_curve()?;
        Self::new(config, curve, store)
    }

    /// Throw the current match away and start a fresh one on the same map.
    ///
    /// The bonus unlock survives; it belongs to the store, not the match.
    pub fn restart(&mut self) {
        self.state = MatchState::new(&self.config);
        tracing::debug!("Match restarted");
    }

    /// Match configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Path enemies walk along.
    #[must_use]
    pub fn curve(&self) -> &PathCurve {
        &self.curve
    }

    /// Economy and progression.
    #[must_use]
    pub fn economy(&self) -> &EconomyState {
        &self.state.economy
    }

    /// Live enemies in spawn order.
    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.state.enemies
    }

    /// Placed towers in placement order.
    #[must_use]
    pub fn towers(&self) -> &[Tower] {
        &self.state.towers
    }

    /// Look a tower up by id.
    #[must_use]
    pub fn tower(&self, id: TowerId) -> Option<&Tower> {
        self.state.towers.iter().find(|tower| tower.id == id)
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.state.projectiles
    }

    /// Ticks simulated in this match.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.state.tick
    }

    /// Whole match state, read-only.
    #[must_use]
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Achievement progress for this match.
    #[must_use]
    pub fn achievements(&self) -> &Achievements {
        &self.state.achievements
    }

    /// Whether the bonus tower can be selected.
    #[must_use]
    pub fn is_bonus_unlocked(&self) -> bool {
        self.bonus_unlocked
    }

    /// The injected unlock store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Contents of the wave `start_wave` would launch next.
    #[must_use]
    pub fn next_wave(&self) -> WaveDefinition {
        self.waves.definition(self.state.economy.wave + 1)
    }

    /// Enemies still queued in the running wave.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.state.spawner.pending()
    }

    /// Put an enemy on the path outside the wave schedule.
    ///
    /// Scripting hook for headless sessions and tests. The enemy starts at
    /// `progress` and is treated like any other.
    pub fn inject_enemy(&mut self, kind: EnemyKind, is_boss: bool, progress: Fixed) -> EnemyId {
        let id = self.state.allocate_enemy_id();
        let mut enemy = Enemy::spawn(id, kind, is_boss, &self.curve);
        enemy.progress = progress.clamp(Fixed::ZERO, Fixed::from_num(1));
        enemy.position = self.curve.position_at_progress(enemy.progress);
        self.state.enemies.push(enemy);
        id
    }

    /// Launch the next wave.
    pub(crate) fn launch_wave(&mut self) -> std::result::Result<u32, ActionError> {
        let wave = self.state.economy.begin_wave()?;
        let definition = self.waves.definition(wave);
        self.state.spawner.load(&definition);
        tracing::debug!(
            wave,
            enemies = definition.enemy_count(),
            boss = ?definition.boss,
            "Wave started"
        );
        Ok(wave)
    }

    /// Advance the simulation by one tick.
    ///
    /// Does nothing once the match has ended.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();
        if self.state.economy.is_over() {
            return events;
        }

        // 1. Spawn
        self.run_spawn_system(&mut events);

        // 2. Motion
        for enemy in &mut self.state.enemies {
            enemy.advance(&self.curve);
        }

        // 3. Targeting and firing
        self.run_tower_system(&mut events);

        // 4. Projectiles
        self.run_projectile_system(&mut events);

        // 5. Pruning
        self.run_prune_system(&mut events);

        // 6. Wave completion, 7. progression
        self.run_wave_completion_system(&mut events);

        self.state.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.state.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    fn run_spawn_system(&mut self, events: &mut TickEvents) {
        if !self.state.economy.wave_active {
            return;
        }
        if let Some(entry) = self.state.spawner.tick() {
            let id = self.state.allocate_enemy_id();
            self.state
                .enemies
                .push(Enemy::spawn(id, entry.kind, entry.is_boss, &self.curve));
            events.spawned.push(id);
        }
    }

    fn run_tower_system(&mut self, events: &mut TickEvents) {
        let bomb_radius = self.config.bomb_radius();
        for index in 0..self.state.towers.len() {
            let Some(shot) = self.state.towers[index].update(&self.state.enemies, bomb_radius)
            else {
                continue;
            };
            let id = self.state.allocate_projectile_id();
            self.state.projectiles.push(Projectile {
                id,
                source: shot.source,
                target: shot.target,
                position: shot.origin,
                speed: shot.speed,
                damage: shot.damage,
                shape: shot.shape,
            });
            events.shots.push(ShotEvent {
                tower: shot.source,
                target: shot.target,
                projectile: id,
            });
        }
    }

    fn run_projectile_system(&mut self, events: &mut TickEvents) {
        let outcome = resolve_projectiles(&mut self.state.projectiles, &mut self.state.enemies);
        events.fizzled = outcome.fizzled;

        for kill in outcome.kills {
            let reward = self.state.economy.grant_kill_reward(kill.base_reward);
            tracing::trace!(enemy = ?kill.enemy, kind = ?kill.kind, reward, "Enemy killed");
            events.kills.push(KillEvent {
                enemy: kill.enemy,
                kind: kill.kind,
                tower: kill.source,
                reward,
            });
        }
    }

    fn run_prune_system(&mut self, events: &mut TickEvents) {
        let economy = &mut self.state.economy;
        for enemy in self.state.enemies.iter().filter(|e| e.reached_end && !e.dead) {
            let outcome = economy.record_leak(enemy.leak_damage());
            tracing::trace!(enemy = ?enemy.id, damage = outcome.damage, "Enemy leaked");
            events.leaks.push(LeakEvent {
                enemy: enemy.id,
                damage: outcome.damage,
                life_lost: outcome.life_lost,
            });
        }
        self.state.enemies.retain(Enemy::is_live);

        if self.state.economy.game_over {
            events.defeat = true;
            tracing::info!(
                tick = self.state.tick,
                wave = self.state.economy.wave,
                "Match lost"
            );
        }
    }

    fn run_wave_completion_system(&mut self, events: &mut TickEvents) {
        let economy = &self.state.economy;
        if !economy.wave_active
            || economy.game_over
            || !self.state.spawner.is_empty()
            || !self.state.enemies.is_empty()
        {
            return;
        }

        let completion = self.state.economy.complete_wave();
        tracing::debug!(
            wave = completion.wave,
            multiplier_percent = completion.cash_multiplier_percent,
            "Wave complete"
        );
        events.wave_completed = Some(completion);

        let damage_taken = self.state.economy.damage_taken;
        self.state
            .achievements
            .on_wave_complete(completion.wave, damage_taken);
        if !self.bonus_unlocked && self.state.achievements.try_unlock(&mut self.store) {
            self.bonus_unlocked = true;
            events.bonus_unlocked = true;
            tracing::info!(wave = completion.wave, "Bonus tower unlocked");
        }

        if completion.victory {
            events.victory = true;
            tracing::info!(tick = self.state.tick, wave = completion.wave, "Match won");
        }
    }

    /// Calculate a deterministic hash of the match state.
    ///
    /// Two games fed the same actions on the same ticks hash identically.
    /// Used for determinism verification.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.state.tick.hash(&mut hasher);
        self.state.economy.hash(&mut hasher);

        // Entity lists are kept in creation order, which is itself
        // deterministic.
        self.state.enemies.len().hash(&mut hasher);
        for enemy in &self.state.enemies {
            enemy.hash(&mut hasher);
        }
        self.state.towers.len().hash(&mut hasher);
        for tower in &self.state.towers {
            tower.hash(&mut hasher);
        }
        self.state.projectiles.len().hash(&mut hasher);
        for projectile in &self.state.projectiles {
            projectile.hash(&mut hasher);
        }

        self.state.spawner.hash(&mut hasher);
        self.state.achievements.hash(&mut hasher);
        self.bonus_unlocked.hash(&mut hasher);

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2Fixed;
    use crate::player_facade::PlayerFacade;

    fn straight_game() -> Game {
        let curve =
            PathCurve::build(&[Vec2Fixed::from_ints(0, 300), Vec2Fixed::from_ints(800, 300)])
                .unwrap();
        Game::new(GameConfig::default(), curve, MemoryUnlockStore::new()).unwrap()
    }

    #[test]
    fn test_new_game_is_idle() {
        let mut game = straight_game();
        let events = game.tick();
        assert_eq!(events, TickEvents::default());
        assert_eq!(game.tick_count(), 1);
        assert!(game.enemies().is_empty());
    }

    #[test]
    fn test_first_spawn_on_next_tick() {
        let mut game = straight_game();
        game.start_wave().unwrap();
        let events = game.tick();
        assert_eq!(events.spawned.len(), 1);
        assert_eq!(game.pending_spawns(), 3);
    }

    #[test]
    fn test_wave_one_completes_with_defence() {
        let mut game = straight_game();
        game.place_tower(Vec2Fixed::from_ints(200, 350), TowerKind::Dart)
            .unwrap();
        game.place_tower(Vec2Fixed::from_ints(400, 350), TowerKind::Dart)
            .unwrap();
        game.start_wave().unwrap();

        let mut completion = None;
        for _ in 0..5_000 {
            let events = game.tick();
            if events.wave_completed.is_some() {
                completion = events.wave_completed;
                break;
            }
        }
        let completion = completion.expect("wave 1 should finish");
        assert_eq!(completion.wave, 1);
        assert!(!game.economy().wave_active);
        assert!(game.enemies().is_empty());
    }

    #[test]
    fn test_undefended_wave_leaks() {
        let mut game = straight_game();
        game.start_wave().unwrap();
        let mut leaks = 0;
        for _ in 0..5_000 {
            let events = game.tick();
            leaks += events.leaks.len();
            assert!(events.kills.is_empty());
            if events.wave_completed.is_some() {
                break;
            }
        }
        assert_eq!(leaks, 4);
        assert_eq!(game.economy().base_health, 96);
        assert_eq!(game.economy().currency, 650);
    }

    #[test]
    fn test_ticks_stop_after_defeat() {
        let mut game = straight_game();
        game.state.economy.base_health = 1;
        game.inject_enemy(EnemyKind::Red, false, Fixed::from_num(0.999));
        let events = game.tick();
        assert!(events.defeat);
        let tick = game.tick_count();
        assert_eq!(game.tick(), TickEvents::default());
        assert_eq!(game.tick_count(), tick);
    }

    #[test]
    fn test_restart_keeps_unlock() {
        let mut game = straight_game();
        game.bonus_unlocked = true;
        game.place_tower(Vec2Fixed::from_ints(200, 350), TowerKind::Dart)
            .unwrap();
        game.restart();
        assert!(game.towers().is_empty());
        assert_eq!(game.economy().currency, 650);
        assert!(game.is_bonus_unlocked());
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut a = straight_game();
        let mut b = straight_game();
        assert_eq!(a.state_hash(), b.state_hash());
        a.start_wave().unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
        b.start_wave().unwrap();
        for _ in 0..50 {
            a.tick();
            b.tick();
        }
        assert_eq!(a.state_hash(), b.state_hash());
    }
}
