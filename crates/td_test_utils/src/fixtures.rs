//! Test fixtures and helpers.
//!
//! Pre-built curves, games and wave drivers for consistent testing.

use fixed::types::I32F32;
use td_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Y coordinate of the straight test path.
pub const STRAIGHT_PATH_Y: i32 = 300;

/// Horizontal path across the default 800x600 map at `y = 300`.
///
/// # Panics
///
/// Never in practice; two control points always form a curve.
#[must_use]
pub fn straight_curve() -> PathCurve {
    PathCurve::build(&[
        Vec2Fixed::from_ints(0, STRAIGHT_PATH_Y),
        Vec2Fixed::from_ints(800, STRAIGHT_PATH_Y),
    ])
    .expect("two control points form a curve")
}

/// Default configuration with a custom starting balance.
#[must_use]
pub fn config_with_currency(currency: u32) -> GameConfig {
    GameConfig {
        starting_currency: currency,
        ..GameConfig::default()
    }
}

/// Fresh game on the straight path.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn straight_game_with(config: GameConfig) -> Game {
    Game::new(config, straight_curve(), MemoryUnlockStore::new()).expect("valid test config")
}

/// Fresh default game on the straight path.
#[must_use]
pub fn straight_game() -> Game {
    straight_game_with(GameConfig::default())
}

/// Game on the straight path with two rows of upgraded towers of every base
/// kind lining both sides. Nothing from the first ten waves gets through.
#[must_use]
pub fn fortified_game() -> Game {
    let mut game = straight_game_with(config_with_currency(100_000));
    fortify(&mut game);
    game
}

/// Line both sides of the straight path with upgraded towers.
///
/// # Panics
///
/// Panics if a placement or upgrade is rejected, which means the game was
/// not a fresh straight-path game with enough currency.
pub fn fortify(game: &mut impl PlayerFacade) {
    let kinds = [
        TowerKind::Dart,
        TowerKind::Sniper,
        TowerKind::Dart,
        TowerKind::Bomb,
        TowerKind::Ice,
    ];
    let mut slot = 0;
    for y in [STRAIGHT_PATH_Y - 50, STRAIGHT_PATH_Y + 50] {
        for x in (20..800).step_by(40) {
            let kind = kinds[slot % kinds.len()];
            slot += 1;
            let id = game
                .place_tower(Vec2Fixed::from_ints(x, y), kind)
                .expect("fortification placement");
            for stat in [UpgradeStat::Damage, UpgradeStat::FireRate] {
                for _ in 0..3 {
                    game.upgrade_tower(id, stat).expect("fortification upgrade");
                }
            }
        }
    }
}

/// What happened while a wave was played out.
#[derive(Debug, Clone, Default)]
pub struct WaveSummary {
    /// Ticks spent.
    pub ticks: u64,
    /// Every tick's events, in order.
    pub events: Vec<TickEvents>,
    /// Completion record, if the wave finished in time.
    pub completion: Option<WaveCompletion>,
}

impl WaveSummary {
    /// All kills across the wave.
    pub fn kills(&self) -> impl Iterator<Item = &KillEvent> {
        self.events.iter().flat_map(|e| e.kills.iter())
    }

    /// All leaks across the wave.
    pub fn leaks(&self) -> impl Iterator<Item = &LeakEvent> {
        self.events.iter().flat_map(|e| e.leaks.iter())
    }

    /// Ticks on which the bonus tower was unlocked.
    #[must_use]
    pub fn unlock_events(&self) -> usize {
        self.events.iter().filter(|e| e.bonus_unlocked).count()
    }
}

/// Start the next wave and tick until it completes, the match ends, or
/// `max_ticks` pass.
///
/// # Panics
///
/// Panics if the wave cannot be started.
pub fn play_wave<S: UnlockStore>(game: &mut Game<S>, max_ticks: u64) -> WaveSummary {
    game.start_wave().expect("wave should start");
    let mut summary = WaveSummary::default();
    while summary.ticks < max_ticks {
        let events = game.tick();
        summary.ticks += 1;
        let done = events.wave_completed;
        let over = events.defeat;
        summary.events.push(events);
        if done.is_some() {
            summary.completion = done;
            break;
        }
        if over {
            break;
        }
    }
    tracing::debug!(
        wave = game.economy().wave,
        ticks = summary.ticks,
        completed = summary.completion.is_some(),
        "Test wave finished"
    );
    summary
}

/// Tick until `condition` holds or `max_ticks` pass. Returns the ticks spent.
pub fn tick_until<S: UnlockStore>(
    game: &mut Game<S>,
    max_ticks: u64,
    mut condition: impl FnMut(&Game<S>, &TickEvents) -> bool,
) -> u64 {
    for tick in 1..=max_ticks {
        let events = game.tick();
        if condition(game, &events) {
            return tick;
        }
    }
    max_ticks
}
