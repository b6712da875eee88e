//! # TD Core
//!
//! Deterministic tower-defense simulation core for Path Defense.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless runners and batch balance testing
//! - Any front end driving the same rules through [`player_facade::PlayerFacade`]
//! - Determinism testing via [`simulation::Game::state_hash`]
//!
//! ## Crate Structure
//!
//! - [`path`] - Path curve sampling and corridor queries
//! - [`enemies`] - Enemy archetypes and path-following motion
//! - [`towers`] - Tower archetypes, targeting and firing
//! - [`projectiles`] - Projectile flight and impact resolution
//! - [`waves`] - Wave composition and spawn pacing
//! - [`economy`] - Currency, base health, lives and wave progression
//! - [`unlock`] - Bonus tower achievements and the unlock store port
//! - [`simulation`] - The per-tick pipeline
//! - [`player_facade`] - Player actions
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod data;
pub mod economy;
pub mod enemies;
pub mod error;
pub mod math;
pub mod path;
pub mod player_facade;
pub mod projectiles;
pub mod simulation;
pub mod towers;
pub mod unlock;
pub mod waves;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::GameConfig;
    pub use crate::data::{MapCatalog, MapData, DEFAULT_MAP};
    pub use crate::economy::{EconomyState, WaveCompletion};
    pub use crate::enemies::{Enemy, EnemyId, EnemyKind};
    pub use crate::error::{ActionError, GameError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::path::PathCurve;
    pub use crate::player_facade::PlayerFacade;
    pub use crate::projectiles::{DamageShape, Projectile, ProjectileId};
    pub use crate::simulation::{Game, KillEvent, LeakEvent, MatchState, ShotEvent, TickEvents};
    pub use crate::towers::{TargetingPolicy, Tower, TowerId, TowerKind, UpgradeStat};
    pub use crate::unlock::{MemoryUnlockStore, UnlockStore};
    pub use crate::waves::WaveDefinition;
}
