//! Scenario loading and configuration.
//!
//! A scenario names a map, carries the match configuration and picks the
//! default strategy and tick budget for automated play.

use std::path::Path;

use serde::{Deserialize, Serialize};
use td_core::prelude::{Game, GameConfig, GameError, MapCatalog, UnlockStore, DEFAULT_MAP};
use thiserror::Error;

/// Tick budget used when a scenario does not set one: an hour of play at
/// 60 ticks per second.
pub const DEFAULT_MAX_TICKS: u64 = 60 * 60 * 60;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario does not describe a playable match.
    #[error("Scenario is not playable: {0}")]
    Game(#[from] GameError),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Map name in the catalog.
    #[serde(default = "default_map")]
    pub map: String,
    /// Match configuration.
    #[serde(default)]
    pub config: GameConfig,
    /// Strategy used for automated play unless overridden.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Tick budget for automated play.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

fn default_map() -> String {
    DEFAULT_MAP.to_string()
}

fn default_strategy() -> String {
    "balanced".to_string()
}

fn default_max_ticks() -> u64 {
    DEFAULT_MAX_TICKS
}

impl Default for Scenario {
    fn default() -> Self {
        Self::standard()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Built-in scenario by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::standard()),
            "endless" => Some(Self::endless()),
            "serpent" => Some(Self::serpent()),
            _ => None,
        }
    }

    /// A built-in scenario name, or else a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Some(scenario) => Ok(scenario),
            None => Self::load(name_or_path),
        }
    }

    /// Twenty scripted waves on the default map.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            description: "Twenty scripted waves on the meadow".to_string(),
            map: default_map(),
            config: GameConfig::default(),
            strategy: default_strategy(),
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }

    /// Endless play on the default map, stopped by the tick budget.
    #[must_use]
    pub fn endless() -> Self {
        Self {
            name: "endless".to_string(),
            description: "Endless waves until the base falls".to_string(),
            config: GameConfig {
                endless: true,
                ..GameConfig::default()
            },
            ..Self::standard()
        }
    }

    /// Standard rules on the winding serpent map.
    #[must_use]
    pub fn serpent() -> Self {
        Self {
            name: "serpent".to_string(),
            description: "Twenty scripted waves on the serpent".to_string(),
            map: "serpent".to_string(),
            ..Self::standard()
        }
    }

    /// Start a match for this scenario with maps from `catalog`.
    pub fn build_game<S: UnlockStore>(
        &self,
        catalog: &MapCatalog,
        store: S,
    ) -> Result<Game<S>, ScenarioError> {
        let map = catalog.get(&self.map)?;
        let game = Game::with_map(self.config.clone(), map, store)?;
        tracing::debug!(scenario = %self.name, map = %self.map, "Scenario loaded");
        Ok(game)
    }
}
