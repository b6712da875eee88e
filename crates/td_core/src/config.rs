//! Match configuration.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_sqrt, Fixed, Vec2Fixed};

/// Largest accepted map width or height.
pub const MAX_MAP_DIMENSION: u32 = 10_000;

/// Tunable match parameters.
///
/// Every field has a default, so a RON override only needs the fields it
/// changes: `(starting_currency: 2000, endless: true)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Currency at match start.
    pub starting_currency: u32,
    /// Lives at match start.
    pub starting_lives: u32,
    /// Base hit points at match start.
    pub base_health: u32,
    /// Ticks between spawns within a wave.
    pub spawn_interval: u32,
    /// Number of scripted waves; completing the last one wins unless endless.
    pub scripted_waves: u32,
    /// Keep generating waves past the scripted ones.
    pub endless: bool,
    /// Playable width in world units.
    pub map_width: u32,
    /// Playable height in world units.
    pub map_height: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_currency: 650,
            starting_lives: 3,
            base_health: 100,
            spawn_interval: 30,
            scripted_waves: 20,
            endless: false,
            map_width: 800,
            map_height: 600,
        }
    }
}

impl GameConfig {
    /// Parse a configuration from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed input and
    /// [`GameError::InvalidConfig`] when the values fail validation.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: "<config>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.spawn_interval == 0 {
            return Err(GameError::InvalidConfig(
                "spawn_interval must be at least 1".to_string(),
            ));
        }
        if self.scripted_waves == 0 {
            return Err(GameError::InvalidConfig(
                "scripted_waves must be at least 1".to_string(),
            ));
        }
        if self.base_health == 0 || self.starting_lives == 0 {
            return Err(GameError::InvalidConfig(
                "base_health and starting_lives must be positive".to_string(),
            ));
        }
        let valid_dimension = |d: u32| (1..=MAX_MAP_DIMENSION).contains(&d);
        if !valid_dimension(self.map_width) || !valid_dimension(self.map_height) {
            return Err(GameError::InvalidConfig(
                "map dimensions must be between 1 and 10000".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `point` lies inside the playable area.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        point.x >= Fixed::ZERO
            && point.y >= Fixed::ZERO
            && point.x <= Fixed::from_num(self.map_width)
            && point.y <= Fixed::from_num(self.map_height)
    }

    /// Splash radius of the rainbow tower's bomb shot: a quarter of the
    /// square root of the map area.
    #[must_use]
    pub fn bomb_radius(&self) -> Fixed {
        let area = Fixed::from_num(self.map_width) * Fixed::from_num(self.map_height);
        fixed_sqrt(area / Fixed::from_num(16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_override() {
        let config = GameConfig::from_ron_str("(starting_currency: 2000, endless: true)").unwrap();
        assert_eq!(config.starting_currency, 2000);
        assert!(config.endless);
        assert_eq!(config.spawn_interval, 30);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = GameConfig::from_ron_str("(spawn_interval: 0)").unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));
        let err = GameConfig::from_ron_str("(spawn_interval: \"fast\")").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }

    #[test]
    fn test_bomb_radius_for_default_map() {
        let radius = GameConfig::default().bomb_radius();
        // sqrt(800 * 600 / 16) ~= 173.2
        assert!((radius - Fixed::from_num(173.205)).abs() < Fixed::from_num(0.001));
    }

    #[test]
    fn test_bounds() {
        let config = GameConfig::default();
        assert!(config.contains(Vec2Fixed::from_ints(0, 0)));
        assert!(config.contains(Vec2Fixed::from_ints(800, 600)));
        assert!(!config.contains(Vec2Fixed::from_ints(801, 10)));
        assert!(!config.contains(Vec2Fixed::from_ints(-1, 10)));
    }
}
