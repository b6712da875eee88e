//! Named maps and the catalog that holds them.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::Vec2Fixed;
use crate::path::PathCurve;

/// Map used when none is requested.
pub const DEFAULT_MAP: &str = "meadow";

/// A named set of path control points.
///
/// # Example RON
///
/// ```ron
/// (
///     name: "meadow",
///     description: "Gentle S-bend",
///     control_points: [(0, 300), (200, 300), (200, 120), (800, 120)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    /// Unique map name.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Path control points in world units, spawn first.
    pub control_points: Vec<(i32, i32)>,
}

impl MapData {
    /// Control points as fixed-point vectors.
    #[must_use]
    pub fn points(&self) -> Vec<Vec2Fixed> {
        self.control_points
            .iter()
            .map(|&(x, y)| Vec2Fixed::from_ints(x, y))
            .collect()
    }

    /// Build the traversal curve for this map.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DegenerateMap`] when the map has fewer than two
    /// control points and [`GameError::ControlPointOutOfRange`] when a point
    /// lies off the largest allowed map.
    pub fn build_curve(&self) -> Result<PathCurve> {
        PathCurve::build_named(&self.name, &self.points())
    }
}

/// A collection of maps, looked up by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapCatalog {
    /// Maps in declaration order.
    pub maps: Vec<MapData>,
}

impl MapCatalog {
    /// The maps that ship with the game.
    #[must_use]
    pub fn builtin() -> Self {
        let map = |name: &str, description: &str, points: &[(i32, i32)]| MapData {
            name: name.to_string(),
            description: description.to_string(),
            control_points: points.to_vec(),
        };

        Self {
            maps: vec![
                map(
                    "meadow",
                    "Gentle switchback across open ground",
                    &[(0, 300), (200, 300), (200, 120), (500, 120), (500, 480), (800, 480)],
                ),
                map(
                    "serpent",
                    "Long winding path with three full crossings",
                    &[
                        (0, 100),
                        (700, 100),
                        (700, 250),
                        (100, 250),
                        (100, 400),
                        (700, 400),
                        (700, 540),
                        (800, 540),
                    ],
                ),
                map(
                    "ridge",
                    "Short zigzag over the ridge line",
                    &[(0, 560), (150, 150), (400, 450), (650, 150), (800, 60)],
                ),
            ],
        }
    }

    /// Parse a catalog from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed input.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        Self::from_ron_str_labeled("<catalog>", source)
    }

    /// Like [`from_ron_str`](Self::from_ron_str), labelling errors with
    /// `label` (usually a file path).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed input.
    pub fn from_ron_str_labeled(label: &str, source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: label.to_string(),
            message: e.to_string(),
        })
    }

    /// Look a map up by name.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownMap`] when no map has that name.
    pub fn get(&self, name: &str) -> Result<&MapData> {
        self.maps
            .iter()
            .find(|map| map.name == name)
            .ok_or_else(|| GameError::UnknownMap(name.to_string()))
    }

    /// Map names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.iter().map(|map| map.name.as_str())
    }

    /// Build every curve, collecting the maps that fail.
    #[must_use]
    pub fn invalid_maps(&self) -> Vec<GameError> {
        self.maps
            .iter()
            .filter_map(|map| map.build_curve().err())
            .collect()
    }
}

impl Default for MapCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_maps_build() {
        let catalog = MapCatalog::builtin();
        assert!(catalog.invalid_maps().is_empty());
        assert!(catalog.get(DEFAULT_MAP).is_ok());
        assert_eq!(catalog.names().count(), 3);
    }

    #[test]
    fn test_unknown_map() {
        let err = MapCatalog::builtin().get("atlantis").unwrap_err();
        assert!(matches!(err, GameError::UnknownMap(name) if name == "atlantis"));
    }

    #[test]
    fn test_parse_ron_catalog() {
        let source = r#"
            (
                maps: [
                    (name: "line", control_points: [(0, 300), (800, 300)]),
                    (name: "dot", description: "broken", control_points: [(5, 5)]),
                ],
            )
        "#;
        let catalog = MapCatalog::from_ron_str(source).unwrap();
        assert_eq!(catalog.get("line").unwrap().description, "");

        let curve = catalog.get("line").unwrap().build_curve().unwrap();
        assert_eq!(curve.end(), Vec2Fixed::from_ints(800, 300));

        let invalid = catalog.invalid_maps();
        assert_eq!(invalid.len(), 1);
        assert!(matches!(&invalid[0], GameError::DegenerateMap { map, points: 1 } if map == "dot"));
    }

    #[test]
    fn test_far_control_points_fail_to_build() {
        let source = r#"(maps: [(name: "far", control_points: [(0, 300), (60000, 300)])])"#;
        let catalog = MapCatalog::from_ron_str(source).unwrap();
        let far = catalog.get("far").unwrap();

        let err = far.build_curve().unwrap_err();
        assert!(matches!(&err, GameError::ControlPointOutOfRange { map, .. } if map == "far"));
        assert_eq!(catalog.invalid_maps().len(), 1);

        let game = crate::simulation::Game::with_map(
            crate::config::GameConfig::default(),
            far,
            crate::unlock::MemoryUnlockStore::new(),
        );
        assert!(matches!(game, Err(GameError::ControlPointOutOfRange { .. })));
    }

    #[test]
    fn test_malformed_ron() {
        let err = MapCatalog::from_ron_str_labeled("maps.ron", "(maps: [(name: 3)])").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { path, .. } if path == "maps.ron"));
    }
}
