//! Error types for the game simulation.
//!
//! Configuration failures surface as [`GameError`]. Rejected player actions
//! surface as [`ActionError`]; a rejected action never mutates state.

use thiserror::Error;

use crate::math::Fixed;
use crate::towers::{TowerId, TowerKind};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Configuration-time errors: bad maps, bad data files.
#[derive(Debug, Error)]
pub enum GameError {
    /// A map needs at least two control points to form a curve.
    #[error("Map '{map}' has {points} control point(s); at least 2 are required")]
    DegenerateMap {
        /// Map name.
        map: String,
        /// Number of control points supplied.
        points: usize,
    },

    /// A control point lies outside the largest allowed map.
    #[error("Map '{map}' has control point ({x}, {y}) outside 0..={limit}")]
    ControlPointOutOfRange {
        /// Map name.
        map: String,
        /// Offending x coordinate.
        x: Fixed,
        /// Offending y coordinate.
        y: Fixed,
        /// Largest allowed coordinate.
        limit: u32,
    },

    /// No map with the requested name exists in the catalog.
    #[error("Unknown map: {0}")]
    UnknownMap(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid game configuration.
    #[error("Invalid game configuration: {0}")]
    InvalidConfig(String),
}

/// Why a player action was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The match has ended; no further actions are accepted.
    #[error("The match is over")]
    MatchOver,

    /// Not enough currency for the purchase.
    #[error("Insufficient currency: need {required}, have {available}")]
    InsufficientFunds {
        /// Cost of the action.
        required: u32,
        /// Current balance.
        available: u32,
    },

    /// The position overlaps the path corridor.
    #[error("Cannot build on the path")]
    OnPath,

    /// The position is outside the playable area.
    #[error("Position is outside the map")]
    OutOfBounds,

    /// The position is too close to an existing tower.
    #[error("Too close to tower {0:?}")]
    TooCloseToTower(TowerId),

    /// The tower kind has not been unlocked yet.
    #[error("{0:?} tower is locked")]
    TowerLocked(TowerKind),

    /// No tower with that identifier exists.
    #[error("No such tower: {0:?}")]
    UnknownTower(TowerId),

    /// A wave is already running.
    #[error("A wave is already in progress")]
    WaveInProgress,
}
