//! JSON protocol for headless sessions.
//!
//! The runner talks JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses and state snapshots
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. The controller sends commands as JSON lines
//! 3. Every command gets exactly one response, `tick` may add a `game_over`
//! 4. `quit` answers `bye` and ends the session
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"place","x":200,"y":350,"kind":"Dart"}
//! <- {"type":"placed","tower":1,"kind":"Dart"}
//! -> {"cmd":"start_wave"}
//! <- {"type":"wave_started","wave":1}
//! -> {"cmd":"tick","count":600}
//! <- {"type":"ticked","tick":600,"spawned":4,"kills":4,...}
//! -> {"cmd":"query"}
//! <- {"type":"state","tick":600,"currency":590,...}
//! ```

use serde::{Deserialize, Serialize};
use td_core::prelude::{
    EnemyKind, Game, TargetingPolicy, TickEvents, TowerKind, UnlockStore, UpgradeStat,
};

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands accepted by the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the simulation by N ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Report the full match state without advancing time.
    Query,

    /// Buy and place a tower.
    Place { x: f64, y: f64, kind: TowerKind },

    /// Choose the kind built by `place_selected`.
    SetTowerType { kind: TowerKind },

    /// Place a tower of the selected kind.
    PlaceSelected { x: f64, y: f64 },

    /// Select the tower under a point, or clear the selection.
    Select { x: f64, y: f64 },

    /// Buy one level of a tower stat.
    Upgrade { tower: u32, stat: UpgradeStat },

    /// Sell a tower.
    Sell { tower: u32 },

    /// Change a tower's targeting policy.
    Target { tower: u32, policy: TargetingPolicy },

    /// Launch the next wave.
    StartWave,

    /// Buy a base upgrade.
    UpgradeBase,

    /// Put an enemy on the path outside the wave schedule.
    Inject {
        kind: EnemyKind,
        #[serde(default)]
        boss: bool,
        #[serde(default)]
        progress: f64,
    },

    /// Start a fresh match on the same map.
    Restart,

    /// Report the state hash (for determinism verification).
    Hash,

    /// End the session.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses sent by the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String, tick: u64 },

    /// Command accepted, nothing else to report.
    Ack { cmd: String },

    /// Command rejected or unreadable.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// A tower was placed.
    Placed { tower: u32, kind: TowerKind },

    /// Selection changed.
    Selected { tower: Option<u32> },

    /// A tower stat was upgraded.
    Upgraded {
        tower: u32,
        stat: UpgradeStat,
        cost: u32,
    },

    /// A tower was sold.
    Sold { tower: u32, refund: u32 },

    /// A wave was launched.
    WaveStarted { wave: u32 },

    /// The base was upgraded.
    BaseUpgraded { cost: u32, base_max_health: u32 },

    /// An enemy was injected.
    Injected { enemy: u32 },

    /// Ticks ran.
    Ticked(TickSummary),

    /// Full match state.
    State(Box<StateSnapshot>),

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// The match ended.
    GameOver {
        result: MatchResult,
        tick: u64,
        wave: u32,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// What happened over a `tick` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    /// Tick counter after the command.
    pub tick: u64,
    /// Ticks actually simulated; fewer than asked if the match ended.
    pub ticks_run: u32,
    /// Enemies spawned.
    pub spawned: u32,
    /// Projectiles fired.
    pub shots: u32,
    /// Enemies killed.
    pub kills: u32,
    /// Currency earned from kills.
    pub rewards: u32,
    /// Enemies that reached the base.
    pub leaks: u32,
    /// Projectiles whose target vanished.
    pub fizzled: u32,
    /// Waves completed.
    pub waves_completed: Vec<u32>,
    /// The bonus tower was unlocked.
    pub bonus_unlocked: bool,
}

impl TickSummary {
    /// Fold one tick's events into the summary.
    pub fn absorb(&mut self, events: &TickEvents) {
        self.ticks_run += 1;
        self.spawned += count(events.spawned.len());
        self.shots += count(events.shots.len());
        self.kills += count(events.kills.len());
        self.rewards += events.kills.iter().map(|k| k.reward).sum::<u32>();
        self.leaks += count(events.leaks.len());
        self.fizzled += events.fizzled;
        if let Some(completion) = events.wave_completed {
            self.waves_completed.push(completion.wave);
        }
        self.bonus_unlocked |= events.bonus_unlocked;
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Whole-match snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tick: u64,
    pub status: MatchStatus,
    pub wave: u32,
    pub wave_active: bool,
    pub pending_spawns: usize,
    pub currency: u32,
    pub lives: u32,
    pub base_health: u32,
    pub base_max_health: u32,
    pub cash_multiplier_percent: u32,
    pub bonus_unlocked: bool,
    pub selected_kind: TowerKind,
    pub selected_tower: Option<u32>,
    pub enemies: Vec<EnemyState>,
    pub towers: Vec<TowerState>,
    pub projectiles: usize,
    pub hash: u64,
}

/// One enemy on the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyState {
    pub id: u32,
    pub kind: EnemyKind,
    pub boss: bool,
    pub x: f64,
    pub y: f64,
    pub progress: f64,
    pub health: u32,
    pub max_health: u32,
}

/// One placed tower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerState {
    pub id: u32,
    pub kind: TowerKind,
    pub x: f64,
    pub y: f64,
    pub range: f64,
    pub damage: u32,
    pub fire_interval: u32,
    pub policy: TargetingPolicy,
    pub levels: [u32; 3],
    pub sell_value: u32,
}

/// Current match status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    InProgress,
    Victory,
    Defeat,
}

/// How a finished match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Victory,
    Defeat,
}

// ============================================================================
// Helpers
// ============================================================================

impl StateSnapshot {
    /// Capture the current state of `game`.
    pub fn capture<S: UnlockStore>(game: &Game<S>) -> Self {
        let economy = game.economy();
        let status = if economy.victory {
            MatchStatus::Victory
        } else if economy.game_over {
            MatchStatus::Defeat
        } else {
            MatchStatus::InProgress
        };

        let enemies = game
            .enemies()
            .iter()
            .map(|e| EnemyState {
                id: e.id.0,
                kind: e.kind,
                boss: e.is_boss,
                x: e.position.x.to_num(),
                y: e.position.y.to_num(),
                progress: e.progress.to_num(),
                health: e.health,
                max_health: e.max_health,
            })
            .collect();

        let towers = game
            .towers()
            .iter()
            .map(|t| TowerState {
                id: t.id.0,
                kind: t.kind,
                x: t.position.x.to_num(),
                y: t.position.y.to_num(),
                range: t.range.to_num(),
                damage: t.damage,
                fire_interval: t.fire_interval,
                policy: t.policy,
                levels: [t.range_level, t.damage_level, t.rate_level],
                sell_value: t.sell_value(),
            })
            .collect();

        Self {
            tick: game.tick_count(),
            status,
            wave: economy.wave,
            wave_active: economy.wave_active,
            pending_spawns: game.pending_spawns(),
            currency: economy.currency,
            lives: economy.lives,
            base_health: economy.base_health,
            base_max_health: economy.base_max_health,
            cash_multiplier_percent: economy.cash_multiplier_percent,
            bonus_unlocked: game.is_bonus_unlocked(),
            selected_kind: game.state().selected_kind,
            selected_tower: game.state().selected_tower.map(|id| id.0),
            enemies,
            towers,
            projectiles: game.projectiles().len(),
            hash: game.state_hash(),
        }
    }
}

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: "1.0".to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Place { .. } => "place",
            Self::SetTowerType { .. } => "set_tower_type",
            Self::PlaceSelected { .. } => "place_selected",
            Self::Select { .. } => "select",
            Self::Upgrade { .. } => "upgrade",
            Self::Sell { .. } => "sell",
            Self::Target { .. } => "target",
            Self::StartWave => "start_wave",
            Self::UpgradeBase => "upgrade_base",
            Self::Inject { .. } => "inject",
            Self::Restart => "restart",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tick_command() {
        let json = r#"{"cmd":"tick","count":60}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(cmd, Command::Tick { count: 60 }));
    }

    #[test]
    fn test_default_tick_count() {
        let cmd = Command::from_json(r#"{"cmd":"tick"}"#).unwrap();
        assert!(matches!(cmd, Command::Tick { count: 1 }));
    }

    #[test]
    fn test_parse_place_command() {
        let json = r#"{"cmd":"place","x":200,"y":350.5,"kind":"Sniper"}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(
            cmd,
            Command::Place { x, y, kind: TowerKind::Sniper } if x == 200.0 && y == 350.5
        ));
    }

    #[test]
    fn test_parse_upgrade_and_target() {
        let upgrade = Command::from_json(r#"{"cmd":"upgrade","tower":3,"stat":"FireRate"}"#);
        assert!(matches!(
            upgrade.unwrap(),
            Command::Upgrade {
                tower: 3,
                stat: UpgradeStat::FireRate
            }
        ));
        let target = Command::from_json(r#"{"cmd":"target","tower":1,"policy":"Strong"}"#);
        assert_eq!(target.unwrap().name(), "target");
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        assert!(Command::from_json(r#"{"cmd":"teleport"}"#).is_err());
        assert!(Command::from_json("not json").is_err());
    }

    #[test]
    fn test_serialize_responses() {
        let json = Response::WaveStarted { wave: 2 }.to_json_line();
        assert_eq!(json, "{\"type\":\"wave_started\",\"wave\":2}\n");

        let ticked = Response::Ticked(TickSummary {
            tick: 60,
            ticks_run: 60,
            ..TickSummary::default()
        })
        .to_json_line();
        assert!(ticked.contains(r#""type":"ticked""#));
        assert!(ticked.contains(r#""ticks_run":60"#));
    }
}
