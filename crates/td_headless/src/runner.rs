//! Headless session runner.
//!
//! Drives one match from JSON-line commands. [`HeadlessRunner::handle`]
//! maps a [`Command`] to its responses; [`HeadlessRunner::run`] wires that
//! to any reader and writer, usually stdin and stdout.

use std::io::{self, BufRead, Write};

use td_core::prelude::{
    ActionError, Fixed, Game, PlayerFacade, TowerId, UnlockStore, Vec2Fixed,
};
use tracing::{debug, info, warn};

use crate::protocol::{Command, MatchResult, Response, StateSnapshot, TickSummary};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output state after every `tick` command (vs only on query).
    pub auto_state_output: bool,
}

/// One interactive match driven by JSON-line commands.
pub struct HeadlessRunner<S: UnlockStore> {
    game: Game<S>,
    config: HeadlessConfig,
}

impl<S: UnlockStore> HeadlessRunner<S> {
    /// Create a runner around a freshly built match.
    pub fn new(game: Game<S>) -> Self {
        Self::with_config(game, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    pub fn with_config(game: Game<S>, config: HeadlessConfig) -> Self {
        Self { game, config }
    }

    /// The match being played.
    pub fn game(&self) -> &Game<S> {
        &self.game
    }

    /// Consume the runner, returning the match.
    pub fn into_game(self) -> Game<S> {
        self.game
    }

    /// Run the session loop until `quit` or end of input.
    ///
    /// Unreadable lines are answered with an error response and skipped.
    ///
    /// # Errors
    /// Fails only when reading input or writing output fails.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        info!(tick = self.game.tick_count(), "Headless session started");
        write_response(&mut output, &Response::ready(self.game.tick_count()))?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let responses = match Command::from_json(line) {
                Ok(command) => {
                    debug!(cmd = command.name(), "Command received");
                    self.handle(command)
                }
                Err(e) => {
                    warn!(error = %e, "Unreadable command");
                    vec![Response::error(format!("Invalid command: {e}"), None)]
                }
            };

            let quit = responses.contains(&Response::Bye);
            for response in &responses {
                write_response(&mut output, response)?;
            }
            if quit {
                break;
            }
        }

        info!(tick = self.game.tick_count(), "Headless session ended");
        Ok(())
    }

    /// Apply one command and return its responses.
    pub fn handle(&mut self, command: Command) -> Vec<Response> {
        let name = command.name();
        match command {
            Command::Tick { count } => self.tick(count),
            Command::Query => vec![self.state()],
            Command::Place { x, y, kind } => {
                respond(name, point(x, y).and_then(|p| self.game.place_tower(p, kind)), |id| {
                    Response::Placed { tower: id.0, kind }
                })
            }
            Command::SetTowerType { kind } => {
                respond(name, self.game.set_tower_type(kind), |()| Response::ack(name))
            }
            Command::PlaceSelected { x, y } => {
                let kind = self.game.selected_kind();
                let placed = point(x, y).and_then(|p| self.game.place_selected_tower(p));
                respond(name, placed, |id| Response::Placed { tower: id.0, kind })
            }
            Command::Select { x, y } => respond(name, point(x, y), |p| Response::Selected {
                tower: self.game.select_tower(p).map(|id| id.0),
            }),
            Command::Upgrade { tower, stat } => respond(
                name,
                self.game.upgrade_tower(TowerId(tower), stat),
                |cost| Response::Upgraded { tower, stat, cost },
            ),
            Command::Sell { tower } => {
                respond(name, self.game.sell_tower(TowerId(tower)), |refund| {
                    Response::Sold { tower, refund }
                })
            }
            Command::Target { tower, policy } => respond(
                name,
                self.game.set_targeting_policy(TowerId(tower), policy),
                |()| Response::ack(name),
            ),
            Command::StartWave => {
                respond(name, self.game.start_wave(), |wave| Response::WaveStarted { wave })
            }
            Command::UpgradeBase => respond(name, self.game.upgrade_base(), |cost| {
                Response::BaseUpgraded {
                    cost,
                    base_max_health: self.game.economy().base_max_health,
                }
            }),
            Command::Inject {
                kind,
                boss,
                progress,
            } => {
                if self.game.economy().is_over() {
                    return vec![Response::error(ActionError::MatchOver.to_string(), Some(name))];
                }
                match Fixed::checked_from_num(progress) {
                    Some(progress) => {
                        let enemy = self.game.inject_enemy(kind, boss, progress);
                        vec![Response::Injected { enemy: enemy.0 }]
                    }
                    None => vec![Response::error("Progress is not a finite number", Some(name))],
                }
            }
            Command::Restart => {
                self.game.restart();
                info!("Match restarted");
                vec![Response::ack(name)]
            }
            Command::Hash => vec![Response::StateHash {
                tick: self.game.tick_count(),
                hash: self.game.state_hash(),
            }],
            Command::Quit => vec![Response::Bye],
        }
    }

    fn tick(&mut self, count: u32) -> Vec<Response> {
        let mut summary = TickSummary::default();
        let mut ended = None;
        for _ in 0..count {
            if self.game.economy().is_over() {
                break;
            }
            let events = self.game.tick();
            summary.absorb(&events);
            if events.victory {
                ended = Some(MatchResult::Victory);
            } else if events.defeat {
                ended = Some(MatchResult::Defeat);
            }
        }
        summary.tick = self.game.tick_count();

        let mut responses = vec![Response::Ticked(summary)];
        if self.config.auto_state_output {
            responses.push(self.state());
        }
        if let Some(result) = ended {
            info!(?result, tick = self.game.tick_count(), "Match ended");
            responses.push(Response::GameOver {
                result,
                tick: self.game.tick_count(),
                wave: self.game.economy().wave,
            });
        }
        responses
    }

    fn state(&self) -> Response {
        Response::State(Box::new(StateSnapshot::capture(&self.game)))
    }
}

/// World coordinates from protocol numbers.
fn point(x: f64, y: f64) -> Result<Vec2Fixed, ActionError> {
    match (Fixed::checked_from_num(x), Fixed::checked_from_num(y)) {
        (Some(x), Some(y)) => Ok(Vec2Fixed::new(x, y)),
        _ => Err(ActionError::OutOfBounds),
    }
}

fn respond<T>(
    cmd: &str,
    result: Result<T, ActionError>,
    on_ok: impl FnOnce(T) -> Response,
) -> Vec<Response> {
    match result {
        Ok(value) => vec![on_ok(value)],
        Err(e) => {
            debug!(cmd, error = %e, "Command rejected");
            vec![Response::error(e.to_string(), Some(cmd))]
        }
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use td_core::prelude::{EnemyKind, MemoryUnlockStore, TowerKind, UpgradeStat};
    use td_test_utils::fixtures::{straight_game, STRAIGHT_PATH_Y};

    fn runner() -> HeadlessRunner<MemoryUnlockStore> {
        HeadlessRunner::new(straight_game())
    }

    fn session(input: &str) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        runner().run(input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_session_starts_ready_and_ends_bye() {
        let lines = session("{\"cmd\":\"hash\"}\n{\"cmd\":\"quit\"}\n{\"cmd\":\"hash\"}\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "ready");
        assert_eq!(lines[1]["type"], "state_hash");
        assert_eq!(lines[2]["type"], "bye");
    }

    #[test]
    fn test_bad_line_reports_error_and_continues() {
        let lines = session("not json\n\n{\"cmd\":\"query\"}\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1]["type"], "error");
        assert_eq!(lines[2]["type"], "state");
        assert_eq!(lines[2]["currency"], 650);
    }

    #[test]
    fn test_place_upgrade_sell() {
        let mut runner = runner();
        let y = f64::from(STRAIGHT_PATH_Y + 60);
        let placed = runner.handle(Command::Place {
            x: 200.0,
            y,
            kind: TowerKind::Dart,
        });
        assert_eq!(
            placed,
            vec![Response::Placed {
                tower: 1,
                kind: TowerKind::Dart
            }]
        );

        let upgraded = runner.handle(Command::Upgrade {
            tower: 1,
            stat: UpgradeStat::Damage,
        });
        assert_eq!(
            upgraded,
            vec![Response::Upgraded {
                tower: 1,
                stat: UpgradeStat::Damage,
                cost: 75,
            }]
        );

        let sold = runner.handle(Command::Sell { tower: 1 });
        assert!(matches!(sold[0], Response::Sold { tower: 1, .. }));
        assert!(runner.game().towers().is_empty());
    }

    #[test]
    fn test_rejections_are_errors_naming_the_command() {
        let mut runner = runner();
        let on_path = runner.handle(Command::Place {
            x: 200.0,
            y: f64::from(STRAIGHT_PATH_Y),
            kind: TowerKind::Dart,
        });
        assert!(matches!(
            &on_path[0],
            Response::Error { cmd: Some(cmd), .. } if cmd == "place"
        ));

        let nan = runner.handle(Command::Select { x: f64::NAN, y: 0.0 });
        assert!(matches!(nan[0], Response::Error { .. }));

        let far = runner.handle(Command::Select { x: 1e5, y: 0.0 });
        assert!(matches!(far[0], Response::Selected { tower: None }));

        let unknown = runner.handle(Command::Sell { tower: 99 });
        assert!(matches!(unknown[0], Response::Error { .. }));
        assert_eq!(runner.game().economy().currency, 650);
    }

    #[test]
    fn test_tick_reports_game_over_once() {
        let mut runner = runner();
        for _ in 0..3 {
            runner.handle(Command::Inject {
                kind: EnemyKind::Red,
                boss: true,
                progress: 0.999,
            });
        }
        let mut responses = runner.handle(Command::Tick { count: 100 });
        for _ in 0..12 {
            runner.handle(Command::Inject {
                kind: EnemyKind::Red,
                boss: true,
                progress: 0.999,
            });
            responses.extend(runner.handle(Command::Tick { count: 100 }));
            if runner.game().economy().is_over() {
                break;
            }
        }
        let game_overs = responses
            .iter()
            .filter(|r| matches!(r, Response::GameOver { result: MatchResult::Defeat, .. }))
            .count();
        assert_eq!(game_overs, 1);

        let after = runner.handle(Command::Tick { count: 10 });
        assert_eq!(after.len(), 1);
        assert!(matches!(&after[0], Response::Ticked(s) if s.ticks_run == 0));

        let inject = runner.handle(Command::Inject {
            kind: EnemyKind::Red,
            boss: false,
            progress: 0.0,
        });
        assert!(matches!(inject[0], Response::Error { .. }));
    }

    #[test]
    fn test_auto_state_output() {
        let mut runner = HeadlessRunner::with_config(
            straight_game(),
            HeadlessConfig {
                auto_state_output: true,
            },
        );
        let responses = runner.handle(Command::Tick { count: 5 });
        assert_eq!(responses.len(), 2);
        assert!(matches!(&responses[1], Response::State(s) if s.tick == 5));
    }

    #[test]
    fn test_restart_resets_state() {
        let mut runner = runner();
        runner.handle(Command::StartWave);
        runner.handle(Command::Tick { count: 50 });
        assert_eq!(runner.handle(Command::Restart), vec![Response::ack("restart")]);
        assert_eq!(runner.game().tick_count(), 0);
        assert_eq!(runner.game().economy().wave, 0);
    }
}
