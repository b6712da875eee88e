//! Headless match runner for scripted play and CI verification.
//!
//! This crate drives `td_core` matches without a front end:
//!
//! - **Interactive sessions**: a controller plays a match over JSON lines
//! - **Auto-play**: scripted strategies play scenarios to the end
//! - **Balance batches**: many auto-play matches in parallel, summarised
//! - **Determinism checks**: repeated runs must end in the same state hash
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, place, upgrade, etc.)
//! - **stdout**: Responses and state snapshots (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command and response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p td_headless
//!
//! # Play a scenario with a strategy
//! cargo run -p td_headless -- auto --scenario standard --strategy balanced
//!
//! # Verify determinism
//! cargo run -p td_headless -- verify --scenario serpent --runs 5
//! ```

pub mod batch;
pub mod game_runner;
pub mod metrics;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod store;
pub mod strategies;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use game_runner::{AutoPlayConfig, GameRunner};
pub use metrics::{BatchSummary, GameMetrics, Outcome};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::Scenario;
pub use store::FileUnlockStore;
pub use strategies::{Strategy, StrategyExecutor};
