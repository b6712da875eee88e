//! The RON files under `assets/` load and play.

use std::path::PathBuf;

use td_core::prelude::{MapCatalog, MemoryUnlockStore};
use td_headless::game_runner::{AutoPlayConfig, GameRunner};
use td_headless::scenario::Scenario;
use td_headless::strategies::Strategy;

fn assets_dir(sub: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../assets")
        .join(sub)
}

fn ron_files(sub: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(assets_dir(sub))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_builtin_catalog_file_matches_code() {
    let source = std::fs::read_to_string(assets_dir("maps").join("builtin.ron")).unwrap();
    let catalog = MapCatalog::from_ron_str(&source).unwrap();
    assert_eq!(catalog, MapCatalog::builtin());
}

#[test]
fn test_scenario_files_build_games() {
    let files = ron_files("scenarios");
    assert!(!files.is_empty());
    for path in files {
        let scenario = Scenario::load(&path).unwrap();
        let game = scenario.build_game(&MapCatalog::builtin(), MemoryUnlockStore::new());
        assert!(game.is_ok(), "{} failed: {:?}", path.display(), game.err());
        assert!(
            Strategy::resolve(&scenario.strategy).is_ok(),
            "{} names an unknown strategy",
            path.display()
        );
    }
}

#[test]
fn test_strategy_files_play() {
    let files = ron_files("strategies");
    assert!(!files.is_empty());
    let runner = GameRunner::default();
    for path in files {
        let strategy = Strategy::load(&path).unwrap();
        let mut config = AutoPlayConfig::new("asset", Scenario::standard(), strategy);
        config.max_ticks = Some(2_000);
        let metrics = runner.run(&config).unwrap();
        assert!(
            metrics.towers_built.values().sum::<u32>() > 0,
            "{} built nothing",
            path.display()
        );
    }
}
