//! Configuration files on disk

use ilm_engine::{ConfigError, EngineConfig, InspectionEngine};
use ilm_model::{GateKind, LotStatus};
use ilm_test_utils::{insert_network_lot, seeded_store};
use ilm_validation::GateOutcome;
use std::io::Write;
use tempfile::TempDir;

const WALLS_ONLY: &str = r"
rules:
  - sources: [Wall]
    targets: [Wall]
    allowed: [connects_to]
";

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn test_load_resolves_relative_ontology_path() {
    let dir = TempDir::new().unwrap();
    write(&dir, "walls.yaml", WALLS_ONLY);
    let config_path = write(
        &dir,
        "ilm.toml",
        "ontology_path = \"walls.yaml\"\nstore_timeout_ms = 1000\n",
    );

    let config = EngineConfig::load(&config_path).unwrap();

    assert_eq!(config.ontology_path, Some(dir.path().join("walls.yaml")));
    assert_eq!(config.store_timeout_ms, 1000);
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = EngineConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[tokio::test]
async fn test_engine_uses_configured_ontology() {
    let dir = TempDir::new().unwrap();
    write(&dir, "walls.yaml", WALLS_ONLY);
    let config_path = write(&dir, "ilm.toml", "ontology_path = \"walls.yaml\"\n");

    let store = seeded_store();
    let lot_id = insert_network_lot(&store, LotStatus::Submitted);
    let engine = InspectionEngine::new(EngineConfig::load(&config_path).unwrap(), store).unwrap();

    match engine.check_lot(&lot_id).await.unwrap() {
        GateOutcome::Failed(failure) => assert_eq!(failure.gate, GateKind::Semantic),
        GateOutcome::Passed => panic!("piping passed a walls-only ontology"),
    }
}

#[test]
fn test_engine_rejects_unreadable_ontology() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default().with_ontology_path(dir.path().join("missing.yaml"));

    let err = InspectionEngine::new(config, seeded_store()).unwrap_err();
    assert!(matches!(err, ConfigError::Ontology(_)));
}

#[test]
fn test_engine_rejects_invalid_config() {
    let config = EngineConfig::default().with_store_timeout_ms(0);
    let err = InspectionEngine::new(config, seeded_store()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}
