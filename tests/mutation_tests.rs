//! Integration tests for the mutation surface: routing, merging,
//! deletion, and snapshot consistency after writes.

use berth_settings::catalog::{NullCapabilities, StaticCatalog};
use berth_settings::engine::SettingsEngine;
use berth_settings::store::SettingsPaths;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

fn engine_in(temp: &TempDir) -> SettingsEngine {
    SettingsEngine::load(
        SettingsPaths::in_dir(temp.path()),
        Arc::new(StaticCatalog::default()),
        Arc::new(NullCapabilities),
    )
    .unwrap()
}

fn read_doc(temp: &TempDir, name: &str) -> Value {
    let path = temp.path().join(name);
    if !path.exists() {
        return Value::Object(serde_json::Map::new());
    }
    serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn set_then_get_round_trips() {
    let temp = TempDir::new().unwrap();
    let engine = engine_in(&temp);

    engine.set("urls.registry", "https://r").await.unwrap();
    assert_eq!(
        engine.get("urls.registry", None).await.unwrap().as_deref(),
        Some("https://r")
    );
}

#[tokio::test]
async fn set_preserves_sibling_keys() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("overrides.yaml"),
        "limits:\n  cpu: \"1\"\n  memory: \"2\"\n",
    )
    .unwrap();
    let engine = engine_in(&temp);

    engine.set("limits.cpu", "9").await.unwrap();

    assert_eq!(
        engine.get_sync("limits.cpu", None).unwrap().as_deref(),
        Some("9")
    );
    assert_eq!(
        engine.get_sync("limits.memory", None).unwrap().as_deref(),
        Some("2")
    );

    // The persisted document kept the sibling too.
    let doc = read_doc(&temp, "overrides.yaml");
    assert_eq!(doc["limits"]["cpu"], "9");
    assert_eq!(doc["limits"]["memory"], "2");
}

#[tokio::test]
async fn sensitive_names_never_touch_the_general_store() {
    let temp = TempDir::new().unwrap();
    let engine = engine_in(&temp);

    engine.set("api_keys.new_key", "sk-xyz").await.unwrap();

    // Retrievable through the normal read path.
    assert_eq!(
        engine
            .get("api_keys.new_key", None)
            .await
            .unwrap()
            .as_deref(),
        Some("sk-xyz")
    );

    // Physically present only in the secret document.
    let secrets = read_doc(&temp, "secrets.yaml");
    assert_eq!(secrets["api_keys"]["new_key"], "sk-xyz");
    let overrides = read_doc(&temp, "overrides.yaml");
    assert!(overrides.get("api_keys").is_none());
}

#[tokio::test]
async fn delete_reports_whether_a_key_existed() {
    let temp = TempDir::new().unwrap();
    let engine = engine_in(&temp);

    assert!(!engine.delete("nonexistent.path").await.unwrap());

    engine.set("feature.flag", "on").await.unwrap();
    assert!(engine.delete("feature.flag").await.unwrap());
    assert_eq!(
        engine
            .get("feature.flag", Some("fallback"))
            .await
            .unwrap()
            .as_deref(),
        Some("fallback")
    );
}

#[tokio::test]
async fn delete_checks_the_secret_store_first() {
    let temp = TempDir::new().unwrap();
    let engine = engine_in(&temp);

    engine.set("vault.root_token", "t-1").await.unwrap();
    assert!(engine.delete("vault.root_token").await.unwrap());

    let secrets = read_doc(&temp, "secrets.yaml");
    assert!(secrets.get("vault").is_none());
}

#[tokio::test]
async fn delete_never_reaches_shipped_defaults() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("config.yaml"), "urls:\n  registry: https://r\n").unwrap();
    let engine = engine_in(&temp);

    // The key resolves, but no mutable store holds it.
    assert!(!engine.delete("urls.registry").await.unwrap());
    assert_eq!(
        engine.get_sync("urls.registry", None).unwrap().as_deref(),
        Some("https://r")
    );
}

#[tokio::test]
async fn writes_are_visible_to_entity_resolution_immediately() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("services.yaml"),
        "services:\n  chronicle:\n    env: [MODE]\n",
    )
    .unwrap();
    let paths = SettingsPaths::in_dir(temp.path());
    let catalog = StaticCatalog::from_file(&paths.dir.join("services.yaml")).unwrap();
    let engine =
        SettingsEngine::load(paths, Arc::new(catalog), Arc::new(NullCapabilities)).unwrap();

    engine.set("services.chronicle.MODE", "canary").await.unwrap();

    let map = engine.for_deploy_config("prod-east", "chronicle").unwrap();
    assert_eq!(map["MODE"].value.as_deref(), Some("canary"));
}

#[tokio::test]
async fn reload_picks_up_external_edits() {
    let temp = TempDir::new().unwrap();
    let engine = engine_in(&temp);

    assert!(engine.get_sync("urls.registry", None).unwrap().is_none());

    std::fs::write(
        temp.path().join("overrides.yaml"),
        "urls:\n  registry: https://edited\n",
    )
    .unwrap();
    engine.reload().unwrap();

    assert_eq!(
        engine.get_sync("urls.registry", None).unwrap().as_deref(),
        Some("https://edited")
    );
}

#[tokio::test]
async fn concurrent_writers_to_different_stores_both_land() {
    let temp = TempDir::new().unwrap();
    let engine = Arc::new(engine_in(&temp));

    let sensitive = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.set("api_keys.alpha_key", "sk-a").await })
    };
    let general = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.set("urls.registry", "https://r").await })
    };
    sensitive.await.unwrap().unwrap();
    general.await.unwrap().unwrap();

    assert_eq!(
        engine.get_sync("api_keys.alpha_key", None).unwrap().as_deref(),
        Some("sk-a")
    );
    assert_eq!(
        engine.get_sync("urls.registry", None).unwrap().as_deref(),
        Some("https://r")
    );
}
