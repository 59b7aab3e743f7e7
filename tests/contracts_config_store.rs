use std::collections::HashMap;
use std::path::PathBuf;

use infer_playground::api::*;
use infer_playground::runtime::config::{ENV_ENGINE, ENV_RUNTIME, ENV_TIMEOUT_MS};
use infer_playground::runtime::store::Preferences;
use infer_playground::runtime::{ExpansionPolicy, PlaygroundConfig, PreferenceStore};

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("playground.json");
    std::fs::write(
        &path,
        r#"{
            "engine": {"kind": "remote", "url": "https://cdn.example.org/infer.wasm",
                       "auth": {"method": "bearer", "token": "t0k"}},
            "timeoutMs": 2500,
            "expansion": {"depth": 2},
            "shareBase": "https://play.example.org/"
        }"#,
    )
    .unwrap();

    let config = PlaygroundConfig::from_file(&path).unwrap();
    assert_eq!(
        config.engine,
        WasmSource::Remote {
            url: "https://cdn.example.org/infer.wasm".to_string(),
            auth: AuthMethod::Bearer {
                token: "t0k".to_string()
            },
        }
    );
    assert_eq!(config.timeout_ms, 2500);
    assert_eq!(config.expansion, ExpansionPolicy::Depth(2));
    assert_eq!(config.share_base, "https://play.example.org/");
    assert_eq!(config.debounce_ms, 300);
    assert!(config.validate().is_ok());
}

#[test]
fn malformed_config_is_a_parsing_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ timeoutMs: ").unwrap();
    let err = PlaygroundConfig::from_file(&path).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parsing);

    let missing = PlaygroundConfig::from_file(&dir.path().join("absent.json")).unwrap_err();
    assert_eq!(missing.kind, ErrorKind::Runtime);
}

#[test]
fn environment_overrides_the_file() {
    let env: HashMap<&str, &str> = HashMap::from([
        (ENV_ENGINE, "/opt/infer/infer.wasm"),
        (ENV_RUNTIME, "/usr/local/bin/wasmtime"),
        (ENV_TIMEOUT_MS, " 750 "),
    ]);
    let mut config = PlaygroundConfig::default();
    config
        .apply_env_with(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();
    assert_eq!(
        config.engine,
        WasmSource::Local {
            path: PathBuf::from("/opt/infer/infer.wasm")
        }
    );
    assert_eq!(config.runtime, Some(PathBuf::from("/usr/local/bin/wasmtime")));
    assert_eq!(config.timeout_ms, 750);
}

#[test]
fn zero_limits_fail_validation() {
    let config = PlaygroundConfig {
        history_limit: 0,
        ..PlaygroundConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.message.contains("historyLimit"));
}

#[test]
fn preferences_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("preferences.json");

    let mut store = PreferenceStore::open(&path);
    assert!(store.wasm_source().is_none());
    assert!(store.history().is_empty());
    store.set_wasm_source(WasmSource::from_location("https://cdn.example.org/infer.wasm"));
    store.push_history("\\x. x", 20);
    store.push_history("1", 20);
    store.save().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"wasm-source\""));
    assert!(text.contains("\"expression-history\""));

    let reopened = PreferenceStore::open(&path);
    assert_eq!(reopened.history(), ["1".to_string(), "\\x. x".to_string()]);
    assert!(matches!(
        reopened.wasm_source(),
        Some(WasmSource::Remote { .. })
    ));
}

#[test]
fn corrupt_preferences_fall_back_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preferences.json");
    std::fs::write(&path, "not json at all").unwrap();
    let store = PreferenceStore::open(&path);
    assert_eq!(store.preferences(), &Preferences::default());
}

#[test]
fn stored_history_is_truncated_to_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = PreferenceStore::open(dir.path().join("p.json"));
    for i in 0..10 {
        store.push_history(&i.to_string(), 3);
    }
    assert_eq!(
        store.history(),
        ["9".to_string(), "8".to_string(), "7".to_string()]
    );
}
