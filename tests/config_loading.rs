//! Configuration layering through the public API.

use std::collections::HashMap;
use std::path::PathBuf;

use config::Environment;
use xtru_mpx::config::ConfigurationError;
use xtru_mpx::{ConfigManager, ConfigOverrides, MpxConfig};

fn environment(vars: &[(&str, &str)]) -> Environment {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Environment::with_prefix("MPX").source(Some(map))
}

#[test]
fn config_has_expected_defaults() {
    let config = MpxConfig::default();

    assert_eq!(config.parallelism, 4);
    assert_eq!(config.nice, 0);
    assert_eq!(config.mpxlist, vec!["sqlldr", "sqlplus"]);
    assert_eq!(config.ignlist, vec!["grep"]);
    assert_eq!(config.cso, PathBuf::from("_stdout.log"));
    assert_eq!(config.cse, PathBuf::from("_stderr.log"));
    assert_eq!(config.heartbeat_interval_ms, 10_000);
    assert!(config.csi.is_empty());
    assert!(config.startup.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn toml_file_environment_and_overrides_layer_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("mpx.toml");
    std::fs::write(
        &file,
        r#"
parallelism = 8
nice = 5
mpxlist = ["sqlplus", "gzip"]
cso = "unload.out"
"#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        nice: Some(10),
        ..ConfigOverrides::default()
    };
    let config = ConfigManager::load_with_environment(
        Some(&file),
        &overrides,
        environment(&[("MPX_PARALLELISM", "16"), ("MPX_IGNLIST", "grep,rm")]),
    )
    .unwrap();

    assert_eq!(config.parallelism, 16);
    assert_eq!(config.nice, 10);
    assert_eq!(config.mpxlist, vec!["sqlplus", "gzip"]);
    assert_eq!(config.ignlist, vec!["grep", "rm"]);
    assert_eq!(config.cso, PathBuf::from("unload.out"));
    assert_eq!(config.cse, PathBuf::from("_stderr.log"));
}

#[test]
fn out_of_range_override_is_rejected() {
    let overrides = ConfigOverrides {
        parallelism: Some(65),
        ..ConfigOverrides::default()
    };
    let result = ConfigManager::load_with_environment(None, &overrides, environment(&[]));

    assert!(matches!(
        result,
        Err(ConfigurationError::InvalidValue { .. })
    ));
}
