//! No-mock loader and source resolution tests.
//!
//! Covers:
//! - YAML, JSON and TOML files on disk
//! - Directory layers merged in filename order
//! - Source discovery through ENVSTACK_CONFIG_DIR

use envstack_config::loader::{list_config_files, load_dir, load_file};
use envstack_config::resolve::{load_source, resolve_sources, ResolveOptions, SourceKind, ENV_CONFIG_DIR};
use envstack_config::{strip_force_markers, ConfigError};
use serde_json::{json, Value};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("write config file");
}

#[test]
fn test_load_each_format() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "a.yaml", "site:\n  id: from-yaml\n");
    write(dir.path(), "b.json", r#"{"site": {"port": 8080}}"#);
    write(dir.path(), "c.toml", "[site]\nenabled = true\n");

    assert_eq!(load_file(&dir.path().join("a.yaml")).unwrap()["site"]["id"], "from-yaml");
    assert_eq!(load_file(&dir.path().join("b.json")).unwrap()["site"]["port"], 8080);
    assert_eq!(load_file(&dir.path().join("c.toml")).unwrap()["site"]["enabled"], true);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = load_file(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert_eq!(err.code(), 60);
}

#[test]
fn test_dir_merges_in_name_order() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "10-base.yaml", "level: '1'\nname: base!\nlist: [1, 2]\n");
    write(dir.path(), "20-site.json", r#"{"level": "2", "name": "site", "list": [3]}"#);
    write(dir.path(), "notes.txt", "ignored");

    let files = list_config_files(dir.path());
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("10-base.yaml"));

    let merged = load_dir(dir.path()).unwrap();
    // The marker survives loading so later layers are still rejected.
    assert_eq!(merged["name"], "base!");
    assert_eq!(
        Value::Object(strip_force_markers(&merged)),
        json!({"level": "2", "name": "base", "list": [3]})
    );
}

#[test]
fn test_dir_with_invalid_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "a.yaml", "ok: true\n");
    write(dir.path(), "b.yaml", "- not\n- a mapping\n");
    assert!(matches!(
        load_dir(dir.path()),
        Err(ConfigError::NotAMapping { .. })
    ));
}

#[test]
fn test_env_dir_is_discovered() {
    with_env_lock(|| {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "env.yaml", "from_env: true\n");

        let saved = env::var(ENV_CONFIG_DIR).ok();
        env::set_var(ENV_CONFIG_DIR, dir.path());
        let sources = resolve_sources(&ResolveOptions::default());
        match saved {
            Some(value) => env::set_var(ENV_CONFIG_DIR, value),
            None => env::remove_var(ENV_CONFIG_DIR),
        }

        let source = sources
            .iter()
            .find(|s| s.kind == SourceKind::Environment)
            .expect("environment source");
        assert_eq!(source.name, "env");
        let tree = load_source(source).unwrap();
        assert_eq!(tree["from_env"], true);
    });
}

#[test]
fn test_cli_sources_come_last() {
    with_env_lock(|| {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("override.toml");
        fs::write(&file, "top = 1\n").expect("write");

        let options = ResolveOptions {
            dirs: vec![dir.path().to_path_buf()],
            files: vec![file.clone()],
            default_dirs: true,
        };
        let sources = resolve_sources(&options);
        let n = sources.len();
        assert!(n >= 2);
        assert_eq!(sources[n - 2].kind, SourceKind::CliDirectory);
        assert_eq!(sources[n - 1].kind, SourceKind::CliFile);
        assert_eq!(load_source(&sources[n - 1]).unwrap()["top"], 1);
    });
}
