//! Tests for the configuration loader: defaults, file discovery, and
//! environment overrides.

use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

use dispatch_config::load;

const ENV_VARS_TO_RESET: &[&str] = &[
    "DISPATCH_CONFIG",
    "DISPATCH__HTTP__ADDRESS",
    "DISPATCH__HTTP__PORT",
    "DISPATCH__DATABASE__URL",
    "DISPATCH__DATABASE__MAX_CONNECTIONS",
    "DISPATCH__PUSH__ENABLED",
    "DISPATCH__PUSH__REQUEST_TIMEOUT_SECONDS",
    "DISPATCH__PUSH__LINK_BASE",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl EnvGuard {
    fn new() -> Self {
        let mut saved = Vec::new();
        for key in ENV_VARS_TO_RESET {
            saved.push((key.to_string(), std::env::var(key).ok()));
            std::env::remove_var(key);
        }
        Self {
            saved,
            original_dir: None,
        }
    }

    fn set_var(&mut self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }

    fn change_dir(&mut self, dir: &std::path::Path) {
        self.original_dir = Some(std::env::current_dir().expect("current dir"));
        std::env::set_current_dir(dir).expect("change dir");
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
        if let Some(dir) = self.original_dir.take() {
            let _ = std::env::set_current_dir(dir);
        }
    }
}

#[test]
#[serial]
fn loads_defaults_without_file_or_env() {
    let mut guard = EnvGuard::new();
    let empty = TempDir::new().expect("temp dir");
    guard.change_dir(empty.path());

    let config = load().expect("defaults should load");

    assert_eq!(config.http.address, "127.0.0.1");
    assert_eq!(config.http.port, 7080);
    assert_eq!(config.database.url, "sqlite://dispatch.db");
    assert_eq!(config.database.max_connections, 10);
    assert!(config.push.enabled);
    assert!(config.push.link_base.is_none());
}

#[test]
#[serial]
fn environment_overrides_take_precedence() {
    let mut guard = EnvGuard::new();
    let empty = TempDir::new().expect("temp dir");
    guard.change_dir(empty.path());

    guard.set_var("DISPATCH__HTTP__PORT", "9090");
    guard.set_var("DISPATCH__DATABASE__URL", "sqlite://override.db");
    guard.set_var("DISPATCH__PUSH__ENABLED", "false");

    let config = load().expect("overridden configuration should load");

    assert_eq!(config.http.port, 9090);
    assert_eq!(config.database.url, "sqlite://override.db");
    assert!(!config.push.enabled);
}

#[test]
#[serial]
fn explicit_config_file_is_loaded() {
    let mut guard = EnvGuard::new();
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[http]
address = "0.0.0.0"
port = 8000

[push]
link_base = "https://app.example.com"
"#,
    )
    .expect("write config file");

    guard.set_var("DISPATCH_CONFIG", path.to_str().expect("utf8 path"));

    let config = load().expect("file-backed configuration should load");

    assert_eq!(config.http.address, "0.0.0.0");
    assert_eq!(config.http.port, 8000);
    assert_eq!(
        config.push.link_base.as_deref(),
        Some("https://app.example.com")
    );
    // Untouched sections keep their defaults.
    assert_eq!(config.database.max_connections, 10);
}

#[test]
#[serial]
fn config_file_in_working_directory_is_discovered() {
    let mut guard = EnvGuard::new();
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("dispatch.toml"),
        r#"
[http]
port = 8111
"#,
    )
    .expect("write config file");
    guard.change_dir(dir.path());

    let config = load().expect("discovered configuration should load");
    assert_eq!(config.http.port, 8111);
}
