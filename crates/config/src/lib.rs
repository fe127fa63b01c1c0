use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "dispatch.toml",
    "config/dispatch.toml",
    "crates/config/dispatch.toml",
    "../dispatch.toml",
    "../config/dispatch.toml",
    "../crates/config/dispatch.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub push: PushConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            push: PushConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://dispatch.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Configuration options for out-of-band push delivery.
///
/// ```
/// use dispatch_config::PushConfig;
///
/// let push = PushConfig::default();
/// assert!(push.enabled);
/// assert_eq!(push.request_timeout_seconds, 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "PushConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "PushConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Deep-link base used in push payloads, e.g. `https://app.example.com`.
    #[serde(default)]
    pub link_base: Option<String>,
}

impl PushConfig {
    const fn default_enabled() -> bool {
        true
    }

    const fn default_request_timeout() -> u64 {
        10
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            request_timeout_seconds: Self::default_request_timeout(),
            link_base: None,
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use dispatch_config::load;
///
/// std::env::remove_var("DISPATCH_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("http.address", defaults.http.address.clone())
        .unwrap()
        .set_default("http.port", i64::from(defaults.http.port))
        .unwrap()
        .set_default("database.url", defaults.database.url.clone())
        .unwrap()
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .unwrap()
        .set_default("push.enabled", defaults.push.enabled)
        .unwrap()
        .set_default(
            "push.request_timeout_seconds",
            i64::try_from(defaults.push.request_timeout_seconds).unwrap_or(i64::MAX),
        )
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("DISPATCH").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("DISPATCH_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via DISPATCH_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
