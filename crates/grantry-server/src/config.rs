//! Server configuration

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use grantry_db::DatabaseConfig;
use grantry_engine::{CheckerOptions, DispatchMode, GroupSpec, SeedOptions};
use grantry_store::CachedStoreConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub checker: CheckerSettings,
    #[serde(default)]
    pub events: EventSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub seed: SeedOptions,
    /// Permission groups defined from configuration
    #[serde(default)]
    pub definitions: Vec<GroupSpec>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Without a url the in-memory stores are used
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    pub idle_secs: Option<u64>,
    #[serde(default = "default_true")]
    pub invalidate_on_write: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckerSettings {
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventSettings {
    #[serde(default)]
    pub dispatch: DispatchMode,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSettings {
    /// Guard admin routes with the PermissionManagement permissions
    #[serde(default)]
    pub admin_guard: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_run_migrations() -> bool {
    true
}

fn default_true() -> bool {
    true
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_cache_ttl() -> u64 {
    300
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
            idle_secs: None,
            invalidate_on_write: true,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // GRANTRY__DATABASE__URL, GRANTRY__CACHE__ENABLED, ...
            .add_source(
                config::Environment::with_prefix("GRANTRY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Ok(builder.build()?.try_deserialize()?)
    }
}

impl DatabaseSettings {
    pub fn to_config(&self) -> Option<DatabaseConfig> {
        let url = self.url.as_ref().filter(|u| !u.trim().is_empty())?;
        Some(DatabaseConfig {
            url: url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            run_migrations: self.run_migrations,
            ..DatabaseConfig::default()
        })
    }
}

impl CacheSettings {
    pub fn to_config(&self) -> CachedStoreConfig {
        CachedStoreConfig {
            enabled: self.enabled,
            max_capacity: self.max_capacity,
            time_to_live: Duration::from_secs(self.ttl_secs),
            time_to_idle: self.idle_secs.map(Duration::from_secs),
            invalidate_on_write: self.invalidate_on_write,
        }
    }
}

impl CheckerSettings {
    pub fn to_options(&self) -> CheckerOptions {
        CheckerOptions {
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}
