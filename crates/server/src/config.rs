use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use flowguard_common::data_id::DEFAULT_GROUP_ID;
use flowguard_common::retry::RetryConfig;

use crate::store::NacosSettings;
use crate::sync::SyncConfig;

pub const CONFIG_ENV: &str = "FLOWGUARD_CONFIG";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_rest_addr")]
    pub rest_addr: SocketAddr,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Nacos,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_store_kind")]
    pub kind: StoreKind,
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyncSettings {
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "yes")]
    pub dashboard_sink: bool,
    #[serde(default)]
    pub consumer_sink: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: default_rest_addr(),
            store: StoreConfig::default(),
            sync: SyncSettings::default(),
            log_format: LogFormat::Text,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            server_addr: default_server_addr(),
            namespace: None,
            group_id: default_group_id(),
            poll_interval_ms: default_poll_interval_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            confirm_timeout_ms: default_confirm_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            dashboard_sink: true,
            consumer_sink: false,
        }
    }
}

impl StoreConfig {
    pub fn nacos_settings(&self) -> NacosSettings {
        NacosSettings {
            server_addr: self.server_addr.clone(),
            namespace: self.namespace.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            retry: RetryConfig::default(),
        }
    }
}

impl SyncSettings {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            confirm_timeout: Duration::from_millis(self.confirm_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            dashboard_sink: self.dashboard_sink,
            consumer_sink: self.consumer_sink,
        }
    }
}

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Validation(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_yaml::Error> for LoadError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse(e)
    }
}

/// Reads the file named by `FLOWGUARD_CONFIG`, or falls back to defaults.
pub fn load_from_env() -> Result<ServerConfig, LoadError> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.is_empty() => load_from_file(Path::new(&path)),
        _ => Ok(ServerConfig::default()),
    }
}

pub fn load_from_file(path: &Path) -> Result<ServerConfig, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(yaml: &str) -> Result<ServerConfig, LoadError> {
    let cfg: ServerConfig = serde_yaml::from_str(yaml)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &ServerConfig) -> Result<(), LoadError> {
    if cfg.store.group_id.trim().is_empty() {
        return Err(LoadError::Validation("store.group_id must not be empty".into()));
    }
    if cfg.store.kind == StoreKind::Nacos && cfg.store.server_addr.trim().is_empty() {
        return Err(LoadError::Validation(
            "store.server_addr must not be empty for nacos".into(),
        ));
    }
    if cfg.store.poll_interval_ms == 0 || cfg.store.write_timeout_ms == 0 {
        return Err(LoadError::Validation(
            "store.poll_interval_ms and store.write_timeout_ms must be > 0".into(),
        ));
    }
    if cfg.sync.confirm_timeout_ms == 0 || cfg.sync.read_timeout_ms == 0 {
        return Err(LoadError::Validation("sync timeouts must be > 0".into()));
    }
    if !cfg.sync.dashboard_sink && !cfg.sync.consumer_sink {
        return Err(LoadError::Validation(
            "at least one of sync.dashboard_sink and sync.consumer_sink must be enabled".into(),
        ));
    }
    Ok(())
}

fn default_rest_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_store_kind() -> StoreKind {
    StoreKind::Nacos
}

fn default_server_addr() -> String {
    "http://127.0.0.1:8848/nacos".to_string()
}

fn default_group_id() -> String {
    DEFAULT_GROUP_ID.to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_write_timeout_ms() -> u64 {
    3000
}

fn default_confirm_timeout_ms() -> u64 {
    2000
}

fn default_read_timeout_ms() -> u64 {
    3000
}

fn yes() -> bool {
    true
}
