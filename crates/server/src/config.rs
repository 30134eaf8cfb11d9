//! YAML configuration with `OAS_`-prefixed environment overrides (§6).
//! A `clap`-derived CLI struct would get env overrides for free from
//! `clap`'s `env` attribute on each flag; this service's configuration is
//! YAML-first, so the equivalent behavior is implemented as a generic
//! dotted-path walk over the parsed document before it is deserialized
//! into the typed structs below.

use std::path::PathBuf;

use search_types::config::IndexConfig;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "OAS";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl ServerConfig {
    /// Basic auth is enabled iff both credentials are non-empty (§6).
    pub fn auth_enabled(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { host: default_host(), port: default_port(), username: String::new(), password: String::new() }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7700
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_mongo_timeout")]
    pub timeout: u64,
}

fn default_mongo_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_flush_interval")]
    pub flush_interval: u64,
    #[serde(default = "default_sync_state_path")]
    pub sync_state_path: PathBuf,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_bulk_indexing")]
    pub bulk_indexing: bool,
    #[serde(default = "default_prefetch_count")]
    pub prefetch_count: usize,
    #[serde(default = "default_index_buffer_size")]
    pub index_buffer_size: usize,
    /// `[ADDED]` ambient knob gating `GET /metrics` (not in §6's table).
    #[serde(default)]
    pub metrics_enabled: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            index_path: default_index_path(),
            batch_size: default_batch_size(),
            flush_interval: default_flush_interval(),
            sync_state_path: default_sync_state_path(),
            worker_count: default_worker_count(),
            bulk_indexing: default_bulk_indexing(),
            prefetch_count: default_prefetch_count(),
            index_buffer_size: default_index_buffer_size(),
            metrics_enabled: false,
        }
    }
}

impl SearchConfig {
    pub fn pipeline_options(&self) -> indexing_pipeline::PipelineOptions {
        indexing_pipeline::PipelineOptions {
            batch_size: self.batch_size,
            bulk_indexing: self.bulk_indexing,
            flush_interval_secs: self.flush_interval,
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./data/indexes")
}

fn default_batch_size() -> usize {
    1000
}

fn default_flush_interval() -> u64 {
    5
}

fn default_sync_state_path() -> PathBuf {
    PathBuf::from("./data/sync_state.json")
}

fn default_worker_count() -> usize {
    num_cpus()
}

fn default_bulk_indexing() -> bool {
    true
}

fn default_prefetch_count() -> usize {
    2
}

fn default_index_buffer_size() -> usize {
    50_000_000
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_node_id")]
    pub node_id: u64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_raft_port")]
    pub raft_port: u16,
    #[serde(default = "default_raft_dir")]
    pub raft_dir: PathBuf,
    #[serde(default = "default_cluster_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub bootstrap: bool,
    #[serde(default)]
    pub join_addr: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            enabled: false,
            node_id: default_node_id(),
            bind_addr: default_bind_addr(),
            raft_port: default_raft_port(),
            raft_dir: default_raft_dir(),
            data_dir: default_cluster_data_dir(),
            bootstrap: false,
            join_addr: Vec::new(),
        }
    }
}

impl ClusterConfig {
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.raft_port)
    }
}

fn default_node_id() -> u64 {
    1
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_raft_port() -> u16 {
    7701
}

fn default_raft_dir() -> PathBuf {
    PathBuf::from("./data/raft")
}

fn default_cluster_data_dir() -> PathBuf {
    PathBuf::from("./data/cluster")
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl From<Error> for search_types::Error {
    fn from(e: Error) -> Self {
        search_types::Error::ConfigInvalid(e.to_string())
    }
}

/// Injects `username`/`password` into a mongo connection string when set,
/// per mongodb's URI grammar; kept minimal rather than pulling in a URL
/// crate for it.
pub fn mongo_uri(cfg: &MongoConfig) -> String {
    if cfg.username.is_empty() {
        return cfg.uri.clone();
    }
    match cfg.uri.split_once("://") {
        Some((scheme, rest)) => format!("{scheme}://{}:{}@{rest}", cfg.username, cfg.password),
        None => cfg.uri.clone(),
    }
}

/// Loads `path`, applies `OAS_`-prefixed env overrides, and deserializes
/// into [`AppConfig`]. A malformed document or an env override of the
/// wrong type is `ConfigInvalid`, fatal at startup (§7).
pub fn load(path: &std::path::Path) -> Result<AppConfig, Error> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::Read(path.to_path_buf(), e))?;
    let mut value: serde_yaml::Value = serde_yaml::from_str(&raw)?;
    apply_env_overrides(&mut value, ENV_PREFIX.to_string());
    let config: AppConfig = serde_yaml::from_value(value)?;
    Ok(config)
}

/// Recursively walks a YAML mapping, and for every scalar leaf whose
/// dotted path (uppercased, `.` -> `_`, `prefix` prepended) names a set
/// environment variable, replaces the leaf with that variable's value
/// (re-parsed as YAML so booleans/numbers round-trip, falling back to a
/// plain string). Sequences (like `indexes[]`) are not individually
/// addressable this way and are left untouched, matching §6's wording
/// ("any key" — not "any array element").
fn apply_env_overrides(value: &mut serde_yaml::Value, path: String) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, child) in map.iter_mut() {
                let Some(key_str) = key.as_str() else { continue };
                let child_path = format!("{path}_{}", key_str.to_uppercase());
                apply_env_overrides(child, child_path);
            }
        }
        scalar => {
            if let Ok(raw) = std::env::var(&path) {
                *scalar = serde_yaml::from_str(&raw).unwrap_or(serde_yaml::Value::String(raw));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_yaml() -> &'static str {
        r#"
mongodb:
  uri: mongodb://localhost:27017
  database: shop
server:
  port: 7700
"#
    }

    #[test]
    fn loads_defaults_when_sections_absent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, base_yaml()).unwrap();
        let cfg = load(&path).unwrap();
        assert_eq!(cfg.server.port, 7700);
        assert!(!cfg.server.auth_enabled());
        assert_eq!(cfg.search.batch_size, 1000);
        assert!(cfg.indexes.is_empty());
    }

    #[test]
    fn env_override_replaces_a_nested_scalar() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, base_yaml()).unwrap();
        std::env::set_var("OAS_SERVER_PORT", "9999");
        let cfg = load(&path).unwrap();
        std::env::remove_var("OAS_SERVER_PORT");
        assert_eq!(cfg.server.port, 9999);
    }

    #[test]
    fn auth_enabled_requires_both_credentials() {
        let mut cfg = ServerConfig::default();
        assert!(!cfg.auth_enabled());
        cfg.username = "admin".to_string();
        assert!(!cfg.auth_enabled());
        cfg.password = "hunter2".to_string();
        assert!(cfg.auth_enabled());
    }
}
