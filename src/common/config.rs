//! Configuration for zkelect

use crate::common::target::ConnectionTarget;
use crate::common::utils::{join_path, normalize_path};
use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Election namespace used when the target carries no `/namespace` suffix
pub const DEFAULT_ROOT_PATH: &str = "/GOLANG_ELECTING_MASTER";

/// Leader marker node, relative to the root path
pub const DEFAULT_MASTER_PATH: &str = "/MASTER";

/// Config file looked up in the working directory by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "zkelect.toml";

/// Prefix of environment overrides (`ZKELECT_TARGET`, ...)
pub const ENV_PREFIX: &str = "ZKELECT";

/// File / environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Participant ID written into the leader marker (default: derived from the PID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    /// Connection target, `host1:port1[,host2:port2,...][/namespace]`
    #[serde(default = "default_target")]
    pub target: String,

    /// Root namespace node (overridden by the target's namespace)
    #[serde(default = "default_root_path")]
    pub root_path: String,

    /// Leader marker node, relative to `root_path`
    #[serde(default = "default_master_path")]
    pub master_path: String,

    /// How long to wait for a connected session
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Back-off of the re-election loop after a failed watch
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_target() -> String {
    "127.0.0.1:2181".to_string()
}
fn default_root_path() -> String {
    DEFAULT_ROOT_PATH.to_string()
}
fn default_master_path() -> String {
    DEFAULT_MASTER_PATH.to_string()
}
fn default_connect_timeout() -> u64 {
    3_000
}
fn default_retry_interval() -> u64 {
    1_000
}
fn default_log_level() -> String {
    "info".to_string()
}

fn default_node_id() -> String {
    format!("zkelect-{}", std::process::id())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: None,
            target: default_target(),
            root_path: default_root_path(),
            master_path: default_master_path(),
            connect_timeout_ms: default_connect_timeout(),
            retry_interval_ms: default_retry_interval(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load `zkelect.toml` (if present) and `ZKELECT_*` environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from an explicit file (required when given) plus the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<Config>()?;

        Ok(config)
    }

    /// Resolve into runtime settings, validating the target and paths
    pub fn settings(&self) -> Result<ElectionSettings> {
        let target = ConnectionTarget::parse(&self.target)?;
        let root = target.root_path_or(&self.root_path);
        let paths = ElectionPaths::new(&root, &self.master_path)?;

        if self.connect_timeout_ms == 0 {
            return Err(Error::InvalidConfig("connect timeout must be positive".into()));
        }

        let node_id = match &self.node_id {
            Some(id) if id.trim().is_empty() => {
                return Err(Error::InvalidConfig("node id cannot be empty".into()))
            }
            Some(id) => id.trim().to_string(),
            None => default_node_id(),
        };

        Ok(ElectionSettings {
            node_id,
            target,
            paths,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            retry_interval: Duration::from_millis(self.retry_interval_ms),
        })
    }
}

/// Root namespace node and the leader marker beneath it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionPaths {
    root: String,
    master: String,
}

impl ElectionPaths {
    pub fn new(root: &str, master: &str) -> Result<Self> {
        let root = normalize_path(root)
            .ok_or_else(|| Error::InvalidConfig(format!("invalid root path: {:?}", root)))?;
        let master = normalize_path(master)
            .ok_or_else(|| Error::InvalidConfig(format!("invalid master path: {:?}", master)))?;
        Ok(Self { root, master })
    }

    /// Root namespace node, always starting with `/`
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Marker path relative to the root
    pub fn master(&self) -> &str {
        &self.master
    }

    /// Effective leader marker node: root + master
    pub fn marker(&self) -> String {
        join_path(&self.root, &self.master)
    }
}

/// Resolved runtime settings of one election participant
#[derive(Debug, Clone)]
pub struct ElectionSettings {
    pub node_id: String,
    pub target: ConnectionTarget,
    pub paths: ElectionPaths,
    pub connect_timeout: Duration,
    pub retry_interval: Duration,
}

impl ElectionSettings {
    /// Settings for `target` with every other value at its default
    pub fn from_target(target: &str) -> Result<Self> {
        Config {
            target: target.to_string(),
            ..Default::default()
        }
        .settings()
    }
}
