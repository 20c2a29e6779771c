//! TOML-based configuration for fishnet nodes.

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use fishnet_core::constants::{DEDUP_BUCKETS, DEDUP_ENTRY_TTL_SECS, MAX_TTL};
use fishnet_core::types::FishAddr;
use fishnet_transport::{DedupConfig, RouterConfig};

use crate::error::NodeError;

/// Top-level node configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub dedup: DedupSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub link: LinkSection,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }

    /// Router policy derived from the `[node]` and `[dedup]` sections.
    pub fn router_config(&self) -> Result<RouterConfig, NodeError> {
        if self.node.max_ttl == 0 {
            return Err(NodeError::Config("max_ttl must be at least 1".into()));
        }
        if self.dedup.buckets == 0 {
            return Err(NodeError::Config("dedup buckets must be at least 1".into()));
        }
        Ok(RouterConfig {
            max_ttl: self.node.max_ttl,
            dedup: DedupConfig {
                entry_ttl_secs: self.dedup.entry_ttl_secs,
                buckets: self.dedup.buckets,
                capacity: self.dedup.capacity,
            },
        })
    }
}

/// The `[node]` section.
#[derive(Debug, Deserialize)]
pub struct NodeSection {
    /// This node's fishnet address, e.g. `F-1.0.0.1`.
    #[serde(default = "default_address")]
    pub address: String,
    /// TTL used for originated frames that request 0 or too much.
    #[serde(default = "default_max_ttl")]
    pub max_ttl: u8,
}

fn default_address() -> String {
    "F-1.0.0.1".to_string()
}

fn default_max_ttl() -> u8 {
    MAX_TTL
}

impl NodeSection {
    pub fn address(&self) -> Result<FishAddr, NodeError> {
        parse_fish_addr(&self.address)
    }
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            max_ttl: default_max_ttl(),
        }
    }
}

/// The `[dedup]` section.
#[derive(Debug, Deserialize)]
pub struct DedupSection {
    #[serde(default = "default_entry_ttl")]
    pub entry_ttl_secs: u64,
    #[serde(default = "default_buckets")]
    pub buckets: usize,
    /// Maximum stored sightings. Unbounded when absent.
    pub capacity: Option<usize>,
    /// Seconds between sweeps of expired sightings. 0 disables. Default: 30.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_entry_ttl() -> u64 {
    DEDUP_ENTRY_TTL_SECS
}

fn default_buckets() -> usize {
    DEDUP_BUCKETS
}

fn default_sweep_interval() -> u64 {
    30
}

impl Default for DedupSection {
    fn default() -> Self {
        Self {
            entry_ttl_secs: default_entry_ttl(),
            buckets: default_buckets(),
            capacity: None,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// The `[link]` section: the UDP socket standing in for the link layer.
#[derive(Debug, Deserialize)]
pub struct LinkSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub neighbors: Vec<NeighborEntry>,
}

fn default_bind() -> String {
    "127.0.0.1:0".to_string()
}

impl Default for LinkSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            neighbors: Vec::new(),
        }
    }
}

/// A `[[link.neighbors]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NeighborEntry {
    pub address: String,
    pub socket: String,
}

/// A `[[routes]]` entry for a static route.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteEntry {
    pub destination: String,
    #[serde(default = "default_prefix_len")]
    pub prefix_len: u8,
    pub next_hop: String,
    #[serde(default = "default_metric")]
    pub metric: u32,
}

fn default_prefix_len() -> u8 {
    32
}

fn default_metric() -> u32 {
    1
}

/// Parse a fishnet address, naming it in the error.
pub fn parse_fish_addr(s: &str) -> Result<FishAddr, NodeError> {
    s.parse::<FishAddr>()
        .map_err(|e| NodeError::Config(format!("invalid fishnet address '{s}': {e}")))
}

pub fn parse_socket_addr(s: &str) -> Result<SocketAddr, NodeError> {
    s.parse::<SocketAddr>()
        .map_err(|e| NodeError::Config(format!("invalid socket address '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_toml() {
        let config = NodeConfig::parse("").unwrap();
        assert_eq!(config.node.address, "F-1.0.0.1");
        assert_eq!(config.node.max_ttl, MAX_TTL);
        assert_eq!(config.dedup.entry_ttl_secs, 120);
        assert_eq!(config.dedup.buckets, 1024);
        assert!(config.dedup.capacity.is_none());
        assert_eq!(config.dedup.sweep_interval_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.link.bind, "127.0.0.1:0");
        assert!(config.link.neighbors.is_empty());
        assert!(config.routes.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[node]
address = "F-10.0.0.1"
max_ttl = 16

[dedup]
entry_ttl_secs = 60
buckets = 64
capacity = 5000
sweep_interval_secs = 5

[logging]
level = "debug"

[link]
bind = "127.0.0.1:7001"

[[link.neighbors]]
address = "F-10.0.0.2"
socket = "127.0.0.1:7002"

[[link.neighbors]]
address = "F-10.0.0.3"
socket = "127.0.0.1:7003"

[[routes]]
destination = "F-20.0.0.0"
prefix_len = 8
next_hop = "F-10.0.0.2"
metric = 3

[[routes]]
destination = "F-30.0.0.1"
next_hop = "F-10.0.0.3"
"#;
        let config = NodeConfig::parse(toml).unwrap();
        assert_eq!(
            config.node.address().unwrap(),
            FishAddr::from_octets([10, 0, 0, 1])
        );
        assert_eq!(config.node.max_ttl, 16);
        assert_eq!(config.dedup.capacity, Some(5000));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.link.bind, "127.0.0.1:7001");
        assert_eq!(config.link.neighbors.len(), 2);
        assert_eq!(config.link.neighbors[1].socket, "127.0.0.1:7003");
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].prefix_len, 8);
        assert_eq!(config.routes[0].metric, 3);
        assert_eq!(config.routes[1].prefix_len, 32);
        assert_eq!(config.routes[1].metric, 1);

        let router = config.router_config().unwrap();
        assert_eq!(router.max_ttl, 16);
        assert_eq!(router.dedup.entry_ttl_secs, 60);
        assert_eq!(router.dedup.buckets, 64);
        assert_eq!(router.dedup.capacity, Some(5000));
    }

    #[test]
    fn test_router_config_rejects_zero_max_ttl() {
        let config = NodeConfig::parse("[node]\nmax_ttl = 0\n").unwrap();
        assert!(matches!(config.router_config(), Err(NodeError::Config(_))));
    }

    #[test]
    fn test_router_config_rejects_zero_buckets() {
        let config = NodeConfig::parse("[dedup]\nbuckets = 0\n").unwrap();
        assert!(matches!(config.router_config(), Err(NodeError::Config(_))));
    }

    #[test]
    fn test_parse_malformed_toml() {
        let result = NodeConfig::parse("[node\naddress = ");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn test_parse_wrong_field_types() {
        let result = NodeConfig::parse("[node]\nmax_ttl = \"many\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_max_ttl_out_of_range() {
        let result = NodeConfig::parse("[node]\nmax_ttl = 300\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_fish_addr() {
        let config = NodeConfig::parse("[node]\naddress = \"10.0.0\"\n").unwrap();
        assert!(matches!(config.node.address(), Err(NodeError::Config(_))));
    }

    #[test]
    fn test_parse_socket_addr() {
        assert!(parse_socket_addr("127.0.0.1:7000").is_ok());
        assert!(parse_socket_addr("localhost").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = NodeConfig::load(Path::new("/nonexistent/fishnode.toml"));
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
