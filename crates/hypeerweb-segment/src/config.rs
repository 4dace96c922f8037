//! Segment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use hypeerweb_topology::DEFAULT_FALLBACK_DEPTH;
use hypeerweb_transfer::SegmentAddress;
use tracing::warn;

/// Configuration for a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Data directory for the store
    pub data_dir: PathBuf,

    /// Transport listen address
    pub bind: SocketAddr,

    /// Segment holding the web; `None` when this segment holds it
    pub coordinator: Option<SegmentAddress>,

    /// Depth of the insertion/disconnection fallback search
    pub fallback_depth: usize,

    /// Seed for reproducible placement
    pub seed: Option<u64>,

    /// Nodes to create on an empty web at startup
    pub bootstrap_nodes: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SegmentConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = PathBuf::from(lookup("HYPEERWEB_DATA_DIR").unwrap_or_else(|| "./hypeerweb-data".to_string()));

        let bind = parse_or(&lookup, "HYPEERWEB_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 9300)));

        let coordinator = lookup("HYPEERWEB_COORDINATOR")
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| match s.trim().parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    warn!(value = %s, "invalid HYPEERWEB_COORDINATOR, holding the web locally");
                    None
                }
            });

        Self {
            data_dir,
            bind,
            coordinator,
            fallback_depth: parse_or(&lookup, "HYPEERWEB_FALLBACK_DEPTH", DEFAULT_FALLBACK_DEPTH),
            seed: lookup("HYPEERWEB_SEED").and_then(|s| match s.trim().parse() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    warn!(value = %s, "invalid HYPEERWEB_SEED, placing nodes unseeded");
                    None
                }
            }),
            bootstrap_nodes: parse_or(&lookup, "HYPEERWEB_BOOTSTRAP_NODES", 0),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(key, %value, "invalid value, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> SegmentConfig {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        SegmentConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]);
        assert_eq!(config.data_dir, PathBuf::from("./hypeerweb-data"));
        assert_eq!(config.bind, "0.0.0.0:9300".parse().unwrap());
        assert_eq!(config.coordinator, None);
        assert_eq!(config.fallback_depth, 2);
        assert_eq!(config.seed, None);
        assert_eq!(config.bootstrap_nodes, 0);
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("HYPEERWEB_DATA_DIR", "/var/lib/hypeerweb"),
            ("HYPEERWEB_BIND_ADDR", "127.0.0.1:9400"),
            ("HYPEERWEB_COORDINATOR", "10.0.0.1:9300"),
            ("HYPEERWEB_FALLBACK_DEPTH", "4"),
            ("HYPEERWEB_SEED", "42"),
            ("HYPEERWEB_BOOTSTRAP_NODES", "16"),
        ]);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/hypeerweb"));
        assert_eq!(config.bind, "127.0.0.1:9400".parse().unwrap());
        assert_eq!(config.coordinator, Some("10.0.0.1:9300".parse().unwrap()));
        assert_eq!(config.fallback_depth, 4);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.bootstrap_nodes, 16);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("HYPEERWEB_BIND_ADDR", "not-an-address"),
            ("HYPEERWEB_COORDINATOR", "nowhere"),
            ("HYPEERWEB_FALLBACK_DEPTH", "-1"),
            ("HYPEERWEB_SEED", "forty-two"),
        ]);
        assert_eq!(config.bind, "0.0.0.0:9300".parse().unwrap());
        assert_eq!(config.coordinator, None);
        assert_eq!(config.fallback_depth, 2);
        assert_eq!(config.seed, None);
    }
}
