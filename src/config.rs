//! Server configuration.
//!
//! Every option can be given on the command line or through an `RDNS_*`
//! environment variable; the command line wins.

use crate::storage::config::{
    DEFAULT_CLEAN_WINDOW, DEFAULT_LIFE_WINDOW, DEFAULT_MAX_ENTRY_SIZE, DEFAULT_SHARDS,
};
use crate::storage::StoreConfig;
use clap::Parser;
use std::time::Duration;

const BYTES_PER_MB: usize = 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rdnscache",
    version,
    about = "In-memory reverse-DNS cache speaking the Redis protocol",
    after_help = "Connect with any Redis client:\n    $ redis-cli -p 6379\n    127.0.0.1:6379> SET 8.8.8.8 \"dns.google;300\"\n    OK\n    127.0.0.1:6379> GET 8.8.8.8\n    \"dns.google\""
)]
pub struct ServerConfig {
    /// Host to bind both listeners to.
    #[arg(long, env = "RDNS_HOST", default_value = crate::DEFAULT_HOST)]
    pub host: String,

    /// Port for the RESP command server.
    #[arg(short, long, env = "RDNS_PORT", default_value_t = crate::DEFAULT_PORT)]
    pub port: u16,

    /// Port for the plain-text diagnostics endpoint.
    #[arg(long, env = "RDNS_DIAG_PORT", default_value_t = crate::DEFAULT_DIAG_PORT)]
    pub diag_port: u16,

    /// Number of store shards. Must be a power of two.
    #[arg(long, env = "RDNS_SHARDS", default_value_t = DEFAULT_SHARDS)]
    pub shards: usize,

    /// Seconds after which an entry is swept. 0 disables expiry.
    #[arg(long, env = "RDNS_LIFE_WINDOW", default_value_t = DEFAULT_LIFE_WINDOW.as_secs())]
    pub life_window: u64,

    /// Seconds between background sweeps. 0 disables the sweeper.
    #[arg(long, env = "RDNS_CLEAN_WINDOW", default_value_t = DEFAULT_CLEAN_WINDOW.as_secs())]
    pub clean_window: u64,

    /// Largest encoded record accepted, in bytes. 0 means no limit.
    #[arg(long, env = "RDNS_MAX_ENTRY_SIZE", default_value_t = DEFAULT_MAX_ENTRY_SIZE)]
    pub max_entry_size: usize,

    /// Total store budget in megabytes. 0 means unbounded.
    #[arg(long, env = "RDNS_HARD_MAX_CACHE_SIZE", default_value_t = 0)]
    pub hard_max_cache_size: usize,

    /// TTL in seconds recorded for hostnames observed through SET.
    #[arg(long, env = "RDNS_DEFAULT_TTL", default_value_t = crate::commands::DEFAULT_OBSERVED_TTL)]
    pub default_ttl: u64,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, env = "RDNS_VERBOSE")]
    pub verbose: bool,
}

impl ServerConfig {
    /// Address of the RESP command server.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Address of the diagnostics endpoint.
    pub fn diag_address(&self) -> String {
        format!("{}:{}", self.host, self.diag_port)
    }

    /// Store settings. Validation happens in `ShardStore::new`.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .with_shards(self.shards)
            .with_life_window(Duration::from_secs(self.life_window))
            .with_clean_window(Duration::from_secs(self.clean_window))
            .with_max_entry_size(self.max_entry_size)
            .with_hard_max_bytes(self.hard_max_cache_size.saturating_mul(BYTES_PER_MB))
    }

    /// Default filter directive when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "rdnscache=debug"
        } else {
            "rdnscache=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["rdnscache"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);

        assert_eq!(config.bind_address(), "127.0.0.1:6379");
        assert_eq!(config.diag_address(), "127.0.0.1:8090");
        assert_eq!(config.default_ttl, 3);
        assert_eq!(config.default_log_filter(), "rdnscache=info");

        let store = config.store_config();
        assert_eq!(store, StoreConfig::default());
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--host",
            "0.0.0.0",
            "-p",
            "7000",
            "--diag-port",
            "7001",
            "--shards",
            "64",
            "--life-window",
            "60",
            "--clean-window",
            "5",
            "--max-entry-size",
            "100",
            "--hard-max-cache-size",
            "2",
            "--default-ttl",
            "30",
            "--verbose",
        ]);

        assert_eq!(config.bind_address(), "0.0.0.0:7000");
        assert_eq!(config.diag_address(), "0.0.0.0:7001");
        assert_eq!(config.default_ttl, 30);
        assert_eq!(config.default_log_filter(), "rdnscache=debug");

        let store = config.store_config();
        assert_eq!(store.shards, 64);
        assert_eq!(store.life_window, Duration::from_secs(60));
        assert_eq!(store.clean_window, Duration::from_secs(5));
        assert_eq!(store.max_entry_size, 100);
        assert_eq!(store.hard_max_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_shards_fail_validation() {
        let config = parse(&["--shards", "100"]);
        assert!(config.store_config().validate().is_err());
    }

    #[test]
    fn test_small_hard_cap_needs_fewer_shards() {
        let config = parse(&["--hard-max-cache-size", "1"]);
        assert!(config.store_config().validate().is_err());

        let config = parse(&["--hard-max-cache-size", "1", "--shards", "128"]);
        assert!(config.store_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(ServerConfig::try_parse_from(["rdnscache", "--port", "notaport"]).is_err());
    }
}
