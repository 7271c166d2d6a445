//! Configuration Module
//!
//! Handle options and remote store service settings, loaded from environment
//! variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::sync::SyncStrategy;

// == Miss Policy ==
/// What a `get` does when a cache miss runs into a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissPolicy {
    /// Return the `Transport` error to the caller
    #[default]
    Propagate,
    /// Log the failure and report the key as absent
    TreatAsAbsent,
}

impl FromStr for MissPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "propagate" => Ok(MissPolicy::Propagate),
            "absent" | "treat_as_absent" => Ok(MissPolicy::TreatAsAbsent),
            other => Err(CacheError::Configuration(format!(
                "unknown miss policy '{}'",
                other
            ))),
        }
    }
}

// == Handle Config ==
/// Options recognized when constructing a [`CacheHandle`](crate::CacheHandle).
#[derive(Debug, Clone)]
pub struct HandleConfig {
    /// How the local cache reacts to peer mutations
    pub sync_strategy: SyncStrategy,
    /// Maximum age of a local entry, None = entries never expire
    pub time_to_live: Option<Duration>,
    /// Local entry bound, None = unbounded
    pub max_entries: Option<usize>,
    /// Upper bound on any single remote call
    pub transport_timeout: Duration,
    /// Behavior of a cache miss that fails to reach the remote store
    pub miss_policy: MissPolicy,
    /// Interval of the background expiry sweep, None = lazy expiry only
    pub cleanup_interval: Option<Duration>,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            sync_strategy: SyncStrategy::Invalidate,
            time_to_live: None,
            max_entries: None,
            transport_timeout: Duration::from_secs(3),
            miss_policy: MissPolicy::Propagate,
            cleanup_interval: None,
        }
    }
}

impl HandleConfig {
    /// Creates a HandleConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `SYNC_STRATEGY` - none | invalidate | update (default: invalidate)
    /// - `CACHE_TTL_MS` - local entry TTL in milliseconds (default: none)
    /// - `CACHE_MAX_ENTRIES` - local entry bound (default: unbounded)
    /// - `TRANSPORT_TIMEOUT_MS` - remote call timeout (default: 3000)
    /// - `MISS_POLICY` - propagate | absent (default: propagate)
    /// - `CLEANUP_INTERVAL_MS` - background sweep interval (default: none)
    ///
    /// Unparseable values are reported as `Configuration` errors rather than
    /// silently replaced by defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            sync_strategy: parse_var(&lookup, "SYNC_STRATEGY")?.unwrap_or(defaults.sync_strategy),
            time_to_live: parse_var::<u64, _>(&lookup, "CACHE_TTL_MS")?.map(Duration::from_millis),
            max_entries: parse_var(&lookup, "CACHE_MAX_ENTRIES")?,
            transport_timeout: parse_var::<u64, _>(&lookup, "TRANSPORT_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.transport_timeout),
            miss_policy: parse_var(&lookup, "MISS_POLICY")?.unwrap_or(defaults.miss_policy),
            cleanup_interval: parse_var::<u64, _>(&lookup, "CLEANUP_INTERVAL_MS")?
                .map(Duration::from_millis),
        };
        config.validate()?;
        Ok(config)
    }

    // == Builders ==
    pub fn with_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.sync_strategy = strategy;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn with_transport_timeout(mut self, timeout: Duration) -> Self {
        self.transport_timeout = timeout;
        self
    }

    pub fn with_miss_policy(mut self, policy: MissPolicy) -> Self {
        self.miss_policy = policy;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    // == Validate ==
    /// Rejects option values a handle cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.time_to_live == Some(Duration::ZERO) {
            return Err(CacheError::Configuration(
                "time_to_live must be greater than zero".to_string(),
            ));
        }
        if self.max_entries == Some(0) {
            return Err(CacheError::Configuration(
                "max_entries must be greater than zero".to_string(),
            ));
        }
        if self.transport_timeout.is_zero() {
            return Err(CacheError::Configuration(
                "transport_timeout must be greater than zero".to_string(),
            ));
        }
        if self.cleanup_interval == Some(Duration::ZERO) {
            return Err(CacheError::Configuration(
                "cleanup_interval must be greater than zero".to_string(),
            ));
        }
        if self.cleanup_interval.is_some() && self.time_to_live.is_none() {
            return Err(CacheError::Configuration(
                "cleanup_interval requires a time_to_live".to_string(),
            ));
        }
        Ok(())
    }
}

// == Server Config ==
/// Remote store service parameters.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port
    pub server_port: u16,
    /// Events retained per collection for long-poll subscribers
    pub event_log_capacity: usize,
    /// Longest a long-poll request is held open, in milliseconds
    pub long_poll_ms: u64,
}

impl ServerConfig {
    /// Creates a new ServerConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 6380)
    /// - `EVENT_LOG_CAPACITY` - retained events per collection (default: 1024)
    /// - `LONG_POLL_MS` - maximum long-poll wait (default: 15000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            event_log_capacity: env::var("EVENT_LOG_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.event_log_capacity),
            long_poll_ms: env::var("LONG_POLL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.long_poll_ms),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_port: 6380,
            event_log_capacity: 1024,
            long_poll_ms: 15_000,
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            CacheError::Configuration(format!("invalid {}='{}': {}", name, raw, e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_handle_config_default() {
        let config = HandleConfig::default();
        assert_eq!(config.sync_strategy, SyncStrategy::Invalidate);
        assert!(config.time_to_live.is_none());
        assert!(config.max_entries.is_none());
        assert_eq!(config.transport_timeout, Duration::from_secs(3));
        assert_eq!(config.miss_policy, MissPolicy::Propagate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_handle_config_from_lookup() {
        let config = HandleConfig::from_lookup(lookup_from(&[
            ("SYNC_STRATEGY", "update"),
            ("CACHE_TTL_MS", "1500"),
            ("CACHE_MAX_ENTRIES", "10"),
            ("TRANSPORT_TIMEOUT_MS", "250"),
            ("MISS_POLICY", "absent"),
        ]))
        .unwrap();

        assert_eq!(config.sync_strategy, SyncStrategy::Update);
        assert_eq!(config.time_to_live, Some(Duration::from_millis(1500)));
        assert_eq!(config.max_entries, Some(10));
        assert_eq!(config.transport_timeout, Duration::from_millis(250));
        assert_eq!(config.miss_policy, MissPolicy::TreatAsAbsent);
    }

    #[test]
    fn test_handle_config_from_lookup_defaults() {
        let config = HandleConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.sync_strategy, SyncStrategy::Invalidate);
        assert_eq!(config.transport_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_handle_config_rejects_garbage() {
        let result = HandleConfig::from_lookup(lookup_from(&[("CACHE_TTL_MS", "soon")]));
        assert!(matches!(result, Err(CacheError::Configuration(_))));

        let result = HandleConfig::from_lookup(lookup_from(&[("SYNC_STRATEGY", "eager")]));
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let zero_ttl = HandleConfig::default().with_ttl(Duration::ZERO);
        assert!(matches!(zero_ttl.validate(), Err(CacheError::Configuration(_))));

        let zero_entries = HandleConfig::default().with_max_entries(0);
        assert!(matches!(zero_entries.validate(), Err(CacheError::Configuration(_))));

        let zero_timeout = HandleConfig::default().with_transport_timeout(Duration::ZERO);
        assert!(matches!(zero_timeout.validate(), Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_validate_cleanup_needs_ttl() {
        let config = HandleConfig::default().with_cleanup_interval(Duration::from_secs(1));
        assert!(matches!(config.validate(), Err(CacheError::Configuration(_))));

        let config = config.with_ttl(Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.server_port, 6380);
        assert_eq!(config.event_log_capacity, 1024);
        assert_eq!(config.long_poll_ms, 15_000);
    }
}
