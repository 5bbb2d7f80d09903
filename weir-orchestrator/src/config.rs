//! Orchestrator configuration
//!
//! Defines all configurable parameters of the orchestrator: where it
//! listens, which collaborators it talks to, and how it paces node calls.

use std::time::Duration;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API binds to (e.g., "0.0.0.0:8080")
    pub bind_addr: String,

    /// Postgres URL; pipelines are kept in memory when unset
    pub database_url: Option<String>,

    /// Credential service base URL; secrets stay encrypted when unset
    pub credentials_url: Option<String>,

    /// Timeout of a single node request
    pub node_request_timeout: Duration,

    /// Node calls allowed in flight at once
    pub max_concurrent_node_calls: usize,

    /// Status messages kept per pipeline
    pub status_history_limit: usize,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(bind_addr: String) -> Self {
        Self {
            bind_addr,
            database_url: None,
            credentials_url: None,
            node_request_timeout: Duration::from_secs(10),
            max_concurrent_node_calls: 16,
            status_history_limit: 100,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - ORCHESTRATOR_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - DATABASE_URL (optional)
    /// - CREDENTIALS_URL (optional)
    /// - NODE_REQUEST_TIMEOUT (optional, seconds, default: 10)
    /// - MAX_CONCURRENT_NODE_CALLS (optional, default: 16)
    /// - STATUS_HISTORY_LIMIT (optional, default: 100)
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            std::env::var("ORCHESTRATOR_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let credentials_url = std::env::var("CREDENTIALS_URL").ok().filter(|s| !s.is_empty());

        let node_request_timeout = std::env::var("NODE_REQUEST_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let max_concurrent_node_calls = std::env::var("MAX_CONCURRENT_NODE_CALLS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(16);

        let status_history_limit = std::env::var("STATUS_HISTORY_LIMIT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(100);

        Ok(Self {
            bind_addr,
            database_url,
            credentials_url,
            node_request_timeout,
            max_concurrent_node_calls,
            status_history_limit,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if let Some(url) = &self.credentials_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("credentials_url must start with http:// or https://");
            }
        }

        if self.node_request_timeout.is_zero() {
            anyhow::bail!("node_request_timeout must be greater than 0");
        }

        if self.max_concurrent_node_calls == 0 {
            anyhow::bail!("max_concurrent_node_calls must be greater than 0");
        }

        if self.status_history_limit == 0 {
            anyhow::bail!("status_history_limit must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("0.0.0.0:8080".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.node_request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_concurrent_node_calls, 16);
        assert_eq!(config.status_history_limit, 100);
        assert!(config.database_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.credentials_url = Some("vault:8090".to_string());
        assert!(config.validate().is_err());

        config.credentials_url = Some("http://vault:8090".to_string());
        assert!(config.validate().is_ok());

        config.max_concurrent_node_calls = 0;
        assert!(config.validate().is_err());

        config.max_concurrent_node_calls = 4;
        config.node_request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
