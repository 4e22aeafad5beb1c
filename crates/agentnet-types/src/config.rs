//! Configuration types. Loading lives in the binary crate.

use crate::error::{AgentNetError, AgentNetResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_level: String,
    pub discovery: DiscoveryConfig,
    pub client: ClientConfig,
    pub agent: AgentConfig,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            discovery: DiscoveryConfig::default(),
            client: ClientConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl NetConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> AgentNetResult<()> {
        self.discovery.validate()?;
        self.client.validate()?;
        self.agent.validate()
    }
}

/// Discovery service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Listen address of the discovery service.
    pub listen: String,
    /// Seconds without a heartbeat before an agent turns STALE.
    pub heartbeat_ttl_secs: u64,
    /// Seconds without a heartbeat before an agent is evicted.
    pub eviction_ttl_secs: u64,
    /// Sweep period. Defaults to a third of the heartbeat TTL.
    pub sweep_interval_secs: Option<u64>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8000".to_string(),
            heartbeat_ttl_secs: 30,
            eviction_ttl_secs: 90,
            sweep_interval_secs: None,
        }
    }
}

impl DiscoveryConfig {
    pub fn heartbeat_ttl(&self) -> Duration {
        Duration::from_secs(self.heartbeat_ttl_secs)
    }

    pub fn eviction_ttl(&self) -> Duration {
        Duration::from_secs(self.eviction_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        let secs = self
            .sweep_interval_secs
            .unwrap_or(self.heartbeat_ttl_secs / 3)
            .max(1);
        Duration::from_secs(secs)
    }

    pub fn validate(&self) -> AgentNetResult<()> {
        if self.heartbeat_ttl_secs == 0 {
            return Err(AgentNetError::Config(
                "discovery.heartbeat_ttl_secs must be positive".to_string(),
            ));
        }
        if self.eviction_ttl_secs < self.heartbeat_ttl_secs {
            return Err(AgentNetError::Config(format!(
                "discovery.eviction_ttl_secs ({}) must be >= heartbeat_ttl_secs ({})",
                self.eviction_ttl_secs, self.heartbeat_ttl_secs
            )));
        }
        Ok(())
    }
}

/// Resilient client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Default per-attempt deadline.
    pub timeout_ms: u64,
    /// Extra attempts after the first one, for idempotent calls.
    pub max_retries: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Jitter factor in `[0, 1]`.
    pub jitter: f64,
    /// Retry every 5xx response.
    pub retry_server_errors: bool,
    /// Additional statuses treated as transient.
    pub retryable_statuses: Vec<u16>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            min_delay_ms: 200,
            max_delay_ms: 10_000,
            jitter: 0.2,
            retry_server_errors: true,
            retryable_statuses: vec![408, 429],
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> AgentNetResult<()> {
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(AgentNetError::Config(format!(
                "client.jitter must be within [0, 1], got {}",
                self.jitter
            )));
        }
        if self.timeout_ms == 0 {
            return Err(AgentNetError::Config(
                "client.timeout_ms must be positive".to_string(),
            ));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(AgentNetError::Config(
                "client.min_delay_ms must not exceed client.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for an agent process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Fixed agent id. Generated from the kind when absent.
    pub id: Option<String>,
    pub name: Option<String>,
    pub kind: String,
    /// Listen address of the agent's HTTP server.
    pub listen: String,
    /// Public base URL. Defaults to `http://{listen}`.
    pub endpoint: Option<String>,
    pub discovery_url: String,
    pub heartbeat_interval_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            kind: "search".to_string(),
            listen: "127.0.0.1:8001".to_string(),
            endpoint: None,
            discovery_url: "http://127.0.0.1:8000".to_string(),
            heartbeat_interval_secs: 10,
        }
    }
}

impl AgentConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Public endpoint advertised to the registry.
    pub fn resolved_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.listen))
    }

    pub fn validate(&self) -> AgentNetResult<()> {
        if self.kind.trim().is_empty() {
            return Err(AgentNetError::Config("agent.kind must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = NetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.discovery.sweep_interval(), Duration::from_secs(10));
        assert_eq!(config.agent.resolved_endpoint(), "http://127.0.0.1:8001");
    }

    #[test]
    fn test_eviction_below_heartbeat_rejected() {
        let config = DiscoveryConfig {
            heartbeat_ttl_secs: 30,
            eviction_ttl_secs: 10,
            ..DiscoveryConfig::default()
        };
        assert!(matches!(config.validate(), Err(AgentNetError::Config(_))));
    }

    #[test]
    fn test_jitter_out_of_range_rejected() {
        let config = ClientConfig {
            jitter: 1.5,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sweep_interval_floor() {
        let config = DiscoveryConfig {
            heartbeat_ttl_secs: 2,
            eviction_ttl_secs: 4,
            sweep_interval_secs: None,
            ..DiscoveryConfig::default()
        };
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NetConfig = serde_json::from_str(r#"{"client": {"max_retries": 5}}"#).unwrap();
        assert_eq!(config.client.max_retries, 5);
        assert_eq!(config.client.timeout_ms, 30_000);
        assert_eq!(config.log_level, "info");
    }
}
