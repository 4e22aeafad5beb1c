//! Agent records tracked by the discovery registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Liveness status of a registered agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    /// Heartbeats are arriving within the heartbeat TTL.
    Active,
    /// Heartbeat TTL exceeded, eviction TTL not yet reached.
    Stale,
    /// Evicted or unregistered. Never stored; only reported as an outcome.
    Removed,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Active => write!(f, "ACTIVE"),
            AgentStatus::Stale => write!(f, "STALE"),
            AgentStatus::Removed => write!(f, "REMOVED"),
        }
    }
}

/// A metadata value. The registry never interprets these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Integer(n)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// A registration request: everything about an agent except the fields the
/// registry owns (status and heartbeat timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistration {
    /// Unique agent identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Role label, e.g. "search" or "paper".
    pub kind: String,
    /// Base URL used for direct calls to the agent.
    pub endpoint: String,
    /// Tool names or message types the agent can handle.
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// Opaque metadata.
    #[serde(default)]
    pub metadata: HashMap<String, MetadataValue>,
}

impl AgentRegistration {
    /// Start a registration with no capabilities or metadata.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            endpoint: endpoint.into(),
            capabilities: BTreeSet::new(),
            metadata: HashMap::new(),
        }
    }

    /// Add a capability.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Turn the registration into an ACTIVE record stamped at `now`.
    pub fn into_record(self, now: DateTime<Utc>) -> AgentRecord {
        AgentRecord {
            id: self.id,
            name: self.name,
            kind: self.kind,
            endpoint: self.endpoint,
            capabilities: self.capabilities,
            status: AgentStatus::Active,
            last_heartbeat_at: now,
            registered_at: now,
            metadata: self.metadata,
        }
    }
}

/// A registered agent as stored by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub endpoint: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    pub status: AgentStatus,
    pub last_heartbeat_at: DateTime<Utc>,
    /// When the current registration was accepted.
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, MetadataValue>,
}

impl AgentRecord {
    /// Whether the agent advertises `capability`.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Selection criteria for listing agents.
///
/// An empty `statuses` list matches every status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentFilter {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub capability: Option<String>,
    #[serde(default)]
    pub statuses: Vec<AgentStatus>,
}

impl AgentFilter {
    /// Match every record.
    pub fn any() -> Self {
        Self::default()
    }

    /// Match only ACTIVE records.
    pub fn active() -> Self {
        Self {
            statuses: vec![AgentStatus::Active],
            ..Self::default()
        }
    }

    /// Restrict to a kind.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Restrict to agents advertising a capability.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    /// Restrict to the given statuses.
    pub fn with_statuses(mut self, statuses: &[AgentStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    /// Test a record against the filter.
    pub fn matches(&self, record: &AgentRecord) -> bool {
        if let Some(kind) = &self.kind {
            if &record.kind != kind {
                return false;
            }
        }
        if let Some(capability) = &self.capability {
            if !record.has_capability(capability) {
                return false;
            }
        }
        self.statuses.is_empty() || self.statuses.contains(&record.status)
    }
}

/// Response body of the agent listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentList {
    pub agents: Vec<AgentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, caps: &[&str], status: AgentStatus) -> AgentRecord {
        let mut reg = AgentRegistration::new("a1", "alpha", kind, "http://127.0.0.1:8001");
        for cap in caps {
            reg = reg.with_capability(*cap);
        }
        let mut record = reg.into_record(Utc::now());
        record.status = status;
        record
    }

    #[test]
    fn test_registration_into_record_is_active() {
        let now = Utc::now();
        let record = AgentRegistration::new("a1", "alpha", "search", "http://h:1")
            .with_capability("web_search")
            .with_metadata("region", "eu")
            .into_record(now);
        assert_eq!(record.status, AgentStatus::Active);
        assert_eq!(record.last_heartbeat_at, now);
        assert_eq!(record.registered_at, now);
        assert!(record.has_capability("web_search"));
        assert_eq!(
            record.metadata.get("region"),
            Some(&MetadataValue::Text("eu".to_string()))
        );
    }

    #[test]
    fn test_filter_matches() {
        let active = record("search", &["web_search"], AgentStatus::Active);
        let stale = record("search", &["web_search"], AgentStatus::Stale);

        assert!(AgentFilter::any().matches(&stale));
        assert!(AgentFilter::active().matches(&active));
        assert!(!AgentFilter::active().matches(&stale));
        assert!(AgentFilter::active().with_kind("search").matches(&active));
        assert!(!AgentFilter::active().with_kind("paper").matches(&active));
        assert!(!AgentFilter::any()
            .with_capability("paper_search")
            .matches(&active));
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&AgentStatus::Stale).unwrap();
        assert_eq!(json, "\"STALE\"");
    }

    #[test]
    fn test_metadata_untagged() {
        let meta: HashMap<String, MetadataValue> =
            serde_json::from_str(r#"{"gpu": true, "slots": 4, "load": 0.5, "zone": "a"}"#).unwrap();
        assert_eq!(meta["gpu"], MetadataValue::Bool(true));
        assert_eq!(meta["slots"], MetadataValue::Integer(4));
        assert_eq!(meta["load"], MetadataValue::Float(0.5));
        assert_eq!(meta["zone"], MetadataValue::Text("a".to_string()));
    }
}
