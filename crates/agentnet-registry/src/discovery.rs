//! Discovery service: the registry's public operations.
//!
//! Every operation delegates to the [`RegistryStore`], which judges liveness
//! by heartbeat age on each read; nothing here performs network I/O.

use crate::directory::AgentDirectory;
use crate::store::RegistryStore;
use crate::sweeper::{LivenessPolicy, Sweeper};
use agentnet_types::agent::{AgentFilter, AgentRecord, AgentRegistration, AgentStatus};
use agentnet_types::error::{AgentNetError, AgentNetResult};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub active: usize,
    pub stale: usize,
}

/// Register / unregister / heartbeat / list / get over a registry store.
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    store: RegistryStore,
}

impl DiscoveryService {
    pub fn new(store: RegistryStore) -> Self {
        Self { store }
    }

    /// The backing store.
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// The TTLs reads and sweeps are judged by.
    pub fn policy(&self) -> &LivenessPolicy {
        self.store.policy()
    }

    /// A sweeper bound to this service's store and policy.
    pub fn sweeper(&self, interval: Duration) -> Sweeper {
        Sweeper::new(self.store.clone(), interval)
    }

    /// Register an agent as ACTIVE.
    ///
    /// Fails with `Conflict` while another ACTIVE registration holds the id.
    /// A STALE registration is replaced.
    pub fn register(&self, registration: AgentRegistration) -> AgentNetResult<AgentRecord> {
        if registration.id.trim().is_empty() {
            return Err(AgentNetError::Validation("agent id must not be empty".to_string()));
        }
        if registration.endpoint.trim().is_empty() {
            return Err(AgentNetError::Validation(format!(
                "agent '{}' has no endpoint",
                registration.id
            )));
        }

        let record = self.store.register(registration)?;
        info!(
            agent_id = %record.id,
            kind = %record.kind,
            endpoint = %record.endpoint,
            "Agent registered"
        );
        Ok(record)
    }

    /// Remove an agent. Unknown ids are not an error.
    pub fn unregister(&self, id: &str) {
        if self.store.remove(id).is_some() {
            info!(agent_id = %id, "Agent unregistered");
        } else {
            debug!(agent_id = %id, "Unregister for unknown agent ignored");
        }
    }

    /// Record a heartbeat. A STALE agent becomes ACTIVE again.
    pub fn heartbeat(&self, id: &str) -> AgentNetResult<()> {
        if self.store.touch(id) {
            debug!(agent_id = %id, "Heartbeat");
            Ok(())
        } else {
            Err(AgentNetError::NotFound(format!("agent '{id}' is not registered")))
        }
    }

    /// List agents. An empty status filter means ACTIVE only.
    pub fn list(&self, filter: &AgentFilter) -> Vec<AgentRecord> {
        if filter.statuses.is_empty() {
            let active_only = AgentFilter {
                statuses: vec![AgentStatus::Active],
                ..filter.clone()
            };
            self.store.list(&active_only)
        } else {
            self.store.list(filter)
        }
    }

    /// Fetch one agent, ACTIVE or STALE. Past eviction it is `NotFound`,
    /// swept or not.
    pub fn get(&self, id: &str) -> AgentNetResult<AgentRecord> {
        self.store
            .get(id)
            .ok_or_else(|| AgentNetError::NotFound(format!("agent '{id}' is not registered")))
    }

    /// Registry counters.
    pub fn stats(&self) -> DiscoveryStats {
        DiscoveryStats {
            active: self.store.count_status(AgentStatus::Active),
            stale: self.store.count_status(AgentStatus::Stale),
        }
    }
}

#[async_trait]
impl AgentDirectory for DiscoveryService {
    async fn get_agent(&self, id: &str) -> AgentNetResult<AgentRecord> {
        self.get(id)
    }

    async fn list_agents(&self, filter: &AgentFilter) -> AgentNetResult<Vec<AgentRecord>> {
        Ok(self.list(filter))
    }
}
