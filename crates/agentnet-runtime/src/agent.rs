//! Agent node: keeps one agent registered and heartbeating.

use crate::discovery_client::DiscoveryClient;
use agentnet_types::agent::{AgentRecord, AgentRegistration};
use agentnet_types::config::AgentConfig;
use agentnet_types::error::{AgentNetError, AgentNetResult};
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// `"{kind}-{8 hex chars}"`.
pub fn generate_agent_id(kind: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{kind}-{}", &hex[..8])
}

/// Register with discovery, treating a conflict with our own earlier
/// registration (same endpoint) as success.
async fn register_with(
    discovery: &DiscoveryClient,
    registration: &AgentRegistration,
) -> AgentNetResult<AgentRecord> {
    match discovery.register(registration).await {
        Ok(record) => Ok(record),
        Err(AgentNetError::Conflict(reason)) => {
            let existing = discovery.get(&registration.id).await?;
            if existing.endpoint == registration.endpoint {
                debug!(agent_id = %registration.id, "Already registered at this endpoint");
                Ok(existing)
            } else {
                Err(AgentNetError::Conflict(reason))
            }
        }
        Err(e) => Err(e),
    }
}

async fn heartbeat_loop(
    discovery: DiscoveryClient,
    registration: AgentRegistration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let id = registration.id.as_str();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match discovery.heartbeat(id).await {
                    Ok(()) => debug!(agent_id = %id, "Heartbeat sent"),
                    Err(AgentNetError::NotFound(_)) => {
                        warn!(agent_id = %id, "Discovery forgot this agent, re-registering");
                        if let Err(e) = register_with(&discovery, &registration).await {
                            warn!(agent_id = %id, error = %e, "Re-registration failed");
                        }
                    }
                    Err(e) => warn!(agent_id = %id, error = %e, "Heartbeat failed, retrying next tick"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!(agent_id = %id, "Heartbeat loop stopping");
                    return;
                }
            }
        }
    }
}

/// Lifecycle wrapper for one agent.
pub struct AgentNode {
    registration: AgentRegistration,
    discovery: DiscoveryClient,
    heartbeat_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    heartbeat_task: Mutex<Option<JoinHandle<()>>>,
}

impl AgentNode {
    pub fn new(
        registration: AgentRegistration,
        discovery: DiscoveryClient,
        heartbeat_interval: Duration,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            registration,
            discovery,
            heartbeat_interval: heartbeat_interval.max(Duration::from_millis(1)),
            shutdown_tx,
            heartbeat_task: Mutex::new(None),
        }
    }

    /// Build the registration from the `[agent]` config section. The id is
    /// generated when not configured; the name defaults to the id.
    pub fn from_config(
        config: &AgentConfig,
        capabilities: BTreeSet<String>,
        discovery: DiscoveryClient,
    ) -> Self {
        let id = config
            .id
            .clone()
            .unwrap_or_else(|| generate_agent_id(&config.kind));
        let name = config.name.clone().unwrap_or_else(|| id.clone());
        let mut registration =
            AgentRegistration::new(id, name, config.kind.as_str(), config.resolved_endpoint());
        registration.capabilities = capabilities;
        Self::new(registration, discovery, config.heartbeat_interval())
    }

    pub fn id(&self) -> &str {
        &self.registration.id
    }

    pub fn registration(&self) -> &AgentRegistration {
        &self.registration
    }

    pub fn discovery(&self) -> &DiscoveryClient {
        &self.discovery
    }

    /// Register once, without starting the heartbeat loop.
    pub async fn register(&self) -> AgentNetResult<AgentRecord> {
        register_with(&self.discovery, &self.registration).await
    }

    /// Register and start heartbeating.
    pub async fn start(&self) -> AgentNetResult<AgentRecord> {
        let record = self.register().await?;
        info!(
            agent_id = %record.id,
            kind = %record.kind,
            endpoint = %record.endpoint,
            discovery = %self.discovery.base_url(),
            "Agent registered"
        );

        let task = tokio::spawn(heartbeat_loop(
            self.discovery.clone(),
            self.registration.clone(),
            self.heartbeat_interval,
            self.shutdown_tx.subscribe(),
        ));
        let previous = self
            .heartbeat_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(record)
    }

    /// Stop heartbeating and unregister. Unregister failures are logged; the
    /// record will expire on its own.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        let task = self
            .heartbeat_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }

        match self.discovery.unregister(self.id()).await {
            Ok(()) => info!(agent_id = %self.id(), "Agent unregistered"),
            Err(e) => warn!(agent_id = %self.id(), error = %e, "Unregister failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client_over, discovery_transport};
    use agentnet_registry::{DiscoveryService, RegistryStore};

    fn setup(interval: Duration) -> (DiscoveryService, AgentNode) {
        let service = DiscoveryService::new(RegistryStore::new());
        let discovery = DiscoveryClient::new(
            "http://discovery.test",
            client_over(discovery_transport(service.clone())),
        )
        .unwrap();
        let registration = AgentRegistration::new("search-1", "s", "search", "http://s1:8001")
            .with_capability("web_search");
        (service, AgentNode::new(registration, discovery, interval))
    }

    #[test]
    fn test_generated_id_format() {
        let id = generate_agent_id("search");
        let (kind, hex) = id.split_once('-').unwrap();
        assert_eq!(kind, "search");
        assert_eq!(hex.len(), 8);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_agent_id("search"));
    }

    #[test]
    fn test_from_config_fills_identity() {
        let (_, node) = setup(Duration::from_secs(10));
        let config = AgentConfig {
            kind: "paper".to_string(),
            endpoint: Some("http://papers:9000".to_string()),
            ..AgentConfig::default()
        };
        let caps: BTreeSet<String> = ["paper_search".to_string()].into();
        let node = AgentNode::from_config(&config, caps, node.discovery().clone());

        assert!(node.id().starts_with("paper-"));
        assert_eq!(node.registration().name, node.id());
        assert_eq!(node.registration().endpoint, "http://papers:9000");
        assert!(node.registration().capabilities.contains("paper_search"));
    }

    #[tokio::test]
    async fn test_start_registers_and_shutdown_unregisters() {
        let (service, node) = setup(Duration::from_secs(10));
        let record = node.start().await.unwrap();
        assert_eq!(record.id, "search-1");
        assert!(service.get("search-1").is_ok());

        node.shutdown().await;
        assert!(service.get("search-1").is_err());
    }

    #[tokio::test]
    async fn test_conflict_with_same_endpoint_is_success() {
        let (service, node) = setup(Duration::from_secs(10));
        service.register(node.registration().clone()).unwrap();
        assert_eq!(node.register().await.unwrap().endpoint, "http://s1:8001");

        let mut other = node.registration().clone();
        other.endpoint = "http://elsewhere:1".to_string();
        service.unregister("search-1");
        service.register(other).unwrap();
        assert!(matches!(
            node.register().await,
            Err(AgentNetError::Conflict(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_loop_reregisters_after_eviction() {
        let (service, node) = setup(Duration::from_secs(10));
        node.start().await.unwrap();

        service.unregister("search-1");
        tokio::time::sleep(Duration::from_secs(11)).await;

        let record = service.get("search-1").unwrap();
        assert_eq!(record.endpoint, "http://s1:8001");
        node.shutdown().await;
    }
}
