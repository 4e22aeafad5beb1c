//! Liveness sweeper. Expires agents that stopped heartbeating.
//!
//! The sweeper runs as a background tokio task on a fixed interval. Each
//! pass walks a snapshot of the registered ids and evaluates every record
//! under its own lock (see [`RegistryStore::apply_liveness`]), so it never
//! holds more than one short critical section at a time and a concurrent
//! heartbeat is observed by this pass or the next.

use crate::store::{RegistryStore, SweepOutcome};
use agentnet_types::config::DiscoveryConfig;
use agentnet_types::error::{AgentNetError, AgentNetResult};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// TTLs driving the ACTIVE → STALE → REMOVED state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessPolicy {
    heartbeat_ttl: Duration,
    eviction_ttl: Duration,
}

impl LivenessPolicy {
    /// Build a policy. The eviction TTL may not be shorter than the
    /// heartbeat TTL.
    pub fn new(heartbeat_ttl: Duration, eviction_ttl: Duration) -> AgentNetResult<Self> {
        if eviction_ttl < heartbeat_ttl {
            return Err(AgentNetError::Config(format!(
                "eviction TTL ({eviction_ttl:?}) is shorter than heartbeat TTL ({heartbeat_ttl:?})"
            )));
        }
        Ok(Self {
            heartbeat_ttl,
            eviction_ttl,
        })
    }

    /// Policy from the discovery section of the config.
    pub fn from_config(config: &DiscoveryConfig) -> AgentNetResult<Self> {
        Self::new(config.heartbeat_ttl(), config.eviction_ttl())
    }

    pub fn heartbeat_ttl(&self) -> Duration {
        self.heartbeat_ttl
    }

    pub fn eviction_ttl(&self) -> Duration {
        self.eviction_ttl
    }

    pub(crate) fn heartbeat_ttl_chrono(&self) -> chrono::Duration {
        to_chrono(self.heartbeat_ttl)
    }

    pub(crate) fn eviction_ttl_chrono(&self) -> chrono::Duration {
        to_chrono(self.eviction_ttl)
    }
}

impl Default for LivenessPolicy {
    /// 30s heartbeat TTL, 90s eviction TTL.
    fn default() -> Self {
        Self {
            heartbeat_ttl: Duration::from_secs(30),
            eviction_ttl: Duration::from_secs(90),
        }
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

/// Summary of one sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records evaluated.
    pub checked: usize,
    /// Records that went ACTIVE → STALE.
    pub marked_stale: usize,
    /// Records evicted.
    pub evicted: usize,
    /// Bad records left in place.
    pub skipped: usize,
}

impl SweepReport {
    /// Whether the pass changed anything.
    pub fn changed(&self) -> bool {
        self.marked_stale > 0 || self.evicted > 0
    }
}

/// Background expiry of stale registrations, by the store's own policy.
#[derive(Debug, Clone)]
pub struct Sweeper {
    store: RegistryStore,
    interval: Duration,
}

impl Sweeper {
    pub fn new(store: RegistryStore, interval: Duration) -> Self {
        Self {
            store,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn policy(&self) -> &LivenessPolicy {
        self.store.policy()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single pass over every record.
    ///
    /// Bad records are logged and skipped. A broken invariant aborts the pass
    /// with `RegistryCorrupted`.
    pub fn sweep_once(&self) -> AgentNetResult<SweepReport> {
        let mut report = SweepReport::default();

        for id in self.store.ids() {
            match self.store.apply_liveness(&id) {
                SweepOutcome::Unchanged => report.checked += 1,
                SweepOutcome::MarkedStale => {
                    report.checked += 1;
                    report.marked_stale += 1;
                    info!(agent_id = %id, "Agent missed its heartbeat TTL, marked stale");
                }
                SweepOutcome::Evicted => {
                    report.checked += 1;
                    report.evicted += 1;
                    info!(agent_id = %id, "Agent exceeded eviction TTL, removed");
                }
                SweepOutcome::Vanished => {
                    debug!(agent_id = %id, "Agent removed during sweep");
                }
                SweepOutcome::Skipped(reason) => {
                    report.checked += 1;
                    report.skipped += 1;
                    warn!(agent_id = %id, %reason, "Skipping bad registry record");
                }
                SweepOutcome::Corrupted(reason) => {
                    return Err(AgentNetError::RegistryCorrupted(reason));
                }
            }
        }

        self.store.check_integrity()?;
        Ok(report)
    }

    /// Spawn the sweep loop on the current tokio runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<AgentNetResult<()>> {
        tokio::spawn(self.run(shutdown))
    }

    /// Sweep every `interval` until shutdown is signalled.
    ///
    /// Returns `Err(RegistryCorrupted)` if an invariant violation is found;
    /// the hosting process must treat that as fatal.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> AgentNetResult<()> {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            heartbeat_ttl_secs = self.policy().heartbeat_ttl.as_secs(),
            eviction_ttl_secs = self.policy().eviction_ttl.as_secs(),
            "Liveness sweeper started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sweep_once() {
                        Ok(report) if report.changed() => {
                            debug!(
                                checked = report.checked,
                                marked_stale = report.marked_stale,
                                evicted = report.evicted,
                                "Sweep pass complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "Registry invariant violated, sweeper stopping");
                            return Err(e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Liveness sweeper shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }
}
