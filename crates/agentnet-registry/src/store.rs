//! The concurrent table of agent records.
//!
//! [`RegistryStore`] is the only shared mutable state of a discovery process.
//! Records live in a sharded [`DashMap`]: lookups and listings take shard
//! read locks and never wait on each other, while every mutation of a given
//! id runs inside that id's shard write lock, so writes on the same id are
//! serialized and compound check-then-write operations are atomic.
//!
//! Reads judge liveness by heartbeat age against the store's
//! [`LivenessPolicy`], so a record past its TTLs is reported STALE or absent
//! even before the sweeper gets to it.

use crate::clock::{Clock, SystemClock};
use crate::sweeper::LivenessPolicy;
use agentnet_types::agent::{AgentFilter, AgentRecord, AgentRegistration, AgentStatus};
use agentnet_types::error::{AgentNetError, AgentNetResult};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// How far in the future a heartbeat timestamp may lie before the record is
/// treated as bad and skipped by the sweeper.
const CLOCK_SKEW_TOLERANCE_SECS: i64 = 5;

/// What a liveness evaluation did to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Still within its TTLs.
    Unchanged,
    /// ACTIVE → STALE.
    MarkedStale,
    /// Removed after the eviction TTL.
    Evicted,
    /// The record was removed concurrently before it could be evaluated.
    Vanished,
    /// The record is unusable and was left alone.
    Skipped(String),
    /// An invariant is broken.
    Corrupted(String),
}

/// Thread-safe table of agent records, keyed by agent id.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    records: Arc<DashMap<String, AgentRecord>>,
    clock: Arc<dyn Clock>,
    policy: LivenessPolicy,
}

impl RegistryStore {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store on a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            clock,
            policy: LivenessPolicy::default(),
        }
    }

    /// Use `policy` for liveness instead of the default TTLs.
    pub fn with_policy(mut self, policy: LivenessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The TTLs this store judges liveness by.
    pub fn policy(&self) -> &LivenessPolicy {
        &self.policy
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Status a record has at `now`, or `None` once it is past eviction.
    fn effective_status(&self, record: &AgentRecord, now: DateTime<Utc>) -> Option<AgentStatus> {
        let age = now - record.last_heartbeat_at;
        if age > self.policy.eviction_ttl_chrono() {
            return None;
        }
        if age > self.policy.heartbeat_ttl_chrono() && record.status == AgentStatus::Active {
            return Some(AgentStatus::Stale);
        }
        Some(record.status)
    }

    fn observe(&self, record: &AgentRecord, now: DateTime<Utc>) -> Option<AgentRecord> {
        let status = self.effective_status(record, now)?;
        let mut record = record.clone();
        record.status = status;
        Some(record)
    }

    /// Insert or overwrite a record by id.
    pub fn put(&self, record: AgentRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// Remove a record. Absent ids are a no-op.
    pub fn remove(&self, id: &str) -> Option<AgentRecord> {
        self.records.remove(id).map(|(_, record)| record)
    }

    /// Refresh a record's heartbeat. A STALE record becomes ACTIVE again.
    ///
    /// Returns whether the record existed. A record already past eviction is
    /// dropped instead and counts as missing.
    pub fn touch(&self, id: &str) -> bool {
        let now = self.clock.now();
        match self.records.entry(id.to_string()) {
            Entry::Occupied(mut occupied) => {
                if self.effective_status(occupied.get(), now).is_none() {
                    occupied.remove();
                    return false;
                }
                let record = occupied.get_mut();
                record.last_heartbeat_at = now;
                record.status = AgentStatus::Active;
                true
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Snapshot of one record as it stands now.
    pub fn get(&self, id: &str) -> Option<AgentRecord> {
        let now = self.clock.now();
        self.records
            .get(id)
            .and_then(|r| self.observe(r.value(), now))
    }

    /// Snapshot of all records matching `filter`, ordered by id.
    pub fn list(&self, filter: &AgentFilter) -> Vec<AgentRecord> {
        let now = self.clock.now();
        let mut records: Vec<AgentRecord> = self
            .records
            .iter()
            .filter_map(|r| self.observe(r.value(), now))
            .filter(|r| filter.matches(r))
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Ids of every stored record.
    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records currently in a given status.
    pub fn count_status(&self, status: AgentStatus) -> usize {
        let now = self.clock.now();
        self.records
            .iter()
            .filter(|r| self.effective_status(r.value(), now) == Some(status))
            .count()
    }

    /// Register atomically.
    ///
    /// Inside one critical section on the id: a holder that is ACTIVE by
    /// heartbeat age means `Conflict`; a STALE or expired holder is replaced
    /// (re-registration counts as a heartbeat plus update); a free id is
    /// claimed.
    pub fn register(&self, registration: AgentRegistration) -> AgentNetResult<AgentRecord> {
        let now = self.clock.now();
        match self.records.entry(registration.id.clone()) {
            Entry::Occupied(mut occupied) => {
                if self.effective_status(occupied.get(), now) == Some(AgentStatus::Active) {
                    return Err(AgentNetError::Conflict(format!(
                        "agent '{}' is already registered and active",
                        registration.id
                    )));
                }
                let record = registration.into_record(now);
                occupied.insert(record.clone());
                Ok(record)
            }
            Entry::Vacant(vacant) => {
                let record = registration.into_record(now);
                vacant.insert(record.clone());
                Ok(record)
            }
        }
    }

    /// Apply the liveness state machine to one record.
    ///
    /// The heartbeat timestamp and the clock are both read while holding the
    /// id's write lock, so a heartbeat that lands before the lock is taken is
    /// always observed and one that lands after it is applied on top.
    pub fn apply_liveness(&self, id: &str) -> SweepOutcome {
        let policy = &self.policy;
        let mut occupied = match self.records.entry(id.to_string()) {
            Entry::Occupied(occupied) => occupied,
            Entry::Vacant(_) => return SweepOutcome::Vanished,
        };

        if occupied.key() != &occupied.get().id {
            return SweepOutcome::Corrupted(format!(
                "key '{}' holds record for '{}'",
                occupied.key(),
                occupied.get().id
            ));
        }
        if occupied.get().status == AgentStatus::Removed {
            return SweepOutcome::Corrupted(format!("record '{id}' is stored as REMOVED"));
        }

        let now = self.clock.now();
        let age = now - occupied.get().last_heartbeat_at;
        if age < -chrono::Duration::seconds(CLOCK_SKEW_TOLERANCE_SECS) {
            return SweepOutcome::Skipped(format!(
                "heartbeat of '{id}' is {}s in the future",
                -age.num_seconds()
            ));
        }

        if age > policy.eviction_ttl_chrono() {
            occupied.remove();
            return SweepOutcome::Evicted;
        }
        if age > policy.heartbeat_ttl_chrono() && occupied.get().status == AgentStatus::Active {
            occupied.get_mut().status = AgentStatus::Stale;
            return SweepOutcome::MarkedStale;
        }
        SweepOutcome::Unchanged
    }

    /// Verify store-wide invariants.
    pub fn check_integrity(&self) -> AgentNetResult<()> {
        for entry in self.records.iter() {
            if entry.key() != &entry.value().id {
                return Err(AgentNetError::RegistryCorrupted(format!(
                    "key '{}' holds record for '{}'",
                    entry.key(),
                    entry.value().id
                )));
            }
            if entry.value().status == AgentStatus::Removed {
                return Err(AgentNetError::RegistryCorrupted(format!(
                    "record '{}' is stored as REMOVED",
                    entry.key()
                )));
            }
        }
        Ok(())
    }
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}
