//! Concurrency tests for the discovery registry.
//!
//! These run registration, heartbeat, and sweep traffic from many tokio
//! tasks at once against a shared store and check that the registry never
//! ends up with duplicate, lost, or corrupted records.

use agentnet_registry::{DiscoveryService, LivenessPolicy, ManualClock, RegistryStore};
use agentnet_types::agent::{AgentFilter, AgentRegistration, AgentStatus};
use agentnet_types::error::AgentNetError;
use std::sync::Arc;
use std::time::Duration;

fn service_with_clock() -> (DiscoveryService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    (
        DiscoveryService::new(RegistryStore::with_clock(clock.clone()).with_policy(policy())),
        clock,
    )
}

fn policy() -> LivenessPolicy {
    LivenessPolicy::new(Duration::from_secs(30), Duration::from_secs(90)).unwrap()
}

fn registration(id: &str, endpoint: &str) -> AgentRegistration {
    AgentRegistration::new(id, "agent", "search", endpoint).with_capability("web_search")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_register_has_one_winner() {
    let (service, _clock) = service_with_clock();

    let tasks: Vec<_> = (0..2)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service.register(registration("a1", &format!("http://host-{i}:8000")))
            })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AgentNetError::Conflict(_))))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);

    let all = service.store().list(&AgentFilter::any());
    assert_eq!(all.len(), 1);
    let winner = results.into_iter().find_map(Result::ok).unwrap();
    assert_eq!(all[0].endpoint, winner.endpoint);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_ids_register_concurrently() {
    let (service, _clock) = service_with_clock();

    let tasks: Vec<_> = (0..64)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service.register(registration(&format!("agent-{i}"), "http://h:1"))
            })
        })
        .collect();
    for task in futures::future::join_all(tasks).await {
        assert!(task.unwrap().is_ok());
    }

    assert_eq!(service.list(&AgentFilter::any()).len(), 64);
    assert!(service.store().check_integrity().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_heartbeats_racing_sweeps_are_never_lost() {
    let (service, clock) = service_with_clock();
    let sweeper = service.sweeper(Duration::from_secs(10));

    for i in 0..32 {
        service
            .register(registration(&format!("agent-{i}"), "http://h:1"))
            .unwrap();
    }

    // Push every record right up to the heartbeat TTL, then race a burst of
    // heartbeats against sweeps. A heartbeat always lands either before the
    // sweep reads the record (fresh timestamp, stays ACTIVE) or after it
    // (flips STALE back to ACTIVE), so every agent must end ACTIVE.
    clock.advance(Duration::from_secs(31));

    let heartbeats: Vec<_> = (0..32)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move { service.heartbeat(&format!("agent-{i}")) })
        })
        .collect();
    let sweeps: Vec<_> = (0..4)
        .map(|_| {
            let sweeper = sweeper.clone();
            tokio::spawn(async move { sweeper.sweep_once() })
        })
        .collect();

    for hb in futures::future::join_all(heartbeats).await {
        assert!(hb.unwrap().is_ok());
    }
    for sweep in futures::future::join_all(sweeps).await {
        assert!(sweep.unwrap().is_ok());
    }

    let records = service
        .store()
        .list(&AgentFilter::any().with_statuses(&[AgentStatus::Active, AgentStatus::Stale]));
    assert_eq!(records.len(), 32);
    assert!(records.iter().all(|r| r.status == AgentStatus::Active));
}

#[tokio::test]
async fn test_untouched_past_eviction_is_absent() {
    let (service, clock) = service_with_clock();
    let sweeper = service.sweeper(Duration::from_secs(10));

    service.register(registration("a1", "http://h:1")).unwrap();
    service.register(registration("a2", "http://h:2")).unwrap();

    for _ in 0..10 {
        clock.advance(Duration::from_secs(10));
        service.heartbeat("a2").unwrap();
        sweeper.sweep_once().unwrap();
    }

    let listed: Vec<String> = service
        .list(&AgentFilter::any())
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(listed, vec!["a2".to_string()]);
    assert!(matches!(service.get("a1"), Err(AgentNetError::NotFound(_))));
}
