use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use scriptbind_application::{CheckpointProgress, LeaseStore, PartitionLeaseCoordinator};
use scriptbind_core::AppError;
use scriptbind_domain::{LeaseConfiguration, LeaseDefaults};

use super::InMemoryLeaseStore;

const TTL: Duration = Duration::from_secs(30);

fn start() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default()
}

fn configuration() -> LeaseConfiguration {
    LeaseConfiguration {
        database_name: "db".to_owned(),
        collection_name: "orders".to_owned(),
        lease_collection_prefix: "fn1-".to_owned(),
        lease_acquire_interval_ms: 5_000,
        lease_expiration_interval_ms: 30_000,
        lease_renew_interval_ms: 10_000,
        checkpoint_document_count: 100,
        ..LeaseConfiguration::default()
    }
}

fn coordinator(store: &Arc<InMemoryLeaseStore>, owner: &str) -> PartitionLeaseCoordinator {
    PartitionLeaseCoordinator::new(
        store.clone(),
        owner,
        &configuration(),
        &LeaseDefaults::engine(),
    )
    .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn second_owner_cannot_acquire_live_lease() {
    let store = InMemoryLeaseStore::new();
    let partitions = vec!["0".to_owned()];
    assert!(store.ensure_partitions("scope", &partitions).await.is_ok());

    let first = store.try_acquire("scope", "0", "worker-a", start(), TTL).await;
    let second = store.try_acquire("scope", "0", "worker-b", start(), TTL).await;

    assert!(matches!(first, Ok(Some(_))));
    assert!(matches!(second, Ok(None)));
}

#[tokio::test]
async fn unknown_partition_is_not_found() {
    let store = InMemoryLeaseStore::new();

    let claimed = store.try_acquire("scope", "9", "worker-a", start(), TTL).await;

    assert!(matches!(claimed, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn ensure_partitions_keeps_existing_checkpoints() {
    let store = InMemoryLeaseStore::new();
    let partitions = vec!["0".to_owned(), "1".to_owned()];
    assert!(store.ensure_partitions("scope", &partitions).await.is_ok());

    let claim = store
        .try_acquire("scope", "0", "worker-a", start(), TTL)
        .await
        .ok()
        .flatten();
    let Some(claim) = claim else { unreachable!() };
    assert!(store.checkpoint(&claim, start(), 12).await.is_ok());
    assert!(store.ensure_partitions("scope", &partitions).await.is_ok());

    let leases = store.list_leases("scope").await.unwrap_or_default();
    assert_eq!(leases.len(), 2);
    assert_eq!(leases[0].checkpoint(), Some(12));
    assert!(store.list_leases("other").await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn released_lease_is_immediately_available() {
    let store = InMemoryLeaseStore::new();
    let partitions = vec!["0".to_owned()];
    assert!(store.ensure_partitions("scope", &partitions).await.is_ok());

    let Some(claim) = store
        .try_acquire("scope", "0", "worker-a", start(), TTL)
        .await
        .ok()
        .flatten()
    else {
        unreachable!()
    };
    assert!(store.release(&claim).await.is_ok());

    let reacquired = store.try_acquire("scope", "0", "worker-b", start(), TTL).await;
    assert!(matches!(reacquired, Ok(Some(_))));
    assert_eq!(store.renew(&claim, start(), TTL).await.ok(), Some(false));
}

#[tokio::test]
async fn coordinator_scope_includes_prefix() {
    let store = Arc::new(InMemoryLeaseStore::new());

    let coordinator = coordinator(&store, "worker-a");

    assert_eq!(coordinator.scope(), "fn1-db_orders");
    assert_eq!(
        coordinator.timings().lease_renew_interval,
        Duration::from_secs(10)
    );
}

#[tokio::test]
async fn coordinator_rejects_renewal_after_expiration() {
    let store = Arc::new(InMemoryLeaseStore::new());
    let configuration = LeaseConfiguration {
        lease_expiration_interval_ms: 15_000,
        lease_renew_interval_ms: 0,
        ..configuration()
    };

    let coordinator = PartitionLeaseCoordinator::new(
        store,
        "worker-a",
        &configuration,
        &LeaseDefaults::engine(),
    );

    assert!(matches!(coordinator, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn abandoned_lease_is_reclaimed_within_window_at_last_checkpoint() {
    let store = Arc::new(InMemoryLeaseStore::new());
    let worker_a = coordinator(&store, "worker-a");
    let worker_b = coordinator(&store, "worker-b");
    let partitions = vec!["0".to_owned()];
    assert!(worker_a.register_partitions(&partitions).await.is_ok());

    let claims = worker_a.acquire_available(start()).await.unwrap_or_default();
    assert_eq!(claims.len(), 1);
    assert!(worker_b.acquire_available(start()).await.unwrap_or_default().is_empty());

    let mut progress = CheckpointProgress::new(start());
    progress.record_batch(100);
    let checkpointed = worker_a
        .checkpoint_if_due(&claims[0], &mut progress, start(), 100)
        .await;
    assert_eq!(checkpointed.ok(), Some(true));

    let last_renewal = worker_a.next_renewal_at(start());
    let claims = worker_a
        .renew_claims(claims, last_renewal)
        .await
        .unwrap_or_default();
    assert_eq!(claims.len(), 1);

    // worker-a stops renewing; worker-b keeps sweeping on its acquire interval.
    let deadline = last_renewal
        + TimeDelta::from_std(worker_b.timings().reclaim_window()).unwrap_or_default();
    let mut sweep_at = start();
    let mut reclaimed = Vec::new();
    while sweep_at <= deadline && reclaimed.is_empty() {
        reclaimed = worker_b.acquire_available(sweep_at).await.unwrap_or_default();
        if reclaimed.is_empty() {
            sweep_at = worker_b.next_sweep_at(sweep_at);
        }
    }

    assert_eq!(reclaimed.len(), 1);
    assert!(sweep_at <= deadline);
    assert!(sweep_at >= last_renewal + TimeDelta::seconds(30));
    assert_eq!(reclaimed[0].owner, "worker-b");
    assert_eq!(reclaimed[0].resume_from, Some(100));

    let stale = worker_a.renew_claims(claims, sweep_at).await;
    assert!(stale.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn checkpoint_waits_for_document_threshold() {
    let store = Arc::new(InMemoryLeaseStore::new());
    let worker = coordinator(&store, "worker-a");
    let partitions = vec!["0".to_owned()];
    assert!(worker.register_partitions(&partitions).await.is_ok());
    let claims = worker.acquire_available(start()).await.unwrap_or_default();
    assert_eq!(claims.len(), 1);

    let mut progress = CheckpointProgress::new(start());
    progress.record_batch(40);
    let early = worker
        .checkpoint_if_due(&claims[0], &mut progress, start(), 40)
        .await;
    assert_eq!(early.ok(), Some(false));

    progress.record_batch(60);
    let due = worker
        .checkpoint_if_due(&claims[0], &mut progress, start(), 100)
        .await;
    assert_eq!(due.ok(), Some(true));
    assert_eq!(progress.documents_since(), 0);
}
