//! In-process lease collection for change-feed workers.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scriptbind_application::{LeaseClaim, LeaseStore};
use scriptbind_core::{AppError, AppResult};
use scriptbind_domain::PartitionLease;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lease store keeping every scope in memory.
///
/// All operations on one store are serialized by a single lock, which gives
/// them the compare-and-swap behaviour a shared lease collection provides.
#[derive(Debug, Default)]
pub struct InMemoryLeaseStore {
    leases: RwLock<BTreeMap<(String, String), PartitionLease>>,
}

impl InMemoryLeaseStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(scope: &str, partition_id: &str) -> (String, String) {
    (scope.to_owned(), partition_id.to_owned())
}

fn missing(scope: &str, partition_id: &str) -> AppError {
    AppError::NotFound(format!(
        "no lease for partition '{partition_id}' in scope '{scope}'"
    ))
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn ensure_partitions(&self, scope: &str, partition_ids: &[String]) -> AppResult<()> {
        let mut leases = self.leases.write().await;

        for partition_id in partition_ids {
            let key = key(scope, partition_id);
            if !leases.contains_key(&key) {
                leases.insert(key, PartitionLease::unowned(partition_id.as_str())?);
            }
        }

        Ok(())
    }

    async fn list_leases(&self, scope: &str) -> AppResult<Vec<PartitionLease>> {
        let leases = self.leases.read().await;

        Ok(leases
            .iter()
            .filter_map(|((stored_scope, _), lease)| {
                (stored_scope == scope).then_some(lease.clone())
            })
            .collect())
    }

    async fn try_acquire(
        &self,
        scope: &str,
        partition_id: &str,
        owner: &str,
        now: DateTime<Utc>,
        time_to_live: Duration,
    ) -> AppResult<Option<LeaseClaim>> {
        if owner.trim().is_empty() {
            return Err(AppError::Validation(
                "lease owner must not be empty".to_owned(),
            ));
        }

        let mut leases = self.leases.write().await;
        let lease = leases
            .get_mut(&key(scope, partition_id))
            .ok_or_else(|| missing(scope, partition_id))?;

        if !lease.is_available(now) {
            return Ok(None);
        }

        let token = format!("{owner}:{}", Uuid::new_v4());
        lease.acquire(owner, token.as_str(), now, time_to_live)?;

        Ok(Some(LeaseClaim {
            scope: scope.to_owned(),
            partition_id: partition_id.to_owned(),
            owner: owner.to_owned(),
            token,
            resume_from: lease.checkpoint(),
        }))
    }

    async fn renew(
        &self,
        claim: &LeaseClaim,
        now: DateTime<Utc>,
        time_to_live: Duration,
    ) -> AppResult<bool> {
        let mut leases = self.leases.write().await;
        let lease = leases
            .get_mut(&key(&claim.scope, &claim.partition_id))
            .ok_or_else(|| missing(&claim.scope, &claim.partition_id))?;

        if !lease.is_held_by(claim.token.as_str(), now) {
            return Ok(false);
        }

        lease.renew(claim.token.as_str(), now, time_to_live)?;
        Ok(true)
    }

    async fn checkpoint(
        &self,
        claim: &LeaseClaim,
        now: DateTime<Utc>,
        position: u64,
    ) -> AppResult<()> {
        let mut leases = self.leases.write().await;
        let lease = leases
            .get_mut(&key(&claim.scope, &claim.partition_id))
            .ok_or_else(|| missing(&claim.scope, &claim.partition_id))?;

        lease.record_checkpoint(claim.token.as_str(), now, position)
    }

    async fn release(&self, claim: &LeaseClaim) -> AppResult<()> {
        let mut leases = self.leases.write().await;
        let lease = leases
            .get_mut(&key(&claim.scope, &claim.partition_id))
            .ok_or_else(|| missing(&claim.scope, &claim.partition_id))?;

        lease.release(claim.token.as_str())
    }
}

#[cfg(test)]
mod tests;
