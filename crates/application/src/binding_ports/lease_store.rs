use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scriptbind_core::AppResult;
use scriptbind_domain::PartitionLease;

/// Claim returned to a worker that acquired one partition lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseClaim {
    /// Consumer-group scope of the lease collection.
    pub scope: String,
    /// Leased partition.
    pub partition_id: String,
    /// Worker holding the lease.
    pub owner: String,
    /// Token proving ownership for renew, checkpoint and release.
    pub token: String,
    /// Persisted position to resume from, `None` meaning the log start.
    pub resume_from: Option<u64>,
}

/// Lease collection port used by change-feed workers.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Creates unowned leases for partitions that have none yet.
    async fn ensure_partitions(&self, scope: &str, partition_ids: &[String]) -> AppResult<()>;

    /// Lists every lease of a scope ordered by partition.
    async fn list_leases(&self, scope: &str) -> AppResult<Vec<PartitionLease>>;

    /// Acquires one lease when it is unowned or expired.
    async fn try_acquire(
        &self,
        scope: &str,
        partition_id: &str,
        owner: &str,
        now: DateTime<Utc>,
        time_to_live: Duration,
    ) -> AppResult<Option<LeaseClaim>>;

    /// Renews one lease and returns false when ownership was lost.
    async fn renew(
        &self,
        claim: &LeaseClaim,
        now: DateTime<Utc>,
        time_to_live: Duration,
    ) -> AppResult<bool>;

    /// Persists a resume position for the claimed partition.
    async fn checkpoint(&self, claim: &LeaseClaim, now: DateTime<Utc>, position: u64)
    -> AppResult<()>;

    /// Releases one lease using token compare-and-delete semantics.
    async fn release(&self, claim: &LeaseClaim) -> AppResult<()>;
}
