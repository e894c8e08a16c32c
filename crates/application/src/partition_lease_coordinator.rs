//! Worker-side use of a trigger's lease configuration.
//!
//! This models the contract the consumption engine must honour for a given
//! [`LeaseConfiguration`]: sweeps acquire unowned or expired leases, renewals
//! keep owned ones alive, and checkpoints fire on the first time or count
//! threshold reached.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use scriptbind_core::{AppError, AppResult};
use scriptbind_domain::{EffectiveLeaseTimings, LeaseConfiguration, LeaseDefaults};

use crate::binding_ports::{LeaseClaim, LeaseStore};

/// Documents processed since the last checkpoint of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointProgress {
    last_checkpoint_at: DateTime<Utc>,
    documents_since: u64,
}

impl CheckpointProgress {
    /// Starts tracking at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_checkpoint_at: now,
            documents_since: 0,
        }
    }

    /// Counts one delivered batch.
    pub fn record_batch(&mut self, documents: usize) {
        let documents = u64::try_from(documents).unwrap_or(u64::MAX);
        self.documents_since = self.documents_since.saturating_add(documents);
    }

    /// Returns documents processed since the last checkpoint.
    #[must_use]
    pub fn documents_since(&self) -> u64 {
        self.documents_since
    }
}

/// Lease acquisition, renewal and checkpointing for one worker.
#[derive(Clone)]
pub struct PartitionLeaseCoordinator {
    store: Arc<dyn LeaseStore>,
    owner: String,
    scope: String,
    timings: EffectiveLeaseTimings,
}

impl PartitionLeaseCoordinator {
    /// Creates a coordinator for one trigger configuration.
    pub fn new(
        store: Arc<dyn LeaseStore>,
        owner: impl Into<String>,
        configuration: &LeaseConfiguration,
        defaults: &LeaseDefaults,
    ) -> AppResult<Self> {
        let timings = configuration.effective(defaults);
        if !timings.renews_before_expiration() {
            return Err(AppError::Validation(format!(
                "lease renew interval ({} ms) must be less than lease expiration interval ({} ms)",
                timings.lease_renew_interval.as_millis(),
                timings.lease_expiration_interval.as_millis()
            )));
        }

        let scope = format!(
            "{}{}_{}",
            timings.lease_prefix, configuration.database_name, configuration.collection_name
        );

        Ok(Self {
            store,
            owner: owner.into(),
            scope,
            timings,
        })
    }

    /// Returns the lease scope shared by every worker of this consumer group.
    #[must_use]
    pub fn scope(&self) -> &str {
        self.scope.as_str()
    }

    /// Returns the worker identity.
    #[must_use]
    pub fn owner(&self) -> &str {
        self.owner.as_str()
    }

    /// Returns the resolved timings.
    #[must_use]
    pub fn timings(&self) -> &EffectiveLeaseTimings {
        &self.timings
    }

    /// Ensures every partition has a lease record.
    pub async fn register_partitions(&self, partition_ids: &[String]) -> AppResult<()> {
        self.store
            .ensure_partitions(self.scope.as_str(), partition_ids)
            .await
    }

    /// Runs one acquisition sweep and returns the leases won.
    pub async fn acquire_available(&self, now: DateTime<Utc>) -> AppResult<Vec<LeaseClaim>> {
        let mut claims = Vec::new();

        for lease in self.store.list_leases(self.scope.as_str()).await? {
            if !lease.is_available(now) {
                continue;
            }

            if let Some(claim) = self
                .store
                .try_acquire(
                    self.scope.as_str(),
                    lease.partition_id().as_str(),
                    self.owner.as_str(),
                    now,
                    self.timings.lease_expiration_interval,
                )
                .await?
            {
                claims.push(claim);
            }
        }

        Ok(claims)
    }

    /// Renews `claims` and keeps only the ones still owned.
    pub async fn renew_claims(
        &self,
        claims: Vec<LeaseClaim>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<LeaseClaim>> {
        let mut retained = Vec::with_capacity(claims.len());

        for claim in claims {
            if self
                .store
                .renew(&claim, now, self.timings.lease_expiration_interval)
                .await?
            {
                retained.push(claim);
            }
        }

        Ok(retained)
    }

    /// Returns the time of the next acquisition sweep after `last_sweep`.
    #[must_use]
    pub fn next_sweep_at(&self, last_sweep: DateTime<Utc>) -> DateTime<Utc> {
        add_std(last_sweep, self.timings.lease_acquire_interval)
    }

    /// Returns the time of the next renewal after `last_renewal`.
    #[must_use]
    pub fn next_renewal_at(&self, last_renewal: DateTime<Utc>) -> DateTime<Utc> {
        add_std(last_renewal, self.timings.lease_renew_interval)
    }

    /// Caps a batch read from the feed at the per-invocation limit.
    #[must_use]
    pub fn batch_limit(&self, available: usize) -> usize {
        match self.timings.max_items_per_invocation {
            Some(limit) => available.min(usize::try_from(limit).unwrap_or(usize::MAX)),
            None => available,
        }
    }

    /// Persists `position` when a checkpoint threshold has been reached.
    ///
    /// Returns whether a checkpoint was written.
    pub async fn checkpoint_if_due(
        &self,
        claim: &LeaseClaim,
        progress: &mut CheckpointProgress,
        now: DateTime<Utc>,
        position: u64,
    ) -> AppResult<bool> {
        let since_last = (now - progress.last_checkpoint_at)
            .to_std()
            .unwrap_or_default();

        if !self
            .timings
            .checkpoint
            .is_due(since_last, progress.documents_since)
        {
            return Ok(false);
        }

        self.store.checkpoint(claim, now, position).await?;
        *progress = CheckpointProgress::new(now);
        Ok(true)
    }
}

fn add_std(at: DateTime<Utc>, interval: std::time::Duration) -> DateTime<Utc> {
    TimeDelta::from_std(interval)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
