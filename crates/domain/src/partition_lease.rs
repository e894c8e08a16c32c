use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use scriptbind_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Ownership claim over one change-feed partition.
///
/// A lease is exclusive only until it expires: once `expires_at` passes, any
/// worker may take it over, and the previous holder can no longer renew or
/// checkpoint with its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionLease {
    partition_id: NonEmptyString,
    owner: Option<String>,
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    checkpoint: Option<u64>,
}

impl PartitionLease {
    /// Creates an unowned lease for a partition with no checkpoint.
    pub fn unowned(partition_id: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            partition_id: NonEmptyString::new(partition_id)?,
            owner: None,
            token: None,
            expires_at: None,
            checkpoint: None,
        })
    }

    /// Returns the leased partition.
    #[must_use]
    pub fn partition_id(&self) -> &NonEmptyString {
        &self.partition_id
    }

    /// Returns the current holder, expired or not.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Returns when the current claim lapses.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the last persisted position, `None` meaning the log start.
    #[must_use]
    pub fn checkpoint(&self) -> Option<u64> {
        self.checkpoint
    }

    /// Returns whether a worker may acquire the lease at `now`.
    #[must_use]
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        match (&self.owner, self.expires_at) {
            (None, _) | (Some(_), None) => true,
            (Some(_), Some(expires_at)) => expires_at <= now,
        }
    }

    /// Returns whether `token` currently holds an unexpired claim.
    #[must_use]
    pub fn is_held_by(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.token.as_deref() == Some(token) && !self.is_available(now)
    }

    /// Takes ownership when the lease is unowned or expired.
    pub fn acquire(
        &mut self,
        owner: &str,
        token: &str,
        now: DateTime<Utc>,
        time_to_live: Duration,
    ) -> AppResult<()> {
        if !self.is_available(now) {
            return Err(AppError::Conflict(format!(
                "partition '{}' is leased by '{}'",
                self.partition_id,
                self.owner.as_deref().unwrap_or_default()
            )));
        }

        self.owner = Some(owner.to_owned());
        self.token = Some(token.to_owned());
        self.expires_at = Some(expiry(now, time_to_live)?);
        Ok(())
    }

    /// Extends the claim of the current, unexpired holder.
    pub fn renew(&mut self, token: &str, now: DateTime<Utc>, time_to_live: Duration) -> AppResult<()> {
        self.ensure_held(token, now)?;
        self.expires_at = Some(expiry(now, time_to_live)?);
        Ok(())
    }

    /// Gives the lease up without waiting for expiration.
    pub fn release(&mut self, token: &str) -> AppResult<()> {
        if self.token.as_deref() != Some(token) {
            return Err(AppError::Conflict(format!(
                "partition '{}' is not held by the releasing token",
                self.partition_id
            )));
        }

        self.owner = None;
        self.token = None;
        self.expires_at = None;
        Ok(())
    }

    /// Persists a resume position. Positions never move backwards.
    pub fn record_checkpoint(&mut self, token: &str, now: DateTime<Utc>, position: u64) -> AppResult<()> {
        self.ensure_held(token, now)?;

        if self.checkpoint.is_some_and(|current| position < current) {
            return Err(AppError::Validation(format!(
                "checkpoint for partition '{}' cannot move back from {} to {position}",
                self.partition_id,
                self.checkpoint.unwrap_or_default()
            )));
        }

        self.checkpoint = Some(position);
        Ok(())
    }

    fn ensure_held(&self, token: &str, now: DateTime<Utc>) -> AppResult<()> {
        if self.is_held_by(token, now) {
            return Ok(());
        }

        Err(AppError::Conflict(format!(
            "lease on partition '{}' was lost",
            self.partition_id
        )))
    }
}

fn expiry(now: DateTime<Utc>, time_to_live: Duration) -> AppResult<DateTime<Utc>> {
    TimeDelta::from_std(time_to_live)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| AppError::Validation("lease time-to-live is out of range".to_owned()))
}
