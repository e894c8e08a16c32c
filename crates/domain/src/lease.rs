use std::time::Duration;

use scriptbind_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Complete lease-coordination configuration for one change-feed trigger.
///
/// Zero and empty values mean "use the consumption engine default", never
/// "disabled".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseConfiguration {
    /// Monitored database.
    pub database_name: String,
    /// Monitored collection.
    pub collection_name: String,
    /// Symbolic connection setting for the monitored collection.
    pub connection: String,
    /// Database holding the lease collection.
    pub lease_database_name: String,
    /// Lease collection.
    pub lease_collection_name: String,
    /// Symbolic connection setting for the lease collection.
    pub lease_connection: String,
    /// Provision the lease collection when missing.
    pub create_lease_collection_if_not_exists: bool,
    /// Throughput for a provisioned lease collection.
    pub lease_collection_throughput: u32,
    /// Consumer-group prefix inside a shared lease collection.
    pub lease_collection_prefix: String,
    /// Idle poll delay.
    pub feed_poll_delay_ms: u32,
    /// Lease acquisition sweep interval.
    pub lease_acquire_interval_ms: u32,
    /// Lease time-to-live.
    pub lease_expiration_interval_ms: u32,
    /// Lease renewal interval.
    pub lease_renew_interval_ms: u32,
    /// Checkpoint time threshold.
    pub checkpoint_interval_ms: u32,
    /// Checkpoint processed-document threshold.
    pub checkpoint_document_count: u32,
    /// Upper bound on documents per invocation.
    pub max_items_per_invocation: u32,
}

impl LeaseConfiguration {
    /// Returns the consumer-group prefix, or `None` for the unscoped group.
    #[must_use]
    pub fn lease_scope(&self) -> Option<&str> {
        (!self.lease_collection_prefix.is_empty()).then_some(self.lease_collection_prefix.as_str())
    }

    /// Resolves every zero value against `defaults`.
    #[must_use]
    pub fn effective(&self, defaults: &LeaseDefaults) -> EffectiveLeaseTimings {
        let checkpoint = if self.checkpoint_interval_ms == 0 && self.checkpoint_document_count == 0
        {
            defaults.checkpoint
        } else {
            CheckpointPolicy {
                interval: non_zero_millis(self.checkpoint_interval_ms),
                document_count: (self.checkpoint_document_count > 0)
                    .then_some(self.checkpoint_document_count),
            }
        };

        EffectiveLeaseTimings {
            feed_poll_delay: non_zero_millis(self.feed_poll_delay_ms)
                .unwrap_or(defaults.feed_poll_delay),
            lease_acquire_interval: non_zero_millis(self.lease_acquire_interval_ms)
                .unwrap_or(defaults.lease_acquire_interval),
            lease_expiration_interval: non_zero_millis(self.lease_expiration_interval_ms)
                .unwrap_or(defaults.lease_expiration_interval),
            lease_renew_interval: non_zero_millis(self.lease_renew_interval_ms)
                .unwrap_or(defaults.lease_renew_interval),
            checkpoint,
            max_items_per_invocation: (self.max_items_per_invocation > 0)
                .then_some(self.max_items_per_invocation)
                .or(defaults.max_items_per_invocation),
            lease_prefix: if self.lease_collection_prefix.is_empty() {
                defaults.lease_prefix.clone()
            } else {
                self.lease_collection_prefix.clone()
            },
        }
    }

    /// Checks the renew/expiration ordering of the declared intervals.
    ///
    /// Only a pair declared together is checked here. Conflicts that need a
    /// default to surface are not attributable to the binding; see
    /// [`EffectiveLeaseTimings::renews_before_expiration`].
    pub fn validate(&self, binding_type: &str) -> AppResult<()> {
        let renew = self.lease_renew_interval_ms;
        let expiration = self.lease_expiration_interval_ms;
        if renew == 0 || expiration == 0 || renew < expiration {
            return Ok(());
        }

        Err(AppError::binding_configuration(
            binding_type,
            "leaseRenewInterval",
            format!(
                "lease renew interval ({renew} ms) must be less than lease expiration interval ({expiration} ms)"
            ),
        ))
    }
}

/// Checkpoint thresholds. A checkpoint is due when either is reached first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointPolicy {
    /// Time since the last checkpoint.
    pub interval: Option<Duration>,
    /// Documents processed since the last checkpoint.
    pub document_count: Option<u32>,
}

impl CheckpointPolicy {
    /// Returns whether a checkpoint is due. Without thresholds every batch checkpoints.
    #[must_use]
    pub fn is_due(&self, since_last: Duration, documents_since_last: u64) -> bool {
        if self.interval.is_none() && self.document_count.is_none() {
            return true;
        }

        let time_reached = self.interval.is_some_and(|interval| since_last >= interval);
        let count_reached = self
            .document_count
            .is_some_and(|count| documents_since_last >= u64::from(count));

        time_reached || count_reached
    }
}

/// Engine defaults substituted for zero values in a [`LeaseConfiguration`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseDefaults {
    /// Idle poll delay.
    pub feed_poll_delay: Duration,
    /// Lease acquisition sweep interval.
    pub lease_acquire_interval: Duration,
    /// Lease time-to-live.
    pub lease_expiration_interval: Duration,
    /// Lease renewal interval.
    pub lease_renew_interval: Duration,
    /// Checkpoint thresholds.
    pub checkpoint: CheckpointPolicy,
    /// Upper bound on documents per invocation.
    pub max_items_per_invocation: Option<u32>,
    /// Consumer-group prefix.
    pub lease_prefix: String,
}

impl LeaseDefaults {
    /// Defaults of the change-feed consumption engine.
    #[must_use]
    pub fn engine() -> Self {
        Self {
            feed_poll_delay: Duration::from_secs(5),
            lease_acquire_interval: Duration::from_secs(13),
            lease_expiration_interval: Duration::from_secs(60),
            lease_renew_interval: Duration::from_secs(17),
            checkpoint: CheckpointPolicy::default(),
            max_items_per_invocation: None,
            lease_prefix: String::new(),
        }
    }

    /// Overlays host-level lease options on top of these defaults.
    #[must_use]
    pub fn with_host_options(mut self, options: &HostLeaseOptions) -> Self {
        if let Some(value) = options.feed_poll_delay {
            self.feed_poll_delay = value;
        }
        if let Some(value) = options.lease_acquire_interval {
            self.lease_acquire_interval = value;
        }
        if let Some(value) = options.lease_expiration_interval {
            self.lease_expiration_interval = value;
        }
        if let Some(value) = options.lease_renew_interval {
            self.lease_renew_interval = value;
        }
        if options.checkpoint.interval.is_some() || options.checkpoint.document_count.is_some() {
            self.checkpoint = options.checkpoint;
        }
        if let Some(value) = options.max_item_count {
            self.max_items_per_invocation = Some(value);
        }
        if let Some(prefix) = &options.lease_prefix {
            self.lease_prefix = prefix.clone();
        }
        self
    }
}

impl LeaseDefaults {
    /// Checks that these defaults alone renew before expiring.
    pub fn validate(&self) -> AppResult<()> {
        if self.lease_renew_interval < self.lease_expiration_interval {
            return Ok(());
        }

        Err(AppError::Validation(format!(
            "lease renew interval ({} ms) must be less than lease expiration interval ({} ms)",
            self.lease_renew_interval.as_millis(),
            self.lease_expiration_interval.as_millis()
        )))
    }
}

impl Default for LeaseDefaults {
    fn default() -> Self {
        Self::engine()
    }
}

/// Lease timings after zero values were resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveLeaseTimings {
    /// Idle poll delay.
    pub feed_poll_delay: Duration,
    /// Lease acquisition sweep interval.
    pub lease_acquire_interval: Duration,
    /// Lease time-to-live.
    pub lease_expiration_interval: Duration,
    /// Lease renewal interval.
    pub lease_renew_interval: Duration,
    /// Checkpoint thresholds.
    pub checkpoint: CheckpointPolicy,
    /// Upper bound on documents per invocation.
    pub max_items_per_invocation: Option<u32>,
    /// Consumer-group prefix.
    pub lease_prefix: String,
}

impl EffectiveLeaseTimings {
    /// Longest time after a holder's last renewal before a competitor that
    /// keeps sweeping must have been able to take the lease over.
    #[must_use]
    pub fn reclaim_window(&self) -> Duration {
        self.lease_expiration_interval
            .saturating_add(self.lease_acquire_interval)
    }

    /// Returns whether a renewal lands before the lease it renews expires.
    #[must_use]
    pub fn renews_before_expiration(&self) -> bool {
        self.lease_renew_interval < self.lease_expiration_interval
    }

    /// Returns whether renewal happens at most every half expiration interval.
    #[must_use]
    pub fn renews_within_half_expiration(&self) -> bool {
        self.lease_renew_interval.saturating_mul(2) <= self.lease_expiration_interval
    }
}

/// Host-level `leaseOptions` block of the document-store section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostLeaseOptions {
    /// Consumer-group prefix.
    pub lease_prefix: Option<String>,
    /// Idle poll delay.
    pub feed_poll_delay: Option<Duration>,
    /// Lease acquisition sweep interval.
    pub lease_acquire_interval: Option<Duration>,
    /// Lease time-to-live.
    pub lease_expiration_interval: Option<Duration>,
    /// Lease renewal interval.
    pub lease_renew_interval: Option<Duration>,
    /// Checkpoint thresholds.
    pub checkpoint: CheckpointPolicy,
    /// Upper bound on documents per read.
    pub max_item_count: Option<u32>,
}

impl HostLeaseOptions {
    /// Parses a `leaseOptions` object. Durations accept milliseconds or
    /// `[d.]hh:mm:ss[.fff]` time spans.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            AppError::Validation("'leaseOptions' must be a JSON object".to_owned())
        })?;

        let checkpoint = match get(object, "checkpointFrequency") {
            None => CheckpointPolicy::default(),
            Some(Value::Object(frequency)) => CheckpointPolicy {
                interval: duration_option(frequency, "timeInterval")?,
                document_count: count_option(frequency, "processedDocumentCount")?,
            },
            Some(_) => {
                return Err(AppError::Validation(
                    "'leaseOptions.checkpointFrequency' must be a JSON object".to_owned(),
                ));
            }
        };

        Ok(Self {
            lease_prefix: get(object, "leasePrefix")
                .and_then(Value::as_str)
                .map(str::to_owned),
            feed_poll_delay: duration_option(object, "feedPollDelay")?,
            lease_acquire_interval: duration_option(object, "leaseAcquireInterval")?,
            lease_expiration_interval: duration_option(object, "leaseExpirationInterval")?,
            lease_renew_interval: duration_option(object, "leaseRenewInterval")?,
            checkpoint,
            max_item_count: count_option(object, "maxItemCount")?,
        })
    }
}

/// Parses a `[d.]hh:mm:ss[.fff]` time span.
pub fn parse_time_span(text: &str) -> AppResult<Duration> {
    let invalid = || AppError::Validation(format!("invalid time span '{text}'"));
    let trimmed = text.trim();

    let (days, clock) = match trimmed.split_once(':') {
        Some((head, _)) if head.contains('.') => {
            let (days, _) = head.split_once('.').ok_or_else(invalid)?;
            let days = days.parse::<u64>().map_err(|_| invalid())?;
            (days, &trimmed[days_prefix_len(trimmed)..])
        }
        Some(_) => (0, trimmed),
        None => return Err(invalid()),
    };

    let mut parts = clock.split(':');
    let hours = parts
        .next()
        .and_then(|part| part.parse::<u64>().ok())
        .ok_or_else(invalid)?;
    let minutes = parts
        .next()
        .and_then(|part| part.parse::<u64>().ok())
        .filter(|minutes| *minutes < 60)
        .ok_or_else(invalid)?;
    let seconds_part = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    let (seconds, fraction) = match seconds_part.split_once('.') {
        Some((seconds, fraction)) => (seconds, Some(fraction)),
        None => (seconds_part, None),
    };
    let seconds = seconds
        .parse::<u64>()
        .ok()
        .filter(|seconds| *seconds < 60)
        .ok_or_else(invalid)?;
    let millis = match fraction {
        None => 0,
        Some(fraction) if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) => {
            return Err(invalid());
        }
        Some(fraction) => {
            let padded = format!("{fraction:0<3}");
            padded[..3].parse::<u64>().map_err(|_| invalid())?
        }
    };

    let total_seconds = days
        .checked_mul(86_400)
        .and_then(|value| value.checked_add(hours.checked_mul(3_600)?))
        .and_then(|value| value.checked_add(minutes * 60 + seconds))
        .ok_or_else(invalid)?;

    Ok(Duration::from_secs(total_seconds) + Duration::from_millis(millis))
}

fn days_prefix_len(text: &str) -> usize {
    text.find('.').map_or(0, |index| index + 1)
}

fn non_zero_millis(value: u32) -> Option<Duration> {
    (value > 0).then(|| Duration::from_millis(u64::from(value)))
}

fn get<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
        .filter(|value| !value.is_null())
}

fn duration_option(object: &Map<String, Value>, key: &str) -> AppResult<Option<Duration>> {
    match get(object, key) {
        None => Ok(None),
        Some(Value::Number(number)) => number
            .as_u64()
            .map(|millis| Some(Duration::from_millis(millis)))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "'{key}' must be a non-negative integer of milliseconds"
                ))
            }),
        Some(Value::String(text)) => parse_time_span(text)
            .map(Some)
            .map_err(|error| AppError::Validation(format!("'{key}': {error}"))),
        Some(_) => Err(AppError::Validation(format!(
            "'{key}' must be milliseconds or a time span"
        ))),
    }
}

fn count_option(object: &Map<String, Value>, key: &str) -> AppResult<Option<u32>> {
    match get(object, key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|count| u32::try_from(count).ok())
            .map(Some)
            .ok_or_else(|| {
                AppError::Validation(format!("'{key}' must be a non-negative integer"))
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use scriptbind_core::AppError;
    use serde_json::json;

    use super::{
        CheckpointPolicy, HostLeaseOptions, LeaseConfiguration, LeaseDefaults, parse_time_span,
    };

    #[test]
    fn parses_time_spans() {
        assert_eq!(parse_time_span("00:00:05"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_time_span("00:01:00.25"), Ok(Duration::from_millis(60_250)));
        assert_eq!(
            parse_time_span("1.02:00:00"),
            Ok(Duration::from_secs(86_400 + 7_200))
        );
        assert!(parse_time_span("5000").is_err());
        assert!(parse_time_span("00:61:00").is_err());
        assert!(parse_time_span("00:00:00.").is_err());
    }

    #[test]
    fn zero_values_take_engine_defaults() {
        let timings = LeaseConfiguration::default().effective(&LeaseDefaults::engine());

        assert_eq!(timings.feed_poll_delay, Duration::from_secs(5));
        assert_eq!(timings.lease_renew_interval, Duration::from_secs(17));
        assert_eq!(timings.reclaim_window(), Duration::from_secs(73));
        assert_eq!(timings.max_items_per_invocation, None);
        assert!(timings.renews_within_half_expiration());
    }

    #[test]
    fn declared_values_override_defaults() {
        let configuration = LeaseConfiguration {
            lease_acquire_interval_ms: 5000,
            checkpoint_document_count: 100,
            max_items_per_invocation: 10,
            lease_collection_prefix: "billing".to_owned(),
            ..LeaseConfiguration::default()
        };
        let timings = configuration.effective(&LeaseDefaults::engine());

        assert_eq!(timings.lease_acquire_interval, Duration::from_millis(5000));
        assert_eq!(
            timings.checkpoint,
            CheckpointPolicy {
                interval: None,
                document_count: Some(100)
            }
        );
        assert_eq!(timings.max_items_per_invocation, Some(10));
        assert_eq!(timings.lease_prefix, "billing");
        assert_eq!(configuration.lease_scope(), Some("billing"));
    }

    #[test]
    fn renew_must_be_shorter_than_declared_expiration() {
        let explicit = LeaseConfiguration {
            lease_renew_interval_ms: 10_000,
            lease_expiration_interval_ms: 10_000,
            ..LeaseConfiguration::default()
        };
        let error = explicit.validate("cosmosDBTrigger").err();
        assert_eq!(
            error.as_ref().and_then(|error| error.offending_field()),
            Some("leaseRenewInterval")
        );

        assert!(LeaseConfiguration::default().validate("cosmosDBTrigger").is_ok());
    }

    #[test]
    fn single_declared_interval_is_not_a_binding_error() {
        let defaults = LeaseDefaults::engine();
        let short_expiration = LeaseConfiguration {
            lease_expiration_interval_ms: 15_000,
            ..LeaseConfiguration::default()
        };

        assert!(short_expiration.validate("cosmosDBTrigger").is_ok());
        assert!(!short_expiration.effective(&defaults).renews_before_expiration());

        let long_renew = LeaseConfiguration {
            lease_renew_interval_ms: 90_000,
            ..LeaseConfiguration::default()
        };
        assert!(long_renew.validate("cosmosDBTrigger").is_ok());
    }

    #[test]
    fn inconsistent_host_defaults_are_rejected() {
        let options = HostLeaseOptions {
            lease_renew_interval: Some(Duration::from_secs(90)),
            ..HostLeaseOptions::default()
        };

        let defaults = LeaseDefaults::engine().with_host_options(&options);

        assert!(matches!(defaults.validate(), Err(AppError::Validation(_))));
        assert!(LeaseDefaults::engine().validate().is_ok());
    }

    #[test]
    fn checkpoint_policy_fires_on_first_threshold() {
        let policy = CheckpointPolicy {
            interval: Some(Duration::from_secs(10)),
            document_count: Some(100),
        };

        assert!(!policy.is_due(Duration::from_secs(1), 99));
        assert!(policy.is_due(Duration::from_secs(1), 100));
        assert!(policy.is_due(Duration::from_secs(10), 0));
        assert!(CheckpointPolicy::default().is_due(Duration::ZERO, 0));
    }

    #[test]
    fn host_options_overlay_engine_defaults() {
        let options = HostLeaseOptions::from_value(&json!({
            "leasePrefix": "shared",
            "feedPollDelay": "00:00:02",
            "leaseRenewInterval": 20000,
            "checkpointFrequency": {"processedDocumentCount": 50},
            "maxItemCount": 25
        }))
        .unwrap_or_else(|_| unreachable!());

        let defaults = LeaseDefaults::engine().with_host_options(&options);
        assert_eq!(defaults.feed_poll_delay, Duration::from_secs(2));
        assert_eq!(defaults.lease_renew_interval, Duration::from_secs(20));
        assert_eq!(defaults.lease_expiration_interval, Duration::from_secs(60));
        assert_eq!(defaults.checkpoint.document_count, Some(50));
        assert_eq!(defaults.max_items_per_invocation, Some(25));
        assert_eq!(defaults.lease_prefix, "shared");

        assert!(HostLeaseOptions::from_value(&json!({"feedPollDelay": true})).is_err());
        assert!(HostLeaseOptions::from_value(&json!({"maxItemCount": -1})).is_err());
    }
}
