use serde::{Deserialize, Serialize};

use crate::binding::{AccessMode, BindingDirection, BindingMetadata};
use crate::lease::LeaseConfiguration;

/// Record type a trigger delivers to its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerRecordKind {
    /// Batch of changed documents read from a change feed.
    DocumentChangeBatch,
}

/// Default data type handed to the invocation pipeline for one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum TypeTag {
    /// One JSON document.
    SingleRecord,
    /// Array of JSON documents.
    RecordCollection,
    /// Asynchronous collector of JSON documents to write.
    AsyncWriteCollector,
    /// Provider-specific trigger payload.
    TriggerRecord(TriggerRecordKind),
}

impl TypeTag {
    /// Infers the default type from direction, access and identifier presence.
    ///
    /// | direction | access | identifier | result |
    /// |---|---|---|---|
    /// | trigger | any | any | `trigger` |
    /// | in/out | read | yes | [`TypeTag::SingleRecord`] |
    /// | in/out | read | no | [`TypeTag::RecordCollection`] |
    /// | in/out | write | any | [`TypeTag::AsyncWriteCollector`] |
    #[must_use]
    pub fn infer(
        direction: BindingDirection,
        access: AccessMode,
        has_identifier: bool,
        trigger: TriggerRecordKind,
    ) -> Self {
        match (direction, access) {
            (BindingDirection::Trigger, _) => Self::TriggerRecord(trigger),
            (_, AccessMode::Read) if has_identifier => Self::SingleRecord,
            (_, AccessMode::Read) => Self::RecordCollection,
            (_, AccessMode::Write) => Self::AsyncWriteCollector,
        }
    }

    /// Returns a stable name for logs and reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleRecord => "single_record",
            Self::RecordCollection => "record_collection",
            Self::AsyncWriteCollector => "async_write_collector",
            Self::TriggerRecord(TriggerRecordKind::DocumentChangeBatch) => {
                "document_change_batch"
            }
        }
    }
}

/// How a document input/output binding addresses its collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DocumentLookup {
    /// Runs a SQL query against the collection.
    Query {
        /// Query text, possibly containing binding expressions.
        #[serde(rename = "sqlQuery")]
        sql_query: String,
    },
    /// Addresses one document by identifier.
    Single {
        /// Document identifier, possibly containing binding expressions.
        id: String,
    },
    /// Addresses the collection as a whole.
    Collection,
}

/// Descriptor for a document-store input or output binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStoreAttribute {
    /// Target database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    /// Target collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    /// Symbolic connection setting name.
    #[serde(rename = "connectionStringSetting", skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// Query, single-document or collection addressing.
    pub lookup: DocumentLookup,
    /// Partition key value or expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
    /// Throughput to provision when the collection is created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_throughput: Option<u32>,
    /// Whether to create the database and collection when missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_if_not_exists: Option<bool>,
}

/// Descriptor for a change-feed trigger.
///
/// Only declared values are carried. [`Self::lease_configuration`] produces
/// the zero-defaulted form handed to the consumption engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFeedTriggerAttribute {
    /// Monitored database.
    pub database_name: String,
    /// Monitored collection.
    pub collection_name: String,
    /// Symbolic connection setting for the monitored collection.
    #[serde(rename = "connectionStringSetting", skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// Database holding the lease collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_database_name: Option<String>,
    /// Lease collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_collection_name: Option<String>,
    /// Symbolic connection setting for the lease collection.
    #[serde(
        rename = "leaseConnectionStringSetting",
        skip_serializing_if = "Option::is_none"
    )]
    pub lease_connection: Option<String>,
    /// Whether to provision the lease collection when missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_lease_collection_if_not_exists: Option<bool>,
    /// Throughput for a provisioned lease collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_collection_throughput: Option<u32>,
    /// Consumer-group prefix inside a shared lease collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_collection_prefix: Option<String>,
    /// Idle poll delay in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_poll_delay: Option<u32>,
    /// Lease acquisition sweep interval in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_acquire_interval: Option<u32>,
    /// Lease time-to-live in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_expiration_interval: Option<u32>,
    /// Lease renewal interval in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_renew_interval: Option<u32>,
    /// Checkpoint time threshold in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_interval: Option<u32>,
    /// Checkpoint processed-document threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_document_count: Option<u32>,
    /// Upper bound on documents per invocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items_per_invocation: Option<u32>,
}

impl ChangeFeedTriggerAttribute {
    /// Builds the lease configuration, mapping every absent value to its
    /// "engine default" zero or empty form.
    #[must_use]
    pub fn lease_configuration(&self) -> LeaseConfiguration {
        LeaseConfiguration {
            database_name: self.database_name.clone(),
            collection_name: self.collection_name.clone(),
            connection: self.connection.clone().unwrap_or_default(),
            lease_database_name: self.lease_database_name.clone().unwrap_or_default(),
            lease_collection_name: self.lease_collection_name.clone().unwrap_or_default(),
            lease_connection: self.lease_connection.clone().unwrap_or_default(),
            create_lease_collection_if_not_exists: self
                .create_lease_collection_if_not_exists
                .unwrap_or(false),
            lease_collection_throughput: self.lease_collection_throughput.unwrap_or(0),
            lease_collection_prefix: self.lease_collection_prefix.clone().unwrap_or_default(),
            feed_poll_delay_ms: self.feed_poll_delay.unwrap_or(0),
            lease_acquire_interval_ms: self.lease_acquire_interval.unwrap_or(0),
            lease_expiration_interval_ms: self.lease_expiration_interval.unwrap_or(0),
            lease_renew_interval_ms: self.lease_renew_interval.unwrap_or(0),
            checkpoint_interval_ms: self.checkpoint_interval.unwrap_or(0),
            checkpoint_document_count: self.checkpoint_document_count.unwrap_or(0),
            max_items_per_invocation: self.max_items_per_invocation.unwrap_or(0),
        }
    }
}

/// One typed binding descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingAttribute {
    /// Document-store input or output binding.
    DocumentStore(DocumentStoreAttribute),
    /// Change-feed trigger binding.
    ChangeFeedTrigger(ChangeFeedTriggerAttribute),
}

impl BindingAttribute {
    /// Returns a stable name for logs and reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DocumentStore(_) => "document_store",
            Self::ChangeFeedTrigger(_) => "change_feed_trigger",
        }
    }
}

/// Ordered descriptor set produced for one binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(Vec<BindingAttribute>);

impl AttributeSet {
    /// Creates a set with one descriptor.
    #[must_use]
    pub fn single(attribute: BindingAttribute) -> Self {
        Self(vec![attribute])
    }

    /// Appends a descriptor.
    pub fn push(&mut self, attribute: BindingAttribute) {
        self.0.push(attribute);
    }

    /// Returns descriptors in construction order.
    #[must_use]
    pub fn as_slice(&self) -> &[BindingAttribute] {
        self.0.as_slice()
    }

    /// Returns the number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the set holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the change-feed trigger descriptor when present.
    #[must_use]
    pub fn change_feed_trigger(&self) -> Option<&ChangeFeedTriggerAttribute> {
        self.0.iter().find_map(|attribute| match attribute {
            BindingAttribute::ChangeFeedTrigger(trigger) => Some(trigger),
            BindingAttribute::DocumentStore(_) => None,
        })
    }

    /// Returns the document-store descriptor when present.
    #[must_use]
    pub fn document_store(&self) -> Option<&DocumentStoreAttribute> {
        self.0.iter().find_map(|attribute| match attribute {
            BindingAttribute::DocumentStore(document) => Some(document),
            BindingAttribute::ChangeFeedTrigger(_) => None,
        })
    }
}

/// Outcome of resolving one declared binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedBinding {
    /// Provider that claimed the declaration.
    pub provider: String,
    /// Declared parameter name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared type name.
    pub type_name: String,
    /// Declared direction.
    pub direction: BindingDirection,
    /// Default data type for the invocation pipeline.
    pub default_type: TypeTag,
    /// Typed descriptors used to construct the I/O binding.
    pub descriptor: AttributeSet,
}

impl ResolvedBinding {
    /// Creates a resolved binding for `metadata`.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        metadata: &BindingMetadata,
        default_type: TypeTag,
        descriptor: AttributeSet,
    ) -> Self {
        Self {
            provider: provider.into(),
            name: metadata.name().map(str::to_owned),
            type_name: metadata.type_name().as_str().to_owned(),
            direction: metadata.direction(),
            default_type,
            descriptor,
        }
    }
}
