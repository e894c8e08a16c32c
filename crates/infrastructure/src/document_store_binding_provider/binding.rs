use scriptbind_application::{Diagnostic, DiagnosticsSink, ScriptBinding};
use scriptbind_core::AppResult;
use scriptbind_domain::{
    AttributeSet, BindingAttribute, BindingMetadata, ChangeFeedTriggerAttribute, DocumentLookup,
    DocumentStoreAttribute, LeaseDefaults, TriggerRecordKind, TypeTag,
};

use super::DOCUMENT_STORE_PROVIDER;

const TRIGGER_FIELDS: &[&str] = &[
    "databaseName",
    "collectionName",
    "connectionStringSetting",
    "connection",
    "leaseDatabaseName",
    "leaseCollectionName",
    "leaseConnectionStringSetting",
    "createLeaseCollectionIfNotExists",
    "leaseCollectionThroughput",
    "leaseCollectionPrefix",
    "feedPollDelay",
    "leaseAcquireInterval",
    "leaseExpirationInterval",
    "leaseRenewInterval",
    "checkpointInterval",
    "checkpointDocumentCount",
    "maxItemsPerInvocation",
];

const DOCUMENT_FIELDS: &[&str] = &[
    "databaseName",
    "collectionName",
    "connection",
    "connectionStringSetting",
    "id",
    "sqlQuery",
    "partitionKey",
    "collectionThroughput",
    "createIfNotExists",
];

/// Binding claimed by the document-store provider.
///
/// The descriptor is built and validated when the binding is claimed, so a
/// claimed binding can always produce its attribute set.
#[derive(Debug)]
pub(super) struct DocumentStoreBinding {
    metadata: BindingMetadata,
    default_type: TypeTag,
    descriptor: AttributeSet,
}

impl DocumentStoreBinding {
    pub(super) fn new(
        metadata: BindingMetadata,
        lease_defaults: &LeaseDefaults,
        diagnostics: &dyn DiagnosticsSink,
    ) -> AppResult<Self> {
        let attribute = if metadata.is_trigger() {
            BindingAttribute::ChangeFeedTrigger(build_trigger(
                &metadata,
                lease_defaults,
                diagnostics,
            )?)
        } else {
            BindingAttribute::DocumentStore(build_document(&metadata, diagnostics)?)
        };

        let known = if metadata.is_trigger() {
            TRIGGER_FIELDS
        } else {
            DOCUMENT_FIELDS
        };
        for field in metadata.unrecognized_fields(known) {
            diagnostics.record(Diagnostic::field_warning(
                DOCUMENT_STORE_PROVIDER,
                metadata.type_name().as_str(),
                field,
                "unrecognized field is ignored",
            ));
        }

        let default_type = TypeTag::infer(
            metadata.direction(),
            metadata.access(),
            metadata.has_field("id"),
            TriggerRecordKind::DocumentChangeBatch,
        );

        Ok(Self {
            metadata,
            default_type,
            descriptor: AttributeSet::single(attribute),
        })
    }
}

impl ScriptBinding for DocumentStoreBinding {
    fn metadata(&self) -> &BindingMetadata {
        &self.metadata
    }

    fn default_type(&self) -> TypeTag {
        self.default_type
    }

    fn build_descriptor(&self) -> AppResult<AttributeSet> {
        Ok(self.descriptor.clone())
    }
}

fn build_trigger(
    metadata: &BindingMetadata,
    lease_defaults: &LeaseDefaults,
    diagnostics: &dyn DiagnosticsSink,
) -> AppResult<ChangeFeedTriggerAttribute> {
    let connection = match metadata.string_field("connectionStringSetting")? {
        Some(setting) => Some(setting),
        None => metadata.string_field("connection")?,
    };

    let attribute = ChangeFeedTriggerAttribute {
        database_name: metadata.required_string_field("databaseName")?.to_owned(),
        collection_name: metadata.required_string_field("collectionName")?.to_owned(),
        connection: connection.map(str::to_owned),
        lease_database_name: owned(metadata.string_field("leaseDatabaseName")?),
        lease_collection_name: owned(metadata.string_field("leaseCollectionName")?),
        lease_connection: owned(metadata.string_field("leaseConnectionStringSetting")?),
        create_lease_collection_if_not_exists: metadata
            .bool_field("createLeaseCollectionIfNotExists")?,
        lease_collection_throughput: metadata.u32_field("leaseCollectionThroughput")?,
        lease_collection_prefix: owned(metadata.string_field("leaseCollectionPrefix")?),
        feed_poll_delay: metadata.u32_field("feedPollDelay")?,
        lease_acquire_interval: metadata.u32_field("leaseAcquireInterval")?,
        lease_expiration_interval: metadata.u32_field("leaseExpirationInterval")?,
        lease_renew_interval: metadata.u32_field("leaseRenewInterval")?,
        checkpoint_interval: metadata.u32_field("checkpointInterval")?,
        checkpoint_document_count: metadata.u32_field("checkpointDocumentCount")?,
        max_items_per_invocation: metadata.u32_field("maxItemsPerInvocation")?,
    };

    let lease = attribute.lease_configuration();
    lease.validate(metadata.type_name().as_str())?;

    let timings = lease.effective(lease_defaults);
    let field = if lease.lease_renew_interval_ms > 0 || lease.lease_expiration_interval_ms == 0 {
        "leaseRenewInterval"
    } else {
        "leaseExpirationInterval"
    };
    if !timings.renews_before_expiration() {
        diagnostics.record(Diagnostic::field_warning(
            DOCUMENT_STORE_PROVIDER,
            metadata.type_name().as_str(),
            field,
            format!(
                "with defaults applied the renew interval ({} ms) is not below the expiration interval ({} ms); leases will lapse between renewals",
                timings.lease_renew_interval.as_millis(),
                timings.lease_expiration_interval.as_millis()
            ),
        ));
    } else if !timings.renews_within_half_expiration() {
        diagnostics.record(Diagnostic::field_warning(
            DOCUMENT_STORE_PROVIDER,
            metadata.type_name().as_str(),
            field,
            "renew interval exceeds half the expiration interval; a slow renewal may lose the lease",
        ));
    }

    Ok(attribute)
}

fn build_document(
    metadata: &BindingMetadata,
    diagnostics: &dyn DiagnosticsSink,
) -> AppResult<DocumentStoreAttribute> {
    let connection = match metadata.string_field("connection")? {
        Some(setting) => Some(setting),
        None => metadata.string_field("connectionStringSetting")?,
    };

    let sql_query = metadata.string_field("sqlQuery")?;
    let id = metadata.string_field("id")?;
    let lookup = match (sql_query, id) {
        (Some(sql_query), id) => {
            if id.is_some() {
                diagnostics.record(Diagnostic::field_warning(
                    DOCUMENT_STORE_PROVIDER,
                    metadata.type_name().as_str(),
                    "id",
                    "id is ignored when sqlQuery is set",
                ));
            }
            DocumentLookup::Query {
                sql_query: sql_query.to_owned(),
            }
        }
        (None, Some(id)) => DocumentLookup::Single { id: id.to_owned() },
        (None, None) => DocumentLookup::Collection,
    };

    Ok(DocumentStoreAttribute {
        database_name: owned(metadata.string_field("databaseName")?),
        collection_name: owned(metadata.string_field("collectionName")?),
        connection: connection.map(str::to_owned),
        lookup,
        partition_key: owned(metadata.string_field("partitionKey")?),
        collection_throughput: metadata.u32_field("collectionThroughput")?,
        create_if_not_exists: metadata.bool_field("createIfNotExists")?,
    })
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_owned)
}
