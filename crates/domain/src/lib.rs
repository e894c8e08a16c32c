//! Binding declarations, descriptors and lease configuration.

#![forbid(unsafe_code)]

mod binding;
mod descriptor;
mod extension;
mod function;
mod host_config;
mod lease;
mod partition_lease;

pub use binding::{AccessMode, BindingDirection, BindingMetadata};
pub use descriptor::{
    AttributeSet, BindingAttribute, ChangeFeedTriggerAttribute, DocumentLookup,
    DocumentStoreAttribute, ResolvedBinding, TriggerRecordKind, TypeTag,
};
pub use extension::{ConnectionMode, DocumentStoreExtension, ExtensionConfiguration};
pub use function::FunctionMetadata;
pub use host_config::HostConfiguration;
pub use lease::{
    CheckpointPolicy, EffectiveLeaseTimings, HostLeaseOptions, LeaseConfiguration, LeaseDefaults,
    parse_time_span,
};
pub use partition_lease::PartitionLease;
