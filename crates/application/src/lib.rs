//! Binding provider contracts, registry and host-load services.

#![forbid(unsafe_code)]

mod assembly_table;
mod binding_ports;
mod function_load_service;
mod partition_lease_coordinator;
mod provider_catalog;
mod provider_registry;

pub use assembly_table::{AssemblyRef, AssemblyTable};
pub use binding_ports::{
    Diagnostic, DiagnosticLevel, DiagnosticsSink, FunctionRegistration, JobHostConfigurator,
    LeaseClaim, LeaseStore, ProviderContext, ScriptBinding, ScriptBindingProvider,
};
pub use function_load_service::{
    FunctionLoadOutcome, FunctionLoadService, FunctionLoadStatus, HostLoadReport,
};
pub use partition_lease_coordinator::{CheckpointProgress, PartitionLeaseCoordinator};
pub use provider_catalog::{ProviderCatalog, ProviderConstructor};
pub use provider_registry::{BindingProviderRegistry, BindingResolution, ClaimedBinding};
