//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod builtin_catalog;
mod document_store_binding_provider;
mod in_memory_job_host;
mod in_memory_lease_store;
mod script_root_loader;
mod tracing_diagnostics_sink;

pub use builtin_catalog::builtin_catalog;
pub use document_store_binding_provider::{
    CHANGE_FEED_TRIGGER_TYPE, DOCUMENT_BINDING_TYPE, DOCUMENT_STORE_PROVIDER,
    DocumentStoreBindingProvider,
};
pub use in_memory_job_host::InMemoryJobHost;
pub use in_memory_lease_store::InMemoryLeaseStore;
pub use script_root_loader::{ScriptRoot, ScriptRootLoader};
pub use tracing_diagnostics_sink::TracingDiagnosticsSink;
