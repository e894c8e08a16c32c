use std::fmt::Debug;
use std::sync::Arc;

use scriptbind_core::AppResult;
use scriptbind_domain::{
    AttributeSet, BindingMetadata, ExtensionConfiguration, HostConfiguration, TypeTag,
};

use crate::assembly_table::AssemblyRef;

use super::DiagnosticsSink;

/// Immutable collaborators handed to every provider constructor.
#[derive(Clone)]
pub struct ProviderContext {
    /// Global host configuration, parsed once.
    pub host_configuration: Arc<HostConfiguration>,
    /// Sink for resolution warnings.
    pub diagnostics: Arc<dyn DiagnosticsSink>,
}

impl ProviderContext {
    /// Creates a provider context.
    #[must_use]
    pub fn new(
        host_configuration: Arc<HostConfiguration>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            host_configuration,
            diagnostics,
        }
    }
}

/// Factory for one family of binding kinds.
pub trait ScriptBindingProvider: Send + Sync {
    /// Returns the provider name used in reports and the extension allow-list.
    fn name(&self) -> &str;

    /// Reads this provider's host configuration section once.
    ///
    /// Later calls return the configuration captured by the first call.
    fn initialize(&self) -> AppResult<Option<ExtensionConfiguration>>;

    /// Claims `metadata` when its type belongs to this provider.
    ///
    /// Returns `Ok(None)` for foreign types. Errors only for claimed types
    /// with malformed fields.
    fn try_claim(&self, metadata: &BindingMetadata) -> AppResult<Option<Box<dyn ScriptBinding>>>;

    /// Maps an assembly name referenced by declarative metadata to one of
    /// this provider's registered assemblies.
    fn resolve_assembly(&self, assembly_name: &str) -> Option<AssemblyRef>;
}

/// One claimed binding.
pub trait ScriptBinding: Debug + Send + Sync {
    /// Returns the declaration this binding was built from.
    fn metadata(&self) -> &BindingMetadata;

    /// Returns the default data type for the invocation pipeline.
    fn default_type(&self) -> TypeTag;

    /// Builds the typed descriptor set.
    fn build_descriptor(&self) -> AppResult<AttributeSet>;
}
