//! Document-store bindings and change-feed triggers.

use std::sync::OnceLock;

use scriptbind_application::{
    AssemblyRef, AssemblyTable, Diagnostic, ProviderContext, ScriptBinding, ScriptBindingProvider,
};
use scriptbind_core::{AppError, AppResult};
use scriptbind_domain::{
    BindingMetadata, ConnectionMode, DocumentStoreExtension, ExtensionConfiguration,
    HostLeaseOptions, LeaseDefaults,
};

mod binding;

use binding::DocumentStoreBinding;

/// Provider name, also the host configuration section it reads.
pub const DOCUMENT_STORE_PROVIDER: &str = "documentDB";

/// Binding type for document input and output bindings.
pub const DOCUMENT_BINDING_TYPE: &str = "documentDB";

/// Binding type for change-feed triggers.
pub const CHANGE_FEED_TRIGGER_TYPE: &str = "cosmosDBTrigger";

const ASSEMBLIES: &[AssemblyRef] = &[
    AssemblyRef {
        name: "Microsoft.Azure.Documents.Client",
        exported_types: &["Microsoft.Azure.Documents.Client.DocumentClient"],
    },
    AssemblyRef {
        name: "Microsoft.Azure.WebJobs.Extensions.DocumentDB",
        exported_types: &[
            "Microsoft.Azure.WebJobs.DocumentDBAttribute",
            "Microsoft.Azure.WebJobs.CosmosDBTriggerAttribute",
        ],
    },
];

/// Provider for `documentDB` bindings and `cosmosDBTrigger` triggers.
pub struct DocumentStoreBindingProvider {
    context: ProviderContext,
    extension: OnceLock<DocumentStoreExtension>,
    assemblies: AssemblyTable,
}

impl DocumentStoreBindingProvider {
    /// Creates an uninitialized provider.
    #[must_use]
    pub fn new(context: ProviderContext) -> Self {
        Self {
            context,
            extension: OnceLock::new(),
            assemblies: AssemblyTable::new(ASSEMBLIES),
        }
    }

    fn read_extension(&self) -> AppResult<DocumentStoreExtension> {
        let mut extension = DocumentStoreExtension::default();
        let Some(section) = self
            .context
            .host_configuration
            .section(DOCUMENT_STORE_PROVIDER)
        else {
            return Ok(extension);
        };

        if let Some(value) = section.get("leaseOptions").filter(|value| !value.is_null()) {
            let options = HostLeaseOptions::from_value(value).map_err(|error| {
                AppError::Validation(format!("host section '{DOCUMENT_STORE_PROVIDER}': {error}"))
            })?;
            let defaults = LeaseDefaults::engine().with_host_options(&options);
            defaults.validate().map_err(|error| {
                AppError::Validation(format!(
                    "host section '{DOCUMENT_STORE_PROVIDER}' leaseOptions: {error}"
                ))
            })?;
            extension.lease_defaults = defaults;
        }

        if let Some(mode) = section.get("connectionMode").and_then(|value| value.as_str()) {
            match mode.parse::<ConnectionMode>() {
                Ok(mode) => extension.connection_mode = Some(mode),
                Err(error) => self.context.diagnostics.record(Diagnostic::field_warning(
                    DOCUMENT_STORE_PROVIDER,
                    DOCUMENT_STORE_PROVIDER,
                    "connectionMode",
                    format!("{error}; keeping the client default"),
                )),
            }
        }

        Ok(extension)
    }
}

impl ScriptBindingProvider for DocumentStoreBindingProvider {
    fn name(&self) -> &str {
        DOCUMENT_STORE_PROVIDER
    }

    fn initialize(&self) -> AppResult<Option<ExtensionConfiguration>> {
        let extension = match self.extension.get() {
            Some(extension) => extension,
            None => {
                let parsed = self.read_extension()?;
                self.extension.get_or_init(|| parsed)
            }
        };

        Ok(Some(ExtensionConfiguration::DocumentStore(extension.clone())))
    }

    fn try_claim(&self, metadata: &BindingMetadata) -> AppResult<Option<Box<dyn ScriptBinding>>> {
        if !metadata.type_matches(DOCUMENT_BINDING_TYPE)
            && !metadata.type_matches(CHANGE_FEED_TRIGGER_TYPE)
        {
            return Ok(None);
        }

        let extension = self.extension.get().ok_or_else(|| {
            AppError::Internal(format!(
                "provider '{DOCUMENT_STORE_PROVIDER}' claimed a binding before initialization"
            ))
        })?;

        let binding = DocumentStoreBinding::new(
            metadata.clone(),
            &extension.lease_defaults,
            self.context.diagnostics.as_ref(),
        )?;

        Ok(Some(Box::new(binding)))
    }

    fn resolve_assembly(&self, assembly_name: &str) -> Option<AssemblyRef> {
        self.assemblies.lookup(assembly_name)
    }
}
