//! Registration table from symbolic extension names to provider constructors.

use std::sync::Arc;

use scriptbind_core::{AppError, AppResult};

use crate::binding_ports::{ProviderContext, ScriptBindingProvider};
use crate::provider_registry::BindingProviderRegistry;

/// Constructor registered for one extension.
pub type ProviderConstructor = fn(ProviderContext) -> Arc<dyn ScriptBindingProvider>;

#[derive(Clone, Copy)]
struct CatalogEntry {
    name: &'static str,
    constructor: ProviderConstructor,
}

/// Ordered catalog of known binding extensions.
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    entries: Vec<CatalogEntry>,
}

impl ProviderCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension constructor under a symbolic name.
    pub fn register(&mut self, name: &'static str, constructor: ProviderConstructor) -> AppResult<()> {
        if self.find(name).is_some() {
            return Err(AppError::Conflict(format!(
                "extension '{name}' is already registered"
            )));
        }

        self.entries.push(CatalogEntry { name, constructor });
        Ok(())
    }

    /// Returns registered extension names in catalog order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }

    /// Builds a registry for the host configured in `context`.
    ///
    /// A host `extensions` list selects and orders providers; without one
    /// every catalog entry is used in catalog order.
    pub fn build_registry(&self, context: &ProviderContext) -> AppResult<BindingProviderRegistry> {
        let selected = match context.host_configuration.extensions()? {
            None => self.entries.clone(),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.find(name).ok_or_else(|| {
                        AppError::Validation(format!(
                            "host configuration enables unknown extension '{name}'"
                        ))
                    })
                })
                .collect::<AppResult<Vec<_>>>()?,
        };

        let mut registry = BindingProviderRegistry::new();
        for entry in selected {
            registry.register((entry.constructor)(context.clone()));
        }

        Ok(registry)
    }

    fn find(&self, name: &str) -> Option<CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .copied()
    }
}
