//! Ordered dispatch of binding declarations to providers.
//!
//! Dispatch is first-match in registration order. Providers whose type
//! names overlap are told apart by that order alone; there is no priority
//! field. Changing the order changes which provider wins.

use std::sync::Arc;

use scriptbind_core::AppResult;
use scriptbind_domain::{BindingMetadata, ExtensionConfiguration, ResolvedBinding};

use crate::assembly_table::AssemblyRef;
use crate::binding_ports::{ScriptBinding, ScriptBindingProvider};

/// Result of asking the registry to resolve one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingResolution {
    /// A provider claimed the declaration.
    Resolved(ResolvedBinding),
    /// No provider recognises the declared type.
    Unclaimed,
}

/// Binding claimed by one provider, before descriptors are built.
#[derive(Debug)]
pub struct ClaimedBinding {
    /// Name of the claiming provider.
    pub provider: String,
    /// Binding produced by the provider.
    pub binding: Box<dyn ScriptBinding>,
}

impl ClaimedBinding {
    /// Builds the resolved form of the binding.
    pub fn resolve(&self) -> AppResult<ResolvedBinding> {
        let descriptor = self.binding.build_descriptor()?;
        Ok(ResolvedBinding::new(
            self.provider.as_str(),
            self.binding.metadata(),
            self.binding.default_type(),
            descriptor,
        ))
    }
}

/// Ordered provider collection.
#[derive(Clone, Default)]
pub struct BindingProviderRegistry {
    providers: Vec<Arc<dyn ScriptBindingProvider>>,
}

impl BindingProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider. Call order is dispatch order.
    pub fn register(&mut self, provider: Arc<dyn ScriptBindingProvider>) {
        self.providers.push(provider);
    }

    /// Returns provider names in dispatch order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Initializes every provider in registration order.
    ///
    /// Returns the extension configurations to hand to the job host.
    pub fn initialize(&self) -> AppResult<Vec<ExtensionConfiguration>> {
        let mut extensions = Vec::new();
        for provider in &self.providers {
            if let Some(extension) = provider.initialize()? {
                extensions.push(extension);
            }
        }

        Ok(extensions)
    }

    /// Returns the first provider claim for `metadata`.
    pub fn claim(&self, metadata: &BindingMetadata) -> AppResult<Option<ClaimedBinding>> {
        for provider in &self.providers {
            if let Some(binding) = provider.try_claim(metadata)? {
                return Ok(Some(ClaimedBinding {
                    provider: provider.name().to_owned(),
                    binding,
                }));
            }
        }

        Ok(None)
    }

    /// Resolves `metadata` through the first claiming provider.
    pub fn resolve(&self, metadata: &BindingMetadata) -> AppResult<BindingResolution> {
        match self.claim(metadata)? {
            Some(claimed) => claimed.resolve().map(BindingResolution::Resolved),
            None => Ok(BindingResolution::Unclaimed),
        }
    }

    /// Asks providers in order to resolve an assembly name. Misses are not errors.
    #[must_use]
    pub fn resolve_assembly(&self, assembly_name: &str) -> Option<AssemblyRef> {
        self.providers
            .iter()
            .find_map(|provider| provider.resolve_assembly(assembly_name))
    }
}

#[cfg(test)]
mod tests;
