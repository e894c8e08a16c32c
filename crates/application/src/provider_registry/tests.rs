use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use scriptbind_core::{AppError, AppResult};
use scriptbind_domain::{
    AttributeSet, BindingDirection, BindingMetadata, ExtensionConfiguration, TypeTag,
};
use serde_json::{Map, json};

use crate::assembly_table::{AssemblyRef, AssemblyTable};
use crate::binding_ports::{ScriptBinding, ScriptBindingProvider};

use super::{BindingProviderRegistry, BindingResolution};

const QUEUE_ASSEMBLIES: &[AssemblyRef] = &[AssemblyRef {
    name: "Contoso.Queues",
    exported_types: &[],
}];

#[derive(Debug)]
struct FakeBinding {
    metadata: BindingMetadata,
}

impl ScriptBinding for FakeBinding {
    fn metadata(&self) -> &BindingMetadata {
        &self.metadata
    }

    fn default_type(&self) -> TypeTag {
        TypeTag::RecordCollection
    }

    fn build_descriptor(&self) -> AppResult<AttributeSet> {
        Ok(AttributeSet::default())
    }
}

struct FakeProvider {
    name: &'static str,
    claims: &'static str,
    assemblies: AssemblyTable,
    initialized: AtomicUsize,
}

impl FakeProvider {
    fn new(name: &'static str, claims: &'static str) -> Self {
        Self {
            name,
            claims,
            assemblies: AssemblyTable::new(QUEUE_ASSEMBLIES),
            initialized: AtomicUsize::new(0),
        }
    }
}

impl ScriptBindingProvider for FakeProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn initialize(&self) -> AppResult<Option<ExtensionConfiguration>> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    fn try_claim(&self, metadata: &BindingMetadata) -> AppResult<Option<Box<dyn ScriptBinding>>> {
        if !metadata.type_matches(self.claims) {
            return Ok(None);
        }

        if metadata.has_field("broken") {
            return Err(AppError::binding_configuration(
                metadata.type_name().as_str(),
                "broken",
                "always rejected",
            ));
        }

        Ok(Some(Box::new(FakeBinding {
            metadata: metadata.clone(),
        })))
    }

    fn resolve_assembly(&self, assembly_name: &str) -> Option<AssemblyRef> {
        self.assemblies.lookup(assembly_name)
    }
}

fn metadata(type_name: &str) -> BindingMetadata {
    BindingMetadata::new(type_name, BindingDirection::In, Map::new())
        .unwrap_or_else(|_| unreachable!())
}

#[test]
fn first_registered_provider_wins() {
    let mut registry = BindingProviderRegistry::new();
    registry.register(Arc::new(FakeProvider::new("first", "queue")));
    registry.register(Arc::new(FakeProvider::new("second", "QUEUE")));

    let resolution = registry.resolve(&metadata("Queue"));
    match resolution {
        Ok(BindingResolution::Resolved(resolved)) => assert_eq!(resolved.provider, "first"),
        other => panic!("unexpected resolution: {other:?}"),
    }
    assert_eq!(registry.provider_names(), vec!["first", "second"]);
}

#[test]
fn unknown_type_is_unclaimed_not_an_error() {
    let mut registry = BindingProviderRegistry::new();
    registry.register(Arc::new(FakeProvider::new("queues", "queue")));

    assert_eq!(
        registry.resolve(&metadata("blobTriggerTypo")),
        Ok(BindingResolution::Unclaimed)
    );
    assert_eq!(
        BindingProviderRegistry::new().resolve(&metadata("queue")),
        Ok(BindingResolution::Unclaimed)
    );
}

#[test]
fn claimed_type_with_bad_field_stops_dispatch() {
    let mut registry = BindingProviderRegistry::new();
    registry.register(Arc::new(FakeProvider::new("first", "queue")));
    registry.register(Arc::new(FakeProvider::new("second", "queue")));

    let mut fields = Map::new();
    fields.insert("broken".to_owned(), json!(true));
    let broken = BindingMetadata::new("queue", BindingDirection::In, fields)
        .unwrap_or_else(|_| unreachable!());

    let error = registry.resolve(&broken).err();
    assert_eq!(
        error.as_ref().and_then(|error| error.offending_field()),
        Some("broken")
    );
}

#[test]
fn initialize_visits_every_provider() {
    let first = Arc::new(FakeProvider::new("first", "queue"));
    let second = Arc::new(FakeProvider::new("second", "table"));
    let mut registry = BindingProviderRegistry::new();
    registry.register(first.clone());
    registry.register(second.clone());

    assert_eq!(registry.initialize(), Ok(Vec::new()));
    assert_eq!(first.initialized.load(Ordering::SeqCst), 1);
    assert_eq!(second.initialized.load(Ordering::SeqCst), 1);
}

#[test]
fn assembly_misses_fall_through() {
    let mut registry = BindingProviderRegistry::new();
    registry.register(Arc::new(FakeProvider::new("queues", "queue")));

    assert_eq!(
        registry
            .resolve_assembly("Contoso.Queues, Version=2.0.0.0")
            .map(|assembly| assembly.name),
        Some("Contoso.Queues")
    );
    assert!(registry.resolve_assembly("Contoso.Unknown").is_none());
}
