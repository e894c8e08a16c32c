use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scriptbind_core::{AppError, AppResult};
use scriptbind_domain::{
    AttributeSet, BindingMetadata, DocumentStoreExtension, ExtensionConfiguration,
    FunctionMetadata, TypeTag,
};
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;

use crate::assembly_table::AssemblyRef;
use crate::binding_ports::{
    Diagnostic, DiagnosticsSink, FunctionRegistration, JobHostConfigurator, ScriptBinding,
    ScriptBindingProvider,
};
use crate::provider_registry::BindingProviderRegistry;

use super::{FunctionLoadOutcome, FunctionLoadService, FunctionLoadStatus, HostLoadReport};

#[derive(Default)]
struct RecordingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticsSink for RecordingSink {
    fn record(&self, diagnostic: Diagnostic) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(diagnostic);
        }
    }
}

#[derive(Default)]
struct FakeJobHost {
    extensions: AsyncMutex<Vec<ExtensionConfiguration>>,
    registrations: AsyncMutex<Vec<FunctionRegistration>>,
}

#[async_trait]
impl JobHostConfigurator for FakeJobHost {
    async fn use_extension(&self, extension: ExtensionConfiguration) -> AppResult<()> {
        self.extensions.lock().await.push(extension);
        Ok(())
    }

    async fn register_function(&self, registration: FunctionRegistration) -> AppResult<()> {
        if registration.function_name == "rejected" {
            return Err(AppError::Conflict("function already registered".to_owned()));
        }

        self.registrations.lock().await.push(registration);
        Ok(())
    }
}

#[derive(Debug)]
struct QueueBinding {
    metadata: BindingMetadata,
}

impl ScriptBinding for QueueBinding {
    fn metadata(&self) -> &BindingMetadata {
        &self.metadata
    }

    fn default_type(&self) -> TypeTag {
        TypeTag::AsyncWriteCollector
    }

    fn build_descriptor(&self) -> AppResult<AttributeSet> {
        Ok(AttributeSet::default())
    }
}

struct QueueProvider;

impl ScriptBindingProvider for QueueProvider {
    fn name(&self) -> &str {
        "queues"
    }

    fn initialize(&self) -> AppResult<Option<ExtensionConfiguration>> {
        Ok(Some(ExtensionConfiguration::DocumentStore(
            DocumentStoreExtension::default(),
        )))
    }

    fn try_claim(&self, metadata: &BindingMetadata) -> AppResult<Option<Box<dyn ScriptBinding>>> {
        if !metadata.type_matches("queue") {
            return Ok(None);
        }

        Ok(Some(Box::new(QueueBinding {
            metadata: metadata.clone(),
        })))
    }

    fn resolve_assembly(&self, _assembly_name: &str) -> Option<AssemblyRef> {
        None
    }
}

fn service() -> (FunctionLoadService, Arc<FakeJobHost>, Arc<RecordingSink>) {
    let mut registry = BindingProviderRegistry::new();
    registry.register(Arc::new(QueueProvider));
    let job_host = Arc::new(FakeJobHost::default());
    let sink = Arc::new(RecordingSink::default());

    (
        FunctionLoadService::new(Arc::new(registry), job_host.clone(), sink.clone()),
        job_host,
        sink,
    )
}

fn function(name: &str, document: serde_json::Value) -> FunctionMetadata {
    FunctionMetadata::from_value(name, &document).unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn initialize_hands_extensions_to_job_host() {
    let (service, job_host, sink) = service();

    assert_eq!(service.initialize().await, Ok(1));
    assert_eq!(job_host.extensions.lock().await.len(), 1);
    assert_eq!(sink.diagnostics.lock().map(|d| d.len()).unwrap_or_default(), 1);
}

#[tokio::test]
async fn unclaimed_binding_fails_only_its_function() {
    let (service, job_host, _sink) = service();
    let functions = vec![
        function(
            "broken",
            json!({"bindings": [
                {"type": "queue", "direction": "out"},
                {"type": "blobTriggerTypo", "direction": "trigger"}
            ]}),
        ),
        function(
            "healthy",
            json!({"bindings": [{"type": "Queue", "direction": "out", "name": "items"}]}),
        ),
        function(
            "paused",
            json!({"disabled": true, "bindings": [{"type": "nothing", "direction": "in"}]}),
        ),
    ];

    let report = service.load_functions(&functions).await;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.loaded_count(), 1);
    assert_eq!(
        report.failures(),
        vec![(
            "broken",
            &AppError::UnclaimedBindingType {
                function_name: "broken".to_owned(),
                binding_type: "blobTriggerTypo".to_owned(),
            }
        )]
    );
    assert_eq!(report.outcomes[2].status, FunctionLoadStatus::Skipped);

    let registrations = job_host.registrations.lock().await;
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].function_name, "healthy");
    assert_eq!(registrations[0].bindings[0].name.as_deref(), Some("items"));
}

#[tokio::test]
async fn registration_failure_is_reported_per_function() {
    let (service, _job_host, _sink) = service();
    let functions = vec![function(
        "rejected",
        json!({"bindings": [{"type": "queue", "direction": "out"}]}),
    )];

    let report = service.load_functions(&functions).await;
    assert!(report.has_failures());
    assert!(matches!(
        report.outcomes[0].status,
        FunctionLoadStatus::Failed(AppError::Conflict(_))
    ));
}

#[test]
fn resolve_function_returns_one_binding_per_declaration() {
    let (service, _job_host, _sink) = service();
    let declared = function(
        "fan_out",
        json!({"bindings": [
            {"type": "queue", "direction": "out", "name": "a"},
            {"type": "QUEUE", "direction": "out", "name": "b"}
        ]}),
    );

    let resolved = service.resolve_function(&declared).unwrap_or_default();
    assert_eq!(resolved.len(), 2);
    assert!(
        resolved
            .iter()
            .all(|binding| binding.default_type == TypeTag::AsyncWriteCollector)
    );
}

#[test]
fn merged_outcomes_follow_function_name_order() {
    let outcome = |name: &str, status: FunctionLoadStatus| FunctionLoadOutcome {
        function_name: name.to_owned(),
        status,
    };
    let mut report = HostLoadReport {
        outcomes: vec![
            outcome("alpha", FunctionLoadStatus::Skipped),
            outcome("gamma", FunctionLoadStatus::Loaded(Vec::new())),
        ],
    };

    report.merge(vec![outcome(
        "beta",
        FunctionLoadStatus::Failed(AppError::Validation("not valid JSON".to_owned())),
    )]);

    let names: Vec<&str> = report
        .outcomes
        .iter()
        .map(|outcome| outcome.function_name.as_str())
        .collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    assert_eq!(report.failures().len(), 1);
}
