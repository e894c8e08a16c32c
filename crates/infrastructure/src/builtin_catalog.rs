use std::sync::Arc;

use scriptbind_application::{ProviderCatalog, ProviderContext, ScriptBindingProvider};
use scriptbind_core::AppResult;

use crate::document_store_binding_provider::{DOCUMENT_STORE_PROVIDER, DocumentStoreBindingProvider};

/// Returns the catalog of providers shipped with the host.
pub fn builtin_catalog() -> AppResult<ProviderCatalog> {
    let mut catalog = ProviderCatalog::new();
    catalog.register(DOCUMENT_STORE_PROVIDER, document_store_provider)?;
    Ok(catalog)
}

fn document_store_provider(context: ProviderContext) -> Arc<dyn ScriptBindingProvider> {
    Arc::new(DocumentStoreBindingProvider::new(context))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scriptbind_application::{
        BindingResolution, FunctionLoadService, FunctionLoadStatus, ProviderContext,
    };
    use scriptbind_core::AppError;
    use scriptbind_domain::{BindingMetadata, FunctionMetadata, HostConfiguration};
    use serde_json::json;

    use super::builtin_catalog;
    use crate::{InMemoryJobHost, TracingDiagnosticsSink};

    fn context(host: serde_json::Value) -> ProviderContext {
        ProviderContext::new(
            Arc::new(HostConfiguration::from_value(host).unwrap_or_else(|_| unreachable!())),
            Arc::new(TracingDiagnosticsSink::new()),
        )
    }

    #[test]
    fn catalog_lists_document_store() {
        let catalog = builtin_catalog().unwrap_or_default();

        assert_eq!(catalog.names(), vec!["documentDB"]);
    }

    #[test]
    fn unknown_extension_in_host_configuration_is_rejected() {
        let catalog = builtin_catalog().unwrap_or_default();

        let registry = catalog.build_registry(&context(json!({"extensions": ["queues"]})));

        assert!(matches!(registry, Err(AppError::Validation(_))));
    }

    #[test]
    fn empty_extension_list_claims_nothing() {
        let catalog = builtin_catalog().unwrap_or_default();
        let registry = catalog
            .build_registry(&context(json!({"extensions": []})))
            .unwrap_or_default();
        assert!(registry.initialize().is_ok());

        let metadata =
            BindingMetadata::from_value(&json!({"type": "documentDB", "direction": "in"}))
                .unwrap_or_else(|_| unreachable!());

        assert!(matches!(
            registry.resolve(&metadata),
            Ok(BindingResolution::Unclaimed)
        ));
    }

    #[tokio::test]
    async fn loads_functions_end_to_end() {
        let context = context(json!({}));
        let registry = builtin_catalog()
            .and_then(|catalog| catalog.build_registry(&context))
            .unwrap_or_default();
        let job_host = Arc::new(InMemoryJobHost::new());
        let service = FunctionLoadService::new(
            Arc::new(registry),
            job_host.clone(),
            context.diagnostics.clone(),
        );

        assert_eq!(service.initialize().await.ok(), Some(1));

        let functions = vec![
            FunctionMetadata::from_value(
                "orders",
                &json!({"bindings": [
                    {"type": "cosmosDBTrigger", "direction": "trigger", "name": "docs",
                     "databaseName": "db", "collectionName": "orders"},
                    {"type": "documentDB", "direction": "out", "name": "audit",
                     "databaseName": "db", "collectionName": "audit"}
                ]}),
            ),
            FunctionMetadata::from_value(
                "typo",
                &json!({"bindings": [{"type": "blobTriggerTypo", "direction": "trigger"}]}),
            ),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_default();

        let report = service.load_functions(&functions).await;

        assert_eq!(report.loaded_count(), 1);
        assert!(matches!(
            &report.outcomes[0].status,
            FunctionLoadStatus::Loaded(bindings) if bindings.len() == 2
        ));
        assert!(matches!(
            &report.outcomes[1].status,
            FunctionLoadStatus::Failed(AppError::UnclaimedBindingType { .. })
        ));
        assert_eq!(job_host.functions().await.len(), 1);
        assert_eq!(job_host.extensions().await.len(), 1);
    }
}
