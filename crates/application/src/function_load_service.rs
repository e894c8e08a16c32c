//! Host-load orchestration: provider initialization and per-function resolution.

use std::sync::Arc;

use scriptbind_core::{AppError, AppResult};
use scriptbind_domain::{FunctionMetadata, ResolvedBinding};

use crate::binding_ports::{
    Diagnostic, DiagnosticLevel, DiagnosticsSink, FunctionRegistration, JobHostConfigurator,
};
use crate::provider_registry::{BindingProviderRegistry, BindingResolution};

const SOURCE: &str = "function_load_service";

/// Load status of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionLoadStatus {
    /// Every binding resolved and the function was registered.
    Loaded(Vec<ResolvedBinding>),
    /// The function is disabled and was not resolved.
    Skipped,
    /// Resolution or registration failed.
    Failed(AppError),
}

/// Outcome of loading one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionLoadOutcome {
    /// Function name.
    pub function_name: String,
    /// Load status.
    pub status: FunctionLoadStatus,
}

/// Per-function outcomes of one host load, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostLoadReport {
    /// Outcomes in input order.
    pub outcomes: Vec<FunctionLoadOutcome>,
}

impl HostLoadReport {
    /// Returns the number of loaded functions.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, FunctionLoadStatus::Loaded(_)))
            .count()
    }

    /// Returns failed functions with their errors.
    #[must_use]
    pub fn failures(&self) -> Vec<(&str, &AppError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                FunctionLoadStatus::Failed(error) => Some((outcome.function_name.as_str(), error)),
                _ => None,
            })
            .collect()
    }

    /// Returns whether any function failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures().is_empty()
    }

    /// Adds outcomes produced outside the load, such as unreadable
    /// declarations, keeping every outcome ordered by function name.
    pub fn merge(&mut self, outcomes: impl IntoIterator<Item = FunctionLoadOutcome>) {
        self.outcomes.extend(outcomes);
        self.outcomes
            .sort_by(|left, right| left.function_name.cmp(&right.function_name));
    }
}

/// Application service loading declared functions into the job host.
#[derive(Clone)]
pub struct FunctionLoadService {
    registry: Arc<BindingProviderRegistry>,
    job_host: Arc<dyn JobHostConfigurator>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl FunctionLoadService {
    /// Creates a new load service.
    #[must_use]
    pub fn new(
        registry: Arc<BindingProviderRegistry>,
        job_host: Arc<dyn JobHostConfigurator>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            registry,
            job_host,
            diagnostics,
        }
    }

    /// Initializes every provider and hands their extensions to the job host.
    ///
    /// Returns the number of extensions enabled.
    pub async fn initialize(&self) -> AppResult<usize> {
        let extensions = self.registry.initialize()?;
        let count = extensions.len();

        for extension in extensions {
            self.diagnostics.record(Diagnostic::general(
                DiagnosticLevel::Info,
                SOURCE,
                format!("enabling extension '{}'", extension.name()),
            ));
            self.job_host.use_extension(extension).await?;
        }

        Ok(count)
    }

    /// Resolves every binding of one function.
    ///
    /// Fails on the first unclaimed or malformed binding.
    pub fn resolve_function(&self, function: &FunctionMetadata) -> AppResult<Vec<ResolvedBinding>> {
        function
            .bindings()
            .iter()
            .map(|binding| match self.registry.resolve(binding)? {
                BindingResolution::Resolved(resolved) => Ok(resolved),
                BindingResolution::Unclaimed => Err(AppError::UnclaimedBindingType {
                    function_name: function.name().as_str().to_owned(),
                    binding_type: binding.type_name().as_str().to_owned(),
                }),
            })
            .collect()
    }

    /// Loads every function. One failing function never stops the others.
    pub async fn load_functions(&self, functions: &[FunctionMetadata]) -> HostLoadReport {
        let mut report = HostLoadReport::default();

        for function in functions {
            let function_name = function.name().as_str().to_owned();
            let status = if function.is_disabled() {
                self.diagnostics.record(Diagnostic::general(
                    DiagnosticLevel::Info,
                    SOURCE,
                    format!("function '{function_name}' is disabled"),
                ));
                FunctionLoadStatus::Skipped
            } else {
                match self.load_function(function).await {
                    Ok(bindings) => FunctionLoadStatus::Loaded(bindings),
                    Err(error) => FunctionLoadStatus::Failed(error),
                }
            };

            report.outcomes.push(FunctionLoadOutcome {
                function_name,
                status,
            });
        }

        report
    }

    async fn load_function(&self, function: &FunctionMetadata) -> AppResult<Vec<ResolvedBinding>> {
        let bindings = self.resolve_function(function)?;

        self.job_host
            .register_function(FunctionRegistration {
                function_name: function.name().as_str().to_owned(),
                bindings: bindings.clone(),
            })
            .await?;

        Ok(bindings)
    }
}

#[cfg(test)]
mod tests;
