use async_trait::async_trait;
use scriptbind_core::AppResult;
use scriptbind_domain::{ExtensionConfiguration, ResolvedBinding};

/// Bindings of one function handed to the job host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRegistration {
    /// Function name.
    pub function_name: String,
    /// Resolved bindings in declaration order.
    pub bindings: Vec<ResolvedBinding>,
}

/// Job-execution host configuration port.
#[async_trait]
pub trait JobHostConfigurator: Send + Sync {
    /// Enables one extension with its host-wide settings.
    async fn use_extension(&self, extension: ExtensionConfiguration) -> AppResult<()>;

    /// Registers every resolved binding of one function.
    async fn register_function(&self, registration: FunctionRegistration) -> AppResult<()>;
}
