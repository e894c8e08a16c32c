use async_trait::async_trait;
use scriptbind_application::{FunctionRegistration, JobHostConfigurator};
use scriptbind_core::{AppError, AppResult};
use scriptbind_domain::ExtensionConfiguration;
use tokio::sync::RwLock;
use tracing::info;

/// Job host that records enabled extensions and registered functions.
#[derive(Debug, Default)]
pub struct InMemoryJobHost {
    extensions: RwLock<Vec<ExtensionConfiguration>>,
    functions: RwLock<Vec<FunctionRegistration>>,
}

impl InMemoryJobHost {
    /// Creates an empty job host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns enabled extensions in the order they were handed over.
    pub async fn extensions(&self) -> Vec<ExtensionConfiguration> {
        self.extensions.read().await.clone()
    }

    /// Returns registered functions in registration order.
    pub async fn functions(&self) -> Vec<FunctionRegistration> {
        self.functions.read().await.clone()
    }
}

#[async_trait]
impl JobHostConfigurator for InMemoryJobHost {
    async fn use_extension(&self, extension: ExtensionConfiguration) -> AppResult<()> {
        let mut extensions = self.extensions.write().await;

        if extensions
            .iter()
            .any(|existing| existing.name() == extension.name())
        {
            return Err(AppError::Conflict(format!(
                "extension '{}' is already enabled",
                extension.name()
            )));
        }

        info!(extension = extension.name(), "extension enabled");
        extensions.push(extension);
        Ok(())
    }

    async fn register_function(&self, registration: FunctionRegistration) -> AppResult<()> {
        let mut functions = self.functions.write().await;

        if functions
            .iter()
            .any(|existing| existing.function_name == registration.function_name)
        {
            return Err(AppError::Conflict(format!(
                "function '{}' is already registered",
                registration.function_name
            )));
        }

        functions.push(registration);
        Ok(())
    }
}
