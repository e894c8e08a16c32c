//! Reads `host.json` and `*/function.json` from a script root directory.

use std::path::{Path, PathBuf};

use scriptbind_application::{FunctionLoadOutcome, FunctionLoadStatus};
use scriptbind_core::{AppError, AppResult};
use scriptbind_domain::{FunctionMetadata, HostConfiguration};
use serde_json::Value;
use tracing::{debug, warn};

const HOST_FILE: &str = "host.json";
const FUNCTION_FILE: &str = "function.json";

/// Parsed contents of one script root.
#[derive(Debug, Clone)]
pub struct ScriptRoot {
    /// Host-wide configuration, empty when `host.json` is absent.
    pub host_configuration: HostConfiguration,
    /// Successfully parsed functions ordered by directory name.
    pub functions: Vec<FunctionMetadata>,
    /// Functions whose declaration could not be read or parsed.
    pub invalid: Vec<FunctionLoadOutcome>,
}

/// Loader for script root directories.
#[derive(Debug, Clone)]
pub struct ScriptRootLoader {
    root: PathBuf,
}

impl ScriptRootLoader {
    /// Creates a loader for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the script root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Loads the host configuration and every function declaration.
    ///
    /// A malformed `host.json` fails the whole load; a malformed
    /// `function.json` is reported in [`ScriptRoot::invalid`].
    pub async fn load(&self) -> AppResult<ScriptRoot> {
        let host_configuration = self.load_host_configuration().await?;

        let mut functions = Vec::new();
        let mut invalid = Vec::new();
        for (function_name, path) in self.function_files().await? {
            match load_function(function_name.as_str(), path.as_path()).await {
                Ok(function) => {
                    debug!(
                        function_name = %function_name,
                        bindings = function.bindings().len(),
                        "function declaration loaded"
                    );
                    functions.push(function);
                }
                Err(error) => {
                    warn!(
                        function_name = %function_name,
                        error = %error,
                        "invalid function declaration"
                    );
                    invalid.push(FunctionLoadOutcome {
                        function_name,
                        status: FunctionLoadStatus::Failed(error),
                    });
                }
            }
        }

        Ok(ScriptRoot {
            host_configuration,
            functions,
            invalid,
        })
    }

    async fn load_host_configuration(&self) -> AppResult<HostConfiguration> {
        let path = self.root.join(HOST_FILE);
        if !tokio::fs::try_exists(&path).await.map_err(|error| io_error(&path, error))? {
            return Ok(HostConfiguration::empty());
        }

        HostConfiguration::from_value(read_json(&path).await?)
    }

    async fn function_files(&self) -> AppResult<Vec<(String, PathBuf)>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|error| io_error(&self.root, error))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|error| io_error(&self.root, error))?
        {
            let path = entry.path().join(FUNCTION_FILE);
            let is_function = tokio::fs::try_exists(&path)
                .await
                .map_err(|error| io_error(&path, error))?;
            if !is_function {
                continue;
            }

            files.push((entry.file_name().to_string_lossy().into_owned(), path));
        }

        files.sort_by(|left, right| left.0.cmp(&right.0));
        Ok(files)
    }
}

async fn load_function(function_name: &str, path: &Path) -> AppResult<FunctionMetadata> {
    FunctionMetadata::from_value(function_name, &read_json(path).await?)
}

async fn read_json(path: &Path) -> AppResult<Value> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|error| io_error(path, error))?;

    serde_json::from_str(contents.as_str()).map_err(|error| {
        AppError::Validation(format!("'{}' is not valid JSON: {error}", path.display()))
    })
}

fn io_error(path: &Path, error: std::io::Error) -> AppError {
    AppError::Internal(format!("failed to read '{}': {error}", path.display()))
}
