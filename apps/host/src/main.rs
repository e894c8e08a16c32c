//! Script host runner: resolves every declared binding under a script root.

#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use scriptbind_application::{
    FunctionLoadService, FunctionLoadStatus, HostLoadReport, ProviderContext,
};
use scriptbind_core::{AppError, AppResult};
use scriptbind_domain::{ExtensionConfiguration, LeaseDefaults};
use scriptbind_infrastructure::{
    InMemoryJobHost, ScriptRootLoader, TracingDiagnosticsSink, builtin_catalog,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct HostConfig {
    script_root: PathBuf,
    host_id: String,
    fail_on_error: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = HostConfig::load()?;
    info!(
        host_id = %config.host_id,
        script_root = %config.script_root.display(),
        "scriptbind-host started"
    );

    let script_root = ScriptRootLoader::new(config.script_root.clone())
        .load()
        .await?;
    let context = ProviderContext::new(
        Arc::new(script_root.host_configuration),
        Arc::new(TracingDiagnosticsSink::new()),
    );
    let registry = builtin_catalog()?.build_registry(&context)?;
    info!(providers = ?registry.provider_names(), "binding providers registered");

    let job_host = Arc::new(InMemoryJobHost::new());
    let service = FunctionLoadService::new(
        Arc::new(registry),
        job_host.clone(),
        context.diagnostics.clone(),
    );
    let extension_count = service.initialize().await?;

    let mut report = service.load_functions(&script_root.functions).await;
    report.merge(script_root.invalid);

    log_report(&report);
    log_change_feed_leases(&config, &report, &job_host.extensions().await);

    info!(
        extensions = extension_count,
        loaded = report.loaded_count(),
        failed = report.failures().len(),
        "host load finished"
    );

    if config.fail_on_error && report.has_failures() {
        return Err(AppError::Validation(format!(
            "{} function(s) failed to load",
            report.failures().len()
        )));
    }

    Ok(())
}

fn log_report(report: &HostLoadReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            FunctionLoadStatus::Loaded(bindings) => {
                for binding in bindings {
                    info!(
                        function_name = %outcome.function_name,
                        binding_name = binding.name.as_deref().unwrap_or("-"),
                        binding_type = %binding.type_name,
                        provider = %binding.provider,
                        direction = binding.direction.as_str(),
                        default_type = binding.default_type.as_str(),
                        "binding resolved"
                    );
                }
            }
            FunctionLoadStatus::Skipped => {
                info!(function_name = %outcome.function_name, "function disabled");
            }
            FunctionLoadStatus::Failed(error) => {
                warn!(
                    function_name = %outcome.function_name,
                    error = %error,
                    field = error.offending_field().unwrap_or("-"),
                    "function failed to load"
                );
            }
        }
    }
}

/// Logs the effective lease timings of every loaded change-feed trigger.
fn log_change_feed_leases(
    config: &HostConfig,
    report: &HostLoadReport,
    extensions: &[ExtensionConfiguration],
) {
    let defaults = extensions
        .iter()
        .map(|extension| match extension {
            ExtensionConfiguration::DocumentStore(settings) => settings.lease_defaults.clone(),
        })
        .next()
        .unwrap_or_else(LeaseDefaults::engine);

    for outcome in &report.outcomes {
        let FunctionLoadStatus::Loaded(bindings) = &outcome.status else {
            continue;
        };

        for trigger in bindings
            .iter()
            .filter_map(|binding| binding.descriptor.change_feed_trigger())
        {
            let timings = trigger.lease_configuration().effective(&defaults);

            info!(
                function_name = %outcome.function_name,
                host_id = %config.host_id,
                lease_prefix = %timings.lease_prefix,
                database_name = %trigger.database_name,
                collection_name = %trigger.collection_name,
                feed_poll_delay_ms = timings.feed_poll_delay.as_millis(),
                lease_acquire_interval_ms = timings.lease_acquire_interval.as_millis(),
                lease_expiration_interval_ms = timings.lease_expiration_interval.as_millis(),
                lease_renew_interval_ms = timings.lease_renew_interval.as_millis(),
                reclaim_window_ms = timings.reclaim_window().as_millis(),
                "change-feed lease plan"
            );
        }
    }
}

impl HostConfig {
    fn load() -> AppResult<Self> {
        let script_root = PathBuf::from(required_env("SCRIPT_ROOT")?);
        let host_id = env::var("SCRIPTBIND_HOST_ID")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("host-{}", std::process::id()));
        let fail_on_error = parse_env_bool("SCRIPTBIND_FAIL_ON_ERROR", false)?;

        Ok(Self {
            script_root,
            host_id,
            fail_on_error,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(AppError::Validation(format!(
                "invalid {name} value '{value}': expected true or false"
            ))),
        },
        Err(_) => Ok(default),
    }
}
