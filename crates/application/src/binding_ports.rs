mod diagnostics;
mod job_host;
mod lease_store;
mod provider;

pub use diagnostics::{Diagnostic, DiagnosticLevel, DiagnosticsSink};
pub use job_host::{FunctionRegistration, JobHostConfigurator};
pub use lease_store::{LeaseClaim, LeaseStore};
pub use provider::{ProviderContext, ScriptBinding, ScriptBindingProvider};
