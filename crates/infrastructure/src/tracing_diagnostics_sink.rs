use scriptbind_application::{Diagnostic, DiagnosticLevel, DiagnosticsSink};
use tracing::{info, warn};

/// Diagnostics sink forwarding resolution diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnosticsSink;

impl TracingDiagnosticsSink {
    /// Creates the sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticsSink for TracingDiagnosticsSink {
    fn record(&self, diagnostic: Diagnostic) {
        let binding_type = diagnostic.binding_type.as_deref().unwrap_or("-");
        let field = diagnostic.field.as_deref().unwrap_or("-");

        match diagnostic.level {
            DiagnosticLevel::Info => info!(
                source = %diagnostic.source,
                binding_type = %binding_type,
                field = %field,
                "{}",
                diagnostic.message
            ),
            DiagnosticLevel::Warning => warn!(
                source = %diagnostic.source,
                binding_type = %binding_type,
                field = %field,
                "{}",
                diagnostic.message
            ),
        }
    }
}
