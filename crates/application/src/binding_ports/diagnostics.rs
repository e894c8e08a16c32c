/// Severity of a resolution diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// Informational note.
    Info,
    /// Suspicious but non-fatal configuration.
    Warning,
}

/// One resolution-time diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub level: DiagnosticLevel,
    /// Provider or service emitting the diagnostic.
    pub source: String,
    /// Binding type the diagnostic refers to.
    pub binding_type: Option<String>,
    /// Metadata field the diagnostic refers to.
    pub field: Option<String>,
    /// Human readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a warning about one binding field.
    #[must_use]
    pub fn field_warning(
        source: impl Into<String>,
        binding_type: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            source: source.into(),
            binding_type: Some(binding_type.into()),
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a diagnostic not tied to one binding.
    #[must_use]
    pub fn general(
        level: DiagnosticLevel,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            source: source.into(),
            binding_type: None,
            field: None,
            message: message.into(),
        }
    }
}

/// Write-only sink for resolution warnings.
pub trait DiagnosticsSink: Send + Sync {
    /// Records one diagnostic.
    fn record(&self, diagnostic: Diagnostic);
}
