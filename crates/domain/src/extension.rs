use std::str::FromStr;

use scriptbind_core::AppError;
use serde::{Deserialize, Serialize};

use crate::lease::LeaseDefaults;

/// Transport used by document-store clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionMode {
    /// HTTPS through the gateway endpoint.
    Gateway,
    /// TCP straight to the replicas.
    Direct,
}

impl ConnectionMode {
    /// Returns the configuration value for the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gateway => "Gateway",
            Self::Direct => "Direct",
        }
    }
}

impl FromStr for ConnectionMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gateway" => Ok(Self::Gateway),
            "direct" => Ok(Self::Direct),
            _ => Err(AppError::Validation(format!(
                "unknown connection mode '{value}'"
            ))),
        }
    }
}

/// Document-store extension settings derived from host configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStoreExtension {
    /// Client transport, `None` keeping the client default.
    pub connection_mode: Option<ConnectionMode>,
    /// Lease defaults applied to every change-feed trigger.
    pub lease_defaults: LeaseDefaults,
}

/// Extension configuration handed to the job host once per provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionConfiguration {
    /// Document-store bindings and change-feed triggers.
    DocumentStore(DocumentStoreExtension),
}

impl ExtensionConfiguration {
    /// Returns a stable extension name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DocumentStore(_) => "documentDB",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionMode;

    #[test]
    fn connection_mode_parses_any_case() {
        assert_eq!("direct".parse::<ConnectionMode>(), Ok(ConnectionMode::Direct));
        assert_eq!(" Gateway ".parse::<ConnectionMode>(), Ok(ConnectionMode::Gateway));
        assert!("tcp".parse::<ConnectionMode>().is_err());
    }
}
