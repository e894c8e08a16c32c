use scriptbind_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::binding::BindingMetadata;

/// One function definition as declared in its `function.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    name: NonEmptyString,
    disabled: bool,
    bindings: Vec<BindingMetadata>,
}

impl FunctionMetadata {
    /// Creates a validated function definition.
    pub fn new(
        name: impl Into<String>,
        disabled: bool,
        bindings: Vec<BindingMetadata>,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name)
            .map_err(|_| AppError::Validation("function name must not be empty".to_owned()))?;

        let trigger_count = bindings.iter().filter(|binding| binding.is_trigger()).count();
        if trigger_count > 1 {
            return Err(AppError::Validation(format!(
                "function '{name}' declares {trigger_count} triggers, at most one is allowed"
            )));
        }

        Ok(Self {
            name,
            disabled,
            bindings,
        })
    }

    /// Parses a `function.json` document for the named function.
    pub fn from_value(name: impl Into<String>, document: &Value) -> AppResult<Self> {
        let name = name.into();
        let object = document.as_object().ok_or_else(|| {
            AppError::Validation(format!("function '{name}' declaration must be a JSON object"))
        })?;

        let disabled = match object.get("disabled") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
            Some(_) => {
                return Err(AppError::Validation(format!(
                    "function '{name}' has a non-boolean 'disabled' flag"
                )));
            }
        };

        let bindings = match object.get("bindings") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    BindingMetadata::from_value(item).map_err(|error| {
                        AppError::Validation(format!(
                            "function '{name}' binding #{index}: {error}"
                        ))
                    })
                })
                .collect::<AppResult<Vec<_>>>()?,
            Some(_) => {
                return Err(AppError::Validation(format!(
                    "function '{name}' 'bindings' must be an array"
                )));
            }
        };

        Self::new(name, disabled, bindings)
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns whether the function is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns declared bindings in declaration order.
    #[must_use]
    pub fn bindings(&self) -> &[BindingMetadata] {
        self.bindings.as_slice()
    }

    /// Returns the trigger binding when one is declared.
    #[must_use]
    pub fn trigger(&self) -> Option<&BindingMetadata> {
        self.bindings.iter().find(|binding| binding.is_trigger())
    }
}
