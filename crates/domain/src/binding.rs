use std::str::FromStr;

use scriptbind_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys consumed by [`BindingMetadata`] itself and never treated as extras.
const RESERVED_KEYS: [&str; 5] = ["type", "direction", "name", "access", "dataType"];

/// Direction of one declared binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingDirection {
    /// Invokes the function when new data arrives.
    Trigger,
    /// Supplies data to the function.
    In,
    /// Receives data produced by the function.
    Out,
}

impl BindingDirection {
    /// Returns the declaration value for the direction.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::In => "in",
            Self::Out => "out",
        }
    }

    /// Returns the access mode implied by the direction.
    #[must_use]
    pub fn default_access(self) -> AccessMode {
        match self {
            Self::Trigger | Self::In => AccessMode::Read,
            Self::Out => AccessMode::Write,
        }
    }
}

impl FromStr for BindingDirection {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trigger" => Ok(Self::Trigger),
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            "inout" => Err(AppError::Validation(
                "binding direction 'inout' is not supported".to_owned(),
            )),
            _ => Err(AppError::Validation(format!(
                "unknown binding direction '{value}'"
            ))),
        }
    }
}

/// Data access mode of a non-trigger binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Binding reads data.
    Read,
    /// Binding writes data.
    Write,
}

impl AccessMode {
    /// Returns the declaration value for the access mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl FromStr for AccessMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            _ => Err(AppError::Validation(format!(
                "unknown binding access mode '{value}'"
            ))),
        }
    }
}

/// Normalized declaration of one function binding.
///
/// Extras are kept verbatim; typed accessors validate them lazily so that
/// providers can report the offending field by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingMetadata {
    name: Option<String>,
    type_name: NonEmptyString,
    direction: BindingDirection,
    access: AccessMode,
    fields: Map<String, Value>,
}

impl BindingMetadata {
    /// Creates metadata with access derived from the direction.
    pub fn new(
        type_name: impl Into<String>,
        direction: BindingDirection,
        fields: Map<String, Value>,
    ) -> AppResult<Self> {
        let fields = fields
            .into_iter()
            .filter(|(key, _)| !is_reserved(key))
            .collect();

        Ok(Self {
            name: None,
            type_name: NonEmptyString::new(type_name)
                .map_err(|_| AppError::Validation("binding 'type' must not be empty".to_owned()))?,
            direction,
            access: direction.default_access(),
            fields,
        })
    }

    /// Parses one binding object from a function declaration.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            AppError::Validation("binding declaration must be a JSON object".to_owned())
        })?;

        let type_name = lookup(object, "type")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("binding 'type' is required".to_owned()))?;
        let direction = lookup(object, "direction")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "binding '{type_name}' requires a string 'direction'"
                ))
            })?
            .parse::<BindingDirection>()?;

        let mut metadata = Self::new(type_name, direction, object.clone())?;

        if let Some(access) = lookup(object, "access").and_then(Value::as_str) {
            metadata.access = access.parse()?;
        }

        metadata.name = lookup(object, "name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned);

        Ok(metadata)
    }

    /// Sets the declared parameter name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the access mode derived from the direction.
    #[must_use]
    pub fn with_access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    /// Returns the declared parameter name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the binding type name as declared.
    #[must_use]
    pub fn type_name(&self) -> &NonEmptyString {
        &self.type_name
    }

    /// Returns the binding direction.
    #[must_use]
    pub fn direction(&self) -> BindingDirection {
        self.direction
    }

    /// Returns the binding access mode.
    #[must_use]
    pub fn access(&self) -> AccessMode {
        self.access
    }

    /// Returns whether this binding is the function trigger.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.direction == BindingDirection::Trigger
    }

    /// Returns all binding-specific extras.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns whether the declared type equals `candidate`, ignoring ASCII case.
    #[must_use]
    pub fn type_matches(&self, candidate: &str) -> bool {
        self.type_name.as_str().eq_ignore_ascii_case(candidate)
    }

    /// Returns one extra by key, ignoring ASCII case. JSON null counts as absent.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        lookup(&self.fields, key).filter(|value| !value.is_null())
    }

    /// Returns whether a non-empty value is declared for `key`.
    #[must_use]
    pub fn has_field(&self, key: &str) -> bool {
        match self.field(key) {
            Some(Value::String(text)) => !text.trim().is_empty(),
            Some(_) => true,
            None => false,
        }
    }

    /// Reads an optional string extra. Empty strings count as absent.
    pub fn string_field(&self, key: &str) -> AppResult<Option<&str>> {
        match self.field(key) {
            None => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.as_str())),
            Some(other) => Err(self.field_error(
                key,
                format!("expected a string, found {}", json_kind(other)),
            )),
        }
    }

    /// Reads an optional boolean extra. Accepts `"true"`/`"false"` strings.
    pub fn bool_field(&self, key: &str) -> AppResult<Option<bool>> {
        match self.field(key) {
            None => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(self.field_error(key, format!("expected a boolean, found '{text}'"))),
            },
            Some(other) => Err(self.field_error(
                key,
                format!("expected a boolean, found {}", json_kind(other)),
            )),
        }
    }

    /// Reads an optional non-negative integer extra. Accepts integer strings.
    pub fn u32_field(&self, key: &str) -> AppResult<Option<u32>> {
        let value = match self.field(key) {
            None => return Ok(None),
            Some(value) => value,
        };

        let parsed = match value {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };

        let Some(parsed) = parsed else {
            return Err(self.field_error(
                key,
                format!("expected an integer, found {}", json_kind(value)),
            ));
        };

        if parsed < 0 {
            return Err(self.field_error(key, format!("must not be negative, found {parsed}")));
        }

        u32::try_from(parsed)
            .map(Some)
            .map_err(|_| self.field_error(key, format!("value {parsed} is out of range")))
    }

    /// Reads a required string extra.
    pub fn required_string_field(&self, key: &str) -> AppResult<&str> {
        self.string_field(key)?
            .ok_or_else(|| self.field_error(key, "is required".to_owned()))
    }

    /// Returns declared extras whose keys are not in `known`, ignoring ASCII case.
    #[must_use]
    pub fn unrecognized_fields(&self, known: &[&str]) -> Vec<&str> {
        self.fields
            .keys()
            .filter(|key| !known.iter().any(|candidate| candidate.eq_ignore_ascii_case(key)))
            .map(String::as_str)
            .collect()
    }

    fn field_error(&self, key: &str, message: String) -> AppError {
        AppError::binding_configuration(self.type_name.as_str(), key, message)
    }
}

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(key))
}

fn lookup<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}


#[cfg(test)]
mod properties {
    use proptest::prelude::*;
    use serde_json::{Map, json};

    use super::{BindingDirection, BindingMetadata};

    proptest! {
        #[test]
        fn type_matching_ignores_case(type_name in "[a-zA-Z]{1,24}", upper in any::<bool>()) {
            let declared = if upper {
                type_name.to_ascii_uppercase()
            } else {
                type_name.to_ascii_lowercase()
            };
            let metadata = BindingMetadata::new(declared, BindingDirection::In, Map::new());
            prop_assert!(metadata.is_ok());
            let metadata = metadata.unwrap_or_else(|_| unreachable!());
            prop_assert!(metadata.type_matches(type_name.as_str()));
        }

        #[test]
        fn integer_fields_round_trip(value in any::<u32>(), as_text in any::<bool>()) {
            let declared = if as_text { json!(value.to_string()) } else { json!(value) };
            let mut fields = Map::new();
            fields.insert("leaseRenewInterval".to_owned(), declared);
            let metadata = BindingMetadata::new("cosmosDBTrigger", BindingDirection::Trigger, fields)
                .unwrap_or_else(|_| unreachable!());
            prop_assert_eq!(metadata.u32_field("leaseRenewInterval"), Ok(Some(value)));
        }
    }
}
