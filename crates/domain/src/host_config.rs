use scriptbind_core::{AppError, AppResult};
use serde_json::{Map, Value};

/// Immutable global host configuration, parsed once from `host.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostConfiguration {
    root: Map<String, Value>,
}

impl HostConfiguration {
    /// Creates an empty configuration.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a `host.json` document.
    pub fn from_value(document: Value) -> AppResult<Self> {
        match document {
            Value::Object(root) => Ok(Self { root }),
            Value::Null => Ok(Self::empty()),
            _ => Err(AppError::Validation(
                "host configuration must be a JSON object".to_owned(),
            )),
        }
    }

    /// Returns one provider-scoped section, ignoring ASCII case in its name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.entry(name).and_then(Value::as_object)
    }

    /// Returns the ordered extension allow-list when one is configured.
    pub fn extensions(&self) -> AppResult<Option<Vec<String>>> {
        let Some(value) = self.entry("extensions").filter(|value| !value.is_null()) else {
            return Ok(None);
        };

        let items = value.as_array().ok_or_else(|| {
            AppError::Validation("host 'extensions' must be an array of names".to_owned())
        })?;

        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|name| name.trim().to_owned())
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        AppError::Validation(
                            "host 'extensions' entries must be non-empty strings".to_owned(),
                        )
                    })
            })
            .collect::<AppResult<Vec<_>>>()
            .map(Some)
    }

    fn entry(&self, name: &str) -> Option<&Value> {
        self.root.get(name).or_else(|| {
            self.root
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }
}
