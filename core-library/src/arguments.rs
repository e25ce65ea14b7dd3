//! # Provider Arguments
//!
//! Each remote provider kind declares the configuration fields it needs as a
//! schema of [`ProviderArgument`]s. The same schema drives host forms (which
//! field is secret, which is a toggle) and validation of stored configs.
//!
//! Values are an explicit tagged variant so the stored JSON blob never needs
//! guessing:
//!
//! ```json
//! {"server": {"type": "text", "value": "https://music.example.com"},
//!  "use_legacy_authentication": {"type": "bool", "value": false}}
//! ```

use crate::error::{LibraryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    Text,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArgumentValue {
    Text(String),
    Bool(bool),
}

impl ArgumentValue {
    pub fn kind(&self) -> ArgumentKind {
        match self {
            ArgumentValue::Text(_) => ArgumentKind::Text,
            ArgumentValue::Bool(_) => ArgumentKind::Bool,
        }
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        ArgumentValue::Text(value.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(value: String) -> Self {
        ArgumentValue::Text(value)
    }
}

impl From<bool> for ArgumentValue {
    fn from(value: bool) -> Self {
        ArgumentValue::Bool(value)
    }
}

/// Extra check run on a value of the right kind. Returns a user-facing
/// message on rejection.
pub type Validator = fn(&ArgumentValue) -> std::result::Result<(), String>;

/// One configuration field of a provider kind.
#[derive(Debug, Clone)]
pub struct ProviderArgument {
    pub key: &'static str,
    pub title: &'static str,
    pub kind: ArgumentKind,
    pub required: bool,
    /// Secret; hosts mask it and logs redact it.
    pub hidden: bool,
    pub default: Option<ArgumentValue>,
    pub validator: Option<Validator>,
}

impl ProviderArgument {
    pub fn text(key: &'static str, title: &'static str) -> Self {
        Self::new(key, title, ArgumentKind::Text)
    }

    pub fn boolean(key: &'static str, title: &'static str) -> Self {
        Self::new(key, title, ArgumentKind::Bool)
    }

    fn new(key: &'static str, title: &'static str, kind: ArgumentKind) -> Self {
        Self {
            key,
            title,
            kind,
            required: false,
            hidden: false,
            default: None,
            validator: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<ArgumentValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    fn check(&self, value: &ArgumentValue) -> Result<()> {
        if value.kind() != self.kind {
            return Err(LibraryError::invalid_input(
                self.key,
                format!("expected {:?}, got {:?}", self.kind, value.kind()),
            ));
        }

        if self.required {
            if let ArgumentValue::Text(text) = value {
                if text.trim().is_empty() {
                    return Err(LibraryError::invalid_input(self.key, "must not be empty"));
                }
            }
        }

        if let Some(validator) = self.validator {
            validator(value).map_err(|message| LibraryError::invalid_input(self.key, message))?;
        }

        Ok(())
    }
}

/// Validated argument values keyed by argument key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderArguments(BTreeMap<String, ArgumentValue>);

impl ProviderArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<ArgumentValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ArgumentValue> {
        self.0.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(ArgumentValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(ArgumentValue::Bool(flag)) => Some(*flag),
            _ => None,
        }
    }

    /// Required text value; missing means the arguments were never validated.
    pub fn require_text(&self, key: &str) -> Result<&str> {
        self.text(key)
            .ok_or_else(|| LibraryError::invalid_input(key, "missing required argument"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgumentValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| LibraryError::invalid_input("arguments", e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LibraryError::invalid_input("arguments", e.to_string()))
    }
}

/// Check `values` against `schema` and fill in defaults.
///
/// Rejects unknown keys, kind mismatches, missing required fields and
/// values refused by a validator.
pub fn validate_arguments(
    schema: &[ProviderArgument],
    values: &ProviderArguments,
) -> Result<ProviderArguments> {
    if let Some((key, _)) = values
        .iter()
        .find(|(key, _)| !schema.iter().any(|argument| argument.key == key.as_str()))
    {
        return Err(LibraryError::invalid_input(key, "unknown argument"));
    }

    let mut validated = ProviderArguments::new();
    for argument in schema {
        let value = match values.get(argument.key).or(argument.default.as_ref()) {
            Some(value) => value,
            None if argument.required => {
                return Err(LibraryError::invalid_input(
                    argument.key,
                    "missing required argument",
                ))
            }
            None => continue,
        };

        argument.check(value)?;
        validated.0.insert(argument.key.to_string(), value.clone());
    }

    Ok(validated)
}
