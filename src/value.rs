use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as OpaqueValue;

pub type Values = BTreeMap<String, FieldValue>;
pub type Errors = BTreeMap<String, String>;
pub type Valids = BTreeMap<String, Validity>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Toggle(bool),
    Files(Vec<String>),
    Other(OpaqueValue),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Emptiness for the required-field check. An unchecked toggle counts as
    /// empty, matching HTML-form truthiness for unticked checkboxes.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::Toggle(checked) => !checked,
            FieldValue::Files(urls) => urls.is_empty(),
            FieldValue::Other(value) => opaque_is_empty(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Toggle(value)
    }
}

fn opaque_is_empty(value: &OpaqueValue) -> bool {
    match value {
        OpaqueValue::Null => true,
        OpaqueValue::Bool(flag) => !flag,
        OpaqueValue::Number(number) => number.as_f64() == Some(0.0),
        OpaqueValue::String(text) => text.is_empty(),
        OpaqueValue::Array(items) => items.is_empty(),
        OpaqueValue::Object(entries) => entries.is_empty(),
    }
}

/// Per-field validity driving UI affordances independently of the error map.
/// `Unknown` means the field has not been evaluated since it last changed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Validity {
    Valid,
    Invalid,
    Unknown,
}

impl From<bool> for Validity {
    fn from(outcome: bool) -> Self {
        if outcome {
            Validity::Valid
        } else {
            Validity::Invalid
        }
    }
}
