use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Display text of the "field did not exist" sentinel
pub const MISSING_FIELD_TEXT: &str = "Field didn't exist!";

/// Primary key type of a model, used to normalise stored identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PkType {
    #[default]
    Integer,
    Text,
}

/// Value of one field as stored in a snapshot
///
/// Snapshots taken before a field was added to the model simply lack the
/// key; that case is `Missing`, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Missing,
    Value(Value),
}

impl FieldValue {
    /// Look up `key` in a field dict, falling back to `alt` when absent
    pub fn lookup(dict: &BTreeMap<String, Value>, key: &str, alt: &str) -> Self {
        dict.get(key)
            .or_else(|| dict.get(alt))
            .cloned()
            .map_or(FieldValue::Missing, FieldValue::Value)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// The stored JSON value; `None` for `Missing`
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Missing => None,
            FieldValue::Value(v) => Some(v),
        }
    }

    /// True when the field is missing or stored as null
    pub fn is_empty(&self) -> bool {
        self.as_value().map_or(true, Value::is_null)
    }

    /// Human readable rendering of the raw value
    pub fn display(&self) -> String {
        match self {
            FieldValue::Missing => MISSING_FIELD_TEXT.to_string(),
            FieldValue::Value(v) => display_value(v),
        }
    }
}

/// Render a raw stored value the way it is shown in a text diff
///
/// Strings are shown verbatim, `null` as `None`, booleans as `True`/`False`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Coerce a stored identifier into the canonical string form used as map key
///
/// Object ids are strings throughout, but many-to-many values are stored
/// with the related model's native key type. Integer keys stored as strings
/// (`"07"`) are normalised so both spellings match. Returns `None` for values
/// that cannot be an identifier at all.
pub fn coerce_pk(value: &Value, pk_type: PkType) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => match pk_type {
            PkType::Integer => Some(
                s.trim()
                    .parse::<i64>()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|_| s.clone()),
            ),
            PkType::Text => Some(s.clone()),
        },
        _ => None,
    }
}
