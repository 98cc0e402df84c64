// ABOUTME: Storage-facing representation of a setting value
// ABOUTME: Closed set of variants plus classification of native stored values into them

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SettingsError, SettingsResult};

/// The "wire" shape a storage backend holds for one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RawSettingValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    StringList(Vec<String>),
    Null,
}

impl RawSettingValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RawSettingValue::String(_) => "String",
            RawSettingValue::Int(_) => "Int",
            RawSettingValue::Double(_) => "Double",
            RawSettingValue::Bool(_) => "Bool",
            RawSettingValue::StringList(_) => "StringList",
            RawSettingValue::Null => "Null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawSettingValue::Null)
    }
}

/// Native form as a backend stores it
impl From<RawSettingValue> for Value {
    fn from(raw: RawSettingValue) -> Self {
        match raw {
            RawSettingValue::String(v) => Value::String(v),
            RawSettingValue::Int(v) => Value::from(v),
            // Non-finite doubles have no JSON form
            RawSettingValue::Double(v) => serde_json::Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            RawSettingValue::Bool(v) => Value::Bool(v),
            RawSettingValue::StringList(v) => {
                Value::Array(v.into_iter().map(Value::String).collect())
            }
            RawSettingValue::Null => Value::Null,
        }
    }
}

/// Classify a value read from storage.
///
/// Arrays keep only their string elements; anything that is not a string,
/// number, bool, array or null is rejected.
pub fn to_raw_value(value: Option<&Value>) -> SettingsResult<RawSettingValue> {
    let Some(value) = value else {
        return Ok(RawSettingValue::Null);
    };

    match value {
        Value::Null => Ok(RawSettingValue::Null),
        Value::String(s) => Ok(RawSettingValue::String(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(RawSettingValue::Int(i)),
            None if n.is_f64() => n
                .as_f64()
                .map(RawSettingValue::Double)
                .ok_or_else(|| unsupported("f64")),
            // Only unsigned integers above i64::MAX land here
            None => Err(unsupported("u64")),
        },
        Value::Bool(b) => Ok(RawSettingValue::Bool(*b)),
        Value::Array(items) => Ok(RawSettingValue::StringList(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        )),
        Value::Object(_) => Err(unsupported("Object")),
    }
}

fn unsupported(type_name: &str) -> SettingsError {
    SettingsError::UnsupportedType(type_name.to_string())
}
