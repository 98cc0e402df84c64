// ABOUTME: Decode and encode functions for the built-in setting types
// ABOUTME: Mismatched or missing raw values decode to the caller's default

use crate::raw::RawSettingValue;

pub fn decode_int(raw: &RawSettingValue, default: i64) -> i64 {
    match raw {
        RawSettingValue::Int(v) => *v,
        _ => default,
    }
}

pub fn encode_int(value: &i64) -> RawSettingValue {
    RawSettingValue::Int(*value)
}

pub fn decode_double(raw: &RawSettingValue, default: f64) -> f64 {
    match raw {
        RawSettingValue::Double(v) => *v,
        _ => default,
    }
}

pub fn encode_double(value: &f64) -> RawSettingValue {
    RawSettingValue::Double(*value)
}

/// A stored `true` or a `true` default yields `true`: a stored `false` cannot
/// override a `true` default.
pub fn decode_bool(raw: &RawSettingValue, default: bool) -> bool {
    matches!(raw, RawSettingValue::Bool(true)) || default
}

pub fn encode_bool(value: &bool) -> RawSettingValue {
    RawSettingValue::Bool(*value)
}

/// Strings have no default: anything but a stored string is `None`
pub fn decode_string(raw: &RawSettingValue) -> Option<String> {
    match raw {
        RawSettingValue::String(v) => Some(v.clone()),
        _ => None,
    }
}

pub fn encode_string(value: &Option<String>) -> RawSettingValue {
    match value {
        Some(v) => RawSettingValue::String(v.clone()),
        None => RawSettingValue::Null,
    }
}

pub fn decode_string_list(raw: &RawSettingValue) -> Vec<String> {
    match raw {
        RawSettingValue::StringList(v) => v.clone(),
        _ => Vec::new(),
    }
}

// Takes &Vec so it fits `Fn(&T) -> RawSettingValue` with T = Vec<String>
#[allow(clippy::ptr_arg)]
pub fn encode_string_list(value: &Vec<String>) -> RawSettingValue {
    RawSettingValue::StringList(value.clone())
}
