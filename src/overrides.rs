//! Extra vars: `-e key=value` tokens turned into a nested mapping.
//!
//! Each `("db.host", Value)` pair is expanded into the nested structure needed
//! to merge it over the other configuration layers.

use serde_json::Value;

use crate::error::SpecError;
use crate::merge::insert_dotted;
use crate::types::Mapping;

/// Split an extra-vars token into its dotted key and a typed value.
///
/// Only the exact two-part shape `key=value` with a non-empty key is accepted;
/// `key`, `=value` and `a=b=c` all fail.
pub fn parse_extra_var(raw: &str) -> Result<(String, Value), SpecError> {
    let parts: Vec<&str> = raw.split('=').collect();
    match parts.as_slice() {
        [key, value] if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), parse_scalar(value)))
        }
        _ => Err(SpecError::ExtraVarsFormat(raw.to_string())),
    }
}

/// Parse a raw string into a typed value.
/// Tries: bool → integer → float → string.
pub fn parse_scalar(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::from(i);
    }
    // "NaN" and "inf" stay strings
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
        && let Some(n) = serde_json::Number::from_f64(f)
    {
        return Value::Number(n);
    }
    Value::String(s.to_string())
}

/// Convert dotted-key overrides into a nested mapping.
///
/// `("db.url", "pg://")` becomes `{db = {url = "pg://"}}`. If multiple
/// entries target the same key, the last one wins.
pub fn overrides_to_mapping(entries: &[(String, Value)]) -> Mapping {
    let mut mapping = Mapping::new();
    for (dotted_key, value) in entries {
        insert_dotted(&mut mapping, value.clone(), dotted_key);
    }
    mapping
}
