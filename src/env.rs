use serde_json::Value;

use crate::merge::insert;
use crate::overrides::parse_scalar;
use crate::types::Mapping;

/// Build a mapping from environment variables matching `{PREFIX}__*`.
///
/// Double underscore `__` separates nesting levels.
/// Single `_` within a segment is literal (part of the field name).
/// Segments are lowercased to match Rust field names.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn env_to_mapping(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Mapping {
    let needle = format!("{prefix}__");
    let mut mapping = Mapping::new();

    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(&needle) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }

        let segments: Vec<String> = rest.split("__").map(str::to_lowercase).collect();
        let value: Value = parse_scalar(&value);
        insert(&mut mapping, value, &segments);
    }

    mapping
}
