//! Reporting operations: rendering, key lookup, listing and the settings
//! template.
//!
//! Every operation returns a [`Report`] that callers display with `{}`.

use std::fmt;

use confique::Config;
use serde_json::Value;

use crate::error::SpecError;
use crate::settings::CoreSettings;
use crate::types::{Mapping, OutputFormat};

/// Result of a reporting operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// A rendered document (YAML, JSON or a TOML template).
    Document(String),
    /// A single value, with the doc comment of the setting if there is one.
    KeyValue {
        key: String,
        value: String,
        doc: Vec<String>,
    },
    /// Flattened dotted key-value pairs.
    Listing { entries: Vec<(String, String)> },
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Document(text) => write!(f, "{}", text.trim_end()),
            Report::KeyValue { key, value, doc } => {
                for line in doc {
                    writeln!(f, "# {line}")?;
                }
                write!(f, "{key} = {value}")
            }
            Report::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
        }
    }
}

/// Render the assembled configuration as a whole document.
pub fn render(config: &Mapping, format: OutputFormat) -> Result<Report, SpecError> {
    let text = match format {
        OutputFormat::Yaml => {
            serde_yaml::to_string(config).map_err(|e| SpecError::Render(e.to_string()))?
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| SpecError::Render(e.to_string()))?
        }
    };
    Ok(Report::Document(text))
}

/// Get a value of the assembled configuration by dotted key.
pub fn get_value(config: &Mapping, key: &str) -> Result<Report, SpecError> {
    let value = mapping_get(config, key).ok_or_else(|| SpecError::KeyNotFound(key.into()))?;
    Ok(Report::KeyValue {
        key: key.into(),
        value: format_value(value),
        doc: vec![],
    })
}

/// List every leaf of the assembled configuration as dotted key-value pairs.
pub fn list_values(config: &Mapping) -> Report {
    let mut entries = Vec::new();
    flatten_into(config, "", &mut entries);
    Report::Listing { entries }
}

/// Commented TOML template of the settings file.
pub fn settings_template() -> Report {
    Report::Document(confique::toml::template::<CoreSettings>(
        confique::toml::FormatOptions::default(),
    ))
}

/// Get a resolved setting by dotted key, including its doc comment.
pub fn get_setting(settings: &CoreSettings, key: &str) -> Result<Report, SpecError> {
    let value = serde_json::to_value(settings).map_err(|e| SpecError::Render(e.to_string()))?;
    let Value::Object(mapping) = value else {
        return Err(SpecError::Render("settings did not serialize to a mapping".into()));
    };
    let found = mapping_get(&mapping, key).ok_or_else(|| SpecError::KeyNotFound(key.into()))?;
    Ok(Report::KeyValue {
        key: key.into(),
        value: format_value(found),
        doc: lookup_doc(&CoreSettings::META, key),
    })
}

/// Navigate a mapping by dotted key path (e.g. `"db.host"`).
pub fn mapping_get<'a>(mapping: &'a Mapping, dotted_key: &str) -> Option<&'a Value> {
    let (path, leaf) = match dotted_key.rsplit_once('.') {
        Some((p, l)) => (Some(p), l),
        None => (None, dotted_key),
    };

    let map = match path {
        Some(path) => {
            let mut current = mapping;
            for segment in path.split('.') {
                current = current.get(segment)?.as_object()?;
            }
            current
        }
        None => mapping,
    };

    map.get(leaf)
}

fn flatten_into(mapping: &Mapping, prefix: &str, entries: &mut Vec<(String, String)>) {
    for (key, value) in mapping {
        let dotted = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(nested, &dotted, entries),
            other => entries.push((dotted, format_value(other))),
        }
    }
}

/// Strings print bare; everything else prints as inline JSON.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Walk confique's `Meta` tree to find the doc comment for a dotted key path.
fn lookup_doc(meta: &confique::meta::Meta, dotted_key: &str) -> Vec<String> {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    lookup_doc_recursive(meta, &segments)
}

fn lookup_doc_recursive(meta: &confique::meta::Meta, segments: &[&str]) -> Vec<String> {
    let Some((first, rest)) = segments.split_first() else {
        return vec![];
    };

    for field in meta.fields {
        if field.name == *first {
            if rest.is_empty() {
                return field.doc.iter().map(|s| s.to_string()).collect();
            }
            if let confique::meta::FieldKind::Nested { meta: nested, .. } = &field.kind {
                return lookup_doc_recursive(nested, rest);
            }
        }
    }
    vec![]
}
