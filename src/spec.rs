//! The declarative option specification.
//!
//! A [`Specification`] holds the raw tree as loaded (spec name → groups →
//! options) and may be mutated in place between runs. Every validation run
//! interprets the named spec afresh into a typed [`ParserSpec`]; any problem
//! with the tree itself (unknown types, non-numeric bounds, broken conditions)
//! surfaces there as a hard error, before a single token is looked at.
//!
//! ```yaml
//! example:
//!   description: Example deployment
//!   groups:
//!     - title: Group A
//!       options:
//!         req-arg-a:
//!           type: str
//!         req-arg-b:
//!           type: str
//!           required_when: "req-arg-a == yes"
//!         value-minmax:
//!           type: int
//!           minimum: 100
//!           maximum: 200
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::SpecError;
use crate::types::Mapping;

/// Flag names the token parser claims for itself.
pub const RESERVED_FLAGS: &[&str] = &["help", "extra-vars"];

/// The raw specification tree, keyed by spec name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Specification {
    parsers: Mapping,
}

impl Specification {
    /// Wrap an in-memory tree. The top level must be a mapping.
    pub fn from_value(value: Value) -> Result<Self, SpecError> {
        match value {
            Value::Object(parsers) => Ok(Self { parsers }),
            other => Err(SpecError::SpecificationMalformed {
                spec: "<root>".into(),
                option: "<root>".into(),
                reason: format!("expected a mapping of spec names, got {}", type_name(&other)),
            }),
        }
    }

    /// Parse a YAML document holding one or more specs.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        let parsers: Mapping = serde_yaml::from_str(content)?;
        Ok(Self { parsers })
    }

    /// Spec names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.parsers.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parsers.contains_key(name)
    }

    /// Add (or replace) every spec of `other`.
    pub fn extend(&mut self, other: Specification) {
        self.parsers.extend(other.parsers);
    }

    pub fn raw(&self) -> &Mapping {
        &self.parsers
    }

    /// Mutable access to the raw tree. Changes apply to the next run.
    pub fn raw_mut(&mut self) -> &mut Mapping {
        &mut self.parsers
    }

    /// The raw declaration of one option, wherever its group sits.
    pub fn option_mut(&mut self, spec: &str, option: &str) -> Option<&mut Mapping> {
        self.parsers
            .get_mut(spec)?
            .get_mut("groups")?
            .as_array_mut()?
            .iter_mut()
            .filter_map(|group| group.get_mut("options")?.as_object_mut())
            .find_map(|options| options.get_mut(option)?.as_object_mut())
    }

    /// Interpret the named spec into its typed form.
    pub fn parser(&self, name: &str) -> Result<ParserSpec, SpecError> {
        let raw = self
            .parsers
            .get(name)
            .ok_or_else(|| SpecError::SpecNotFound {
                name: name.to_string(),
                available: self.names(),
            })?;
        ParserSpec::from_value(name, raw)
    }
}

/// A spec with its groups and options interpreted and checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserSpec {
    pub name: String,
    pub description: Option<String>,
    pub groups: Vec<GroupSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub title: String,
    pub options: Vec<OptionSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    /// Flag name, also the dotted key the value is stored under.
    pub name: String,
    pub kind: OptionType,
    pub help: Option<String>,
    /// Declared default, already coerced to `kind`.
    pub default: Option<Value>,
    /// Unconditionally required.
    pub required: bool,
    /// Required when any of these match.
    pub required_when: Vec<Condition>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    String,
    Int,
    Bool,
    /// A switch without a value; `false` unless given.
    Flag,
}

impl OptionType {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "str" | "string" | "value" => Some(Self::String),
            "int" | "integer" => Some(Self::Int),
            "bool" | "boolean" => Some(Self::Bool),
            "flag" => Some(Self::Flag),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int)
    }

    /// Coerce a declared value (a default) to this type.
    fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => None,
            (Self::String, Value::String(_)) => Some(value.clone()),
            (Self::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (Self::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (Self::Int, Value::Number(n)) => n.as_i64().map(Value::from),
            (Self::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Self::Bool | Self::Flag, Value::Bool(_)) => Some(value.clone()),
            (Self::Bool | Self::Flag, Value::String(s)) => parse_bool(s).map(Value::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "str",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Flag => "flag",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
}

/// `option == expected` or `option != expected`, over resolved values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub option: String,
    pub comparator: Comparator,
    pub expected: String,
}

impl Condition {
    /// Parse `"other-option == value"` / `"other-option != value"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (option, comparator, expected) = if let Some((lhs, rhs)) = raw.split_once("==") {
            (lhs, Comparator::Eq, rhs)
        } else if let Some((lhs, rhs)) = raw.split_once("!=") {
            (lhs, Comparator::Ne, rhs)
        } else {
            return None;
        };
        let option = option.trim();
        let expected = unquote(expected.trim());
        if option.is_empty() || option.contains(char::is_whitespace) {
            return None;
        }
        Some(Self {
            option: option.to_string(),
            comparator,
            expected: expected.to_string(),
        })
    }

    /// Whether the condition holds against the resolved option values.
    /// An option without a resolved value never matches.
    pub fn matches(&self, resolved: &Mapping) -> bool {
        let actual = match resolved.get(&self.option) {
            None | Some(Value::Null) => return false,
            Some(value) => value,
        };
        let equal = match actual {
            Value::Bool(b) => parse_bool(&self.expected) == Some(*b),
            Value::String(s) => *s == self.expected,
            other => other.to_string() == self.expected,
        };
        match self.comparator {
            Comparator::Eq => equal,
            Comparator::Ne => !equal,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.comparator {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        };
        write!(f, "{} {op} {}", self.option, self.expected)
    }
}

/// The serde view of one option declaration before interpretation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOption {
    #[serde(rename = "type")]
    kind: Option<String>,
    help: Option<String>,
    #[serde(default)]
    default: Value,
    #[serde(default)]
    required: Value,
    #[serde(default)]
    required_when: Value,
    #[serde(default)]
    minimum: Value,
    #[serde(default)]
    maximum: Value,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    title: String,
    #[serde(default)]
    options: Mapping,
}

#[derive(Debug, Deserialize)]
struct RawParser {
    description: Option<String>,
    #[serde(default)]
    groups: Vec<RawGroup>,
}

impl ParserSpec {
    fn from_value(name: &str, raw: &Value) -> Result<Self, SpecError> {
        let malformed = |option: &str, reason: String| SpecError::SpecificationMalformed {
            spec: name.to_string(),
            option: option.to_string(),
            reason,
        };

        let parser = RawParser::deserialize(raw).map_err(|e| malformed("<groups>", e.to_string()))?;

        let mut seen = HashSet::new();
        let mut groups = Vec::with_capacity(parser.groups.len());
        for group in parser.groups {
            let mut options = Vec::with_capacity(group.options.len());
            for (option_name, option_raw) in &group.options {
                if let Some(reason) = invalid_flag_name(option_name) {
                    return Err(malformed(option_name, reason.into()));
                }
                if RESERVED_FLAGS.contains(&option_name.as_str()) {
                    return Err(malformed(option_name, "flag name is reserved".into()));
                }
                if !seen.insert(option_name.clone()) {
                    return Err(malformed(option_name, "declared more than once".into()));
                }
                options.push(OptionSpec::from_value(name, option_name, option_raw)?);
            }
            groups.push(GroupSpec {
                title: group.title,
                options,
            });
        }

        let spec = Self {
            name: name.to_string(),
            description: parser.description,
            groups,
        };

        for option in spec.options() {
            for condition in &option.required_when {
                if condition.option == option.name {
                    return Err(malformed(&option.name, format!("condition '{condition}' refers to itself")));
                }
                if !seen.contains(&condition.option) {
                    return Err(malformed(
                        &option.name,
                        format!("condition '{condition}' refers to an undeclared option"),
                    ));
                }
            }
        }

        Ok(spec)
    }

    /// All options across groups, in declaration order.
    pub fn options(&self) -> impl Iterator<Item = &OptionSpec> {
        self.groups.iter().flat_map(|group| group.options.iter())
    }

    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options().find(|option| option.name == name)
    }
}

impl OptionSpec {
    fn from_value(spec: &str, name: &str, raw: &Value) -> Result<Self, SpecError> {
        let malformed = |reason: String| SpecError::SpecificationMalformed {
            spec: spec.to_string(),
            option: name.to_string(),
            reason,
        };

        let raw = RawOption::deserialize(raw).map_err(|e| malformed(e.to_string()))?;

        let kind_name = raw.kind.unwrap_or_else(|| "str".to_string());
        let kind = OptionType::parse(&kind_name).ok_or_else(|| SpecError::UnsupportedOptionType {
            option: name.to_string(),
            kind: kind_name.clone(),
        })?;

        let default = match &raw.default {
            Value::Null => None,
            declared => Some(kind.coerce(declared).ok_or_else(|| {
                malformed(format!("default {declared} is not a valid {kind}"))
            })?),
        };

        let required = match &raw.required {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::String(s) => parse_bool(s).ok_or_else(|| malformed(format!("required: '{s}' is not a boolean")))?,
            other => return Err(malformed(format!("required: {other} is not a boolean"))),
        };

        let required_when = parse_conditions(&raw.required_when).map_err(malformed)?;

        let minimum = parse_bound(&raw.minimum).map_err(|e| malformed(format!("minimum {e}")))?;
        let maximum = parse_bound(&raw.maximum).map_err(|e| malformed(format!("maximum {e}")))?;
        if (minimum.is_some() || maximum.is_some()) && !kind.is_numeric() {
            return Err(malformed(format!("bounds declared on non-numeric type {kind}")));
        }
        if let (Some(min), Some(max)) = (minimum, maximum)
            && min > max
        {
            return Err(malformed(format!("minimum {min} exceeds maximum {max}")));
        }

        Ok(Self {
            name: name.to_string(),
            kind,
            help: raw.help,
            default,
            required,
            required_when,
            minimum,
            maximum,
        })
    }

    /// Resolved value used when the option is not given on the command line.
    pub fn implicit_default(&self) -> Option<Value> {
        match (&self.default, self.kind) {
            (Some(value), _) => Some(value.clone()),
            (None, OptionType::Flag) => Some(Value::Bool(false)),
            (None, _) => None,
        }
    }
}

/// Why `name` cannot be used as a long flag, if it cannot.
fn invalid_flag_name(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("flag name is empty")
    } else if name.starts_with('-') {
        Some("flag name must not start with '-'")
    } else if name.contains('=') {
        Some("flag name must not contain '='")
    } else if name.contains(char::is_whitespace) {
        Some("flag name must not contain whitespace")
    } else {
        None
    }
}

fn parse_conditions(raw: &Value) -> Result<Vec<Condition>, String> {
    let entries: Vec<&Value> = match raw {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };
    entries
        .into_iter()
        .map(|entry| {
            entry
                .as_str()
                .and_then(Condition::parse)
                .ok_or_else(|| format!("required_when entry {entry} is not 'option == value' or 'option != value'"))
        })
        .collect()
}

fn parse_bound(raw: &Value) -> Result<Option<f64>, String> {
    match raw {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("{n} is not a finite number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Some)
            .ok_or_else(|| format!("'{s}' is not a number")),
        other => Err(format!("{other} is not a number")),
    }
}

/// YAML-style booleans.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn unquote(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = raw.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    raw
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
