//! Option validation: defaulting, range checks and `required_when` dependencies.
//!
//! A run goes through its phases in a fixed order and stops at the first
//! failing one:
//!
//! 1. Parse the tokens ([`crate::cli`]) and check the `-e key=value` shape
//! 2. Fill in declared defaults for everything not given
//! 3. Check supplied numeric values against their inclusive bounds
//! 4. Evaluate `required_when` conditions in declaration order and report
//!    every missing option at once
//!
//! Interpreting the spec itself happens before any of this, in
//! [`Specification::parser`](crate::spec::Specification::parser).

use serde_json::Value;
use tracing::debug;

use crate::cli::{self, ParsedArgs};
use crate::error::SpecError;
use crate::overrides::parse_extra_var;
use crate::spec::ParserSpec;
use crate::types::{Mapping, UnknownOptions};

/// The outcome of a successful validation, before assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
    /// Option name → typed value, defaults included, in declaration order.
    /// Options with neither a value nor a default are left out.
    pub options: Mapping,
    /// Dotted extra vars in the order given; later entries win.
    pub extra_vars: Vec<(String, Value)>,
}

/// Validates raw tokens against one interpreted spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecValidator {
    unknown: UnknownOptions,
}

impl SpecValidator {
    pub fn new(unknown: UnknownOptions) -> Self {
        Self { unknown }
    }

    pub fn unknown_options(&self) -> UnknownOptions {
        self.unknown
    }

    /// Parse `tokens` and run every validation phase.
    pub fn validate<S: AsRef<str>>(
        &self,
        parser: &ParserSpec,
        tokens: &[S],
    ) -> Result<Validated, SpecError> {
        let parsed = cli::parse_tokens(parser, tokens, self.unknown)?;
        validate_parsed(parser, parsed)
    }
}

/// Run the validation phases over already-parsed arguments.
pub fn validate_parsed(parser: &ParserSpec, parsed: ParsedArgs) -> Result<Validated, SpecError> {
    let mut extra_vars = parsed.passthrough;
    for raw in &parsed.extra_vars {
        extra_vars.push(parse_extra_var(raw)?);
    }

    let options = apply_defaults(parser, &parsed.supplied);
    check_ranges(parser, &parsed.supplied)?;
    check_required(parser, &options)?;

    Ok(Validated {
        options,
        extra_vars,
    })
}

/// Supplied values, falling back to each option's declared default.
pub fn apply_defaults(parser: &ParserSpec, supplied: &Mapping) -> Mapping {
    let mut resolved = Mapping::new();
    for option in parser.options() {
        let value = match supplied.get(&option.name) {
            Some(value) => Some(value.clone()),
            None => option.implicit_default(),
        };
        if let Some(value) = value {
            resolved.insert(option.name.clone(), value);
        }
    }
    resolved
}

/// Every supplied value of a bounded option must lie in `[minimum, maximum]`.
pub fn check_ranges(parser: &ParserSpec, supplied: &Mapping) -> Result<(), SpecError> {
    for option in parser.options() {
        if option.minimum.is_none() && option.maximum.is_none() {
            continue;
        }
        let Some(value) = supplied.get(&option.name) else {
            continue;
        };
        let number = value
            .as_f64()
            .ok_or_else(|| SpecError::SpecificationMalformed {
                spec: parser.name.clone(),
                option: option.name.clone(),
                reason: format!("bounds declared but value {value} is not numeric"),
            })?;

        let below = option.minimum.is_some_and(|min| number < min);
        let above = option.maximum.is_some_and(|max| number > max);
        if below || above {
            return Err(SpecError::RangeViolation {
                option: option.name.clone(),
                value: number,
                minimum: option.minimum,
                maximum: option.maximum,
            });
        }
    }
    Ok(())
}

/// Collect every option that is required but has no resolved value.
pub fn check_required(parser: &ParserSpec, resolved: &Mapping) -> Result<(), SpecError> {
    let mut missing = Vec::new();
    for option in parser.options() {
        if resolved.get(&option.name).is_some_and(|v| !v.is_null()) {
            continue;
        }
        if option.required {
            missing.push(option.name.clone());
            continue;
        }
        if let Some(condition) = option.required_when.iter().find(|c| c.matches(resolved)) {
            debug!(option = %option.name, %condition, "requirement triggered");
            missing.push(option.name.clone());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SpecError::RequiredArgumentsMissing(missing))
    }
}
