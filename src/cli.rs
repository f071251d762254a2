//! Token parsing for one spec.
//!
//! A [`clap::Command`] is built at runtime from the interpreted
//! [`ParserSpec`]: one long flag per option (typed by its value parser), the
//! option groups as help headings, and the repeatable `-e/--extra-vars`. clap
//! handles `--flag=value`, `--flag value`, help output and "did you mean"
//! suggestions for typos.
//!
//! With [`UnknownOptions::PassThrough`], flags the spec does not declare are
//! peeled off before clap sees the tokens and carried along as extra vars.

use std::collections::HashSet;

use clap::builder::BoolishValueParser;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use tracing::warn;

use crate::error::SpecError;
use crate::overrides::parse_scalar;
use crate::spec::{OptionSpec, OptionType, ParserSpec, RESERVED_FLAGS};
use crate::types::{Mapping, UnknownOptions};

pub const EXTRA_VARS: &str = "extra-vars";

/// Raw per-option values straight from the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    /// Options given on the command line, typed, in declaration order.
    pub supplied: Mapping,
    /// `-e` tokens as written. Their shape is checked by the validator.
    pub extra_vars: Vec<String>,
    /// Undeclared flags let through under [`UnknownOptions::PassThrough`].
    pub passthrough: Vec<(String, Value)>,
}

/// Build the clap command for a spec.
pub fn build_command(parser: &ParserSpec) -> Command {
    let mut command = Command::new(parser.name.clone())
        .no_binary_name(true)
        .args_override_self(true);
    if let Some(about) = &parser.description {
        command = command.about(about.clone());
    }
    for group in &parser.groups {
        command = command.next_help_heading(group.title.clone());
        for option in &group.options {
            command = command.arg(option_arg(option));
        }
    }
    command.next_help_heading("Extra vars").arg(
        Arg::new(EXTRA_VARS)
            .short('e')
            .long(EXTRA_VARS)
            .value_name("KEY=VALUE")
            .action(ArgAction::Append)
            .help("Set an arbitrary configuration value (repeatable)"),
    )
}

fn option_arg(option: &OptionSpec) -> Arg {
    let mut arg = Arg::new(option.name.clone()).long(option.name.clone());
    if let Some(help) = &option.help {
        arg = arg.help(help.clone());
    }
    match option.kind {
        OptionType::Flag => arg.action(ArgAction::SetTrue),
        OptionType::Int => arg
            .action(ArgAction::Set)
            .value_name("INT")
            .allow_negative_numbers(true)
            .value_parser(clap::value_parser!(i64)),
        OptionType::Bool => arg
            .action(ArgAction::Set)
            .value_name("BOOL")
            .value_parser(BoolishValueParser::new()),
        OptionType::String => arg.action(ArgAction::Set).value_name("VALUE"),
    }
}

/// Parse the tokens that follow the spec name.
pub fn parse_tokens<S: AsRef<str>>(
    parser: &ParserSpec,
    tokens: &[S],
    unknown: UnknownOptions,
) -> Result<ParsedArgs, SpecError> {
    let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
    let (tokens, passthrough) = match unknown {
        UnknownOptions::Reject => (tokens, Vec::new()),
        UnknownOptions::PassThrough => split_unknown(parser, tokens),
    };

    let matches = build_command(parser).try_get_matches_from(tokens)?;

    let mut supplied = Mapping::new();
    for option in parser.options() {
        if matches.value_source(&option.name) != Some(ValueSource::CommandLine) {
            continue;
        }
        if let Some(value) = option_value(&matches, option) {
            supplied.insert(option.name.clone(), value);
        }
    }

    let extra_vars = matches
        .get_many::<String>(EXTRA_VARS)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    Ok(ParsedArgs {
        supplied,
        extra_vars,
        passthrough,
    })
}

fn option_value(matches: &ArgMatches, option: &OptionSpec) -> Option<Value> {
    let id = option.name.as_str();
    match option.kind {
        OptionType::Flag => Some(Value::Bool(matches.get_flag(id))),
        OptionType::Bool => matches.get_one::<bool>(id).map(|b| Value::Bool(*b)),
        OptionType::Int => matches.get_one::<i64>(id).map(|i| Value::from(*i)),
        OptionType::String => matches.get_one::<String>(id).map(|s| Value::String(s.clone())),
    }
}

/// Separate undeclared `--flags` (and their values) from the tokens clap
/// should see.
fn split_unknown(parser: &ParserSpec, tokens: Vec<String>) -> (Vec<String>, Vec<(String, Value)>) {
    let known: HashSet<&str> = parser
        .options()
        .map(|option| option.name.as_str())
        .chain(RESERVED_FLAGS.iter().copied())
        .collect();

    let mut kept = Vec::with_capacity(tokens.len());
    let mut unknown = Vec::new();
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if token == "--" {
            kept.push(token);
            kept.extend(iter);
            break;
        }
        let Some(flag) = token.strip_prefix("--") else {
            kept.push(token);
            continue;
        };
        let (name, inline) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (flag, None),
        };
        if known.contains(name) {
            kept.push(token);
            continue;
        }

        let value = match inline {
            Some(raw) => parse_scalar(raw),
            None => match iter.next_if(|next| takes_as_value(next)) {
                Some(raw) => parse_scalar(&raw),
                None => Value::Bool(true),
            },
        };
        warn!(flag = name, "passing undeclared option through as an extra var");
        unknown.push((name.to_string(), value));
    }

    (kept, unknown)
}

/// A token following an undeclared flag is its value unless it looks like
/// another flag. Negative numbers are values.
fn takes_as_value(token: &str) -> bool {
    !token.starts_with('-') || token.parse::<f64>().is_ok()
}
