//! Assembly: merge all layers into the final configuration mapping.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O. Steps:
//!
//! 1. Merge the prior layers in order, each with its own strategy
//! 2. Insert the validated options at their dotted paths and merge them on
//!    top (greedy)
//! 3. Merge the extra vars on top of everything (greedy)

use serde_json::Value;
use tracing::debug;

use crate::merge::{Greedy, insert_dotted, merge};
use crate::overrides::overrides_to_mapping;
use crate::types::{Mapping, Strategy};

/// One prior configuration layer (plugin defaults, a defaults file, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Where the layer came from, for logging.
    pub name: String,
    pub values: Mapping,
    /// How the layer combines with the layers below it.
    pub strategy: Strategy,
}

impl Layer {
    pub fn new(name: impl Into<String>, values: Mapping, strategy: Strategy) -> Self {
        Self {
            name: name.into(),
            values,
            strategy,
        }
    }
}

/// All data needed to assemble a configuration. No I/O happens here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveInput {
    /// Prior layers in precedence order: first = lowest priority.
    pub layers: Vec<Layer>,
    /// Validated options keyed by (dotted) option name.
    pub options: Mapping,
    /// Extra vars as `(dotted_key, value)` pairs, highest priority.
    pub extra_vars: Vec<(String, Value)>,
}

/// Assemble the final configuration mapping.
pub fn resolve(input: ResolveInput) -> Mapping {
    let mut merged = Mapping::new();
    for layer in &input.layers {
        debug!(layer = %layer.name, strategy = ?layer.strategy, "merging layer");
        merge(&mut merged, &layer.values, &layer.strategy);
    }

    merge(&mut merged, &options_to_mapping(&input.options), &Greedy);

    if !input.extra_vars.is_empty() {
        merge(&mut merged, &overrides_to_mapping(&input.extra_vars), &Greedy);
    }

    merged
}

/// Nest flat option names by their dots: `db.host` → `{db = {host = ...}}`.
pub fn options_to_mapping(options: &Mapping) -> Mapping {
    let mut nested = Mapping::new();
    for (name, value) in options {
        insert_dotted(&mut nested, value.clone(), name);
    }
    nested
}
