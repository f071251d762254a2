use serde_json::Value;
use tracing::info;

use crate::error::SpecError;
use crate::resolve::{self, Layer, ResolveInput};
use crate::spec::Specification;
use crate::types::{Mapping, UnknownOptions};
use crate::validate::SpecValidator;

/// The result of one successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub spec_name: String,
    /// Option name → typed value, defaults included.
    pub options: Mapping,
    /// The assembled configuration handed to execution.
    pub config: Mapping,
}

impl Resolved {
    /// A resolved option value by option name (`db.host`, not the nested path).
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }
}

/// Holds the registered specs and the prior configuration layers, and runs
/// one validation per call.
///
/// Build one with [`SpecManager::builder`] and pass it to whatever dispatches
/// commands. Independent managers share nothing.
#[derive(Debug, Clone, Default)]
pub struct SpecManager {
    specs: Specification,
    layers: Vec<Layer>,
    validator: SpecValidator,
}

/// Builder for a [`SpecManager`].
#[derive(Debug, Clone, Default)]
pub struct SpecManagerBuilder {
    specs: Specification,
    layers: Vec<Layer>,
    unknown: UnknownOptions,
}

impl SpecManagerBuilder {
    /// Register every spec in `spec`. A name registered twice keeps the later
    /// definition.
    pub fn spec(mut self, spec: Specification) -> Self {
        self.specs.extend(spec);
        self
    }

    /// Add a prior layer. Layers are merged in the order added, first = lowest
    /// priority.
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layers(mut self, layers: impl IntoIterator<Item = Layer>) -> Self {
        self.layers.extend(layers);
        self
    }

    /// Let undeclared `--flags` through as extra vars (default: reject them).
    pub fn pass_through_unknown(mut self, enabled: bool) -> Self {
        self.unknown = if enabled {
            UnknownOptions::PassThrough
        } else {
            UnknownOptions::Reject
        };
        self
    }

    pub fn build(self) -> SpecManager {
        SpecManager {
            specs: self.specs,
            layers: self.layers,
            validator: SpecValidator::new(self.unknown),
        }
    }
}

impl SpecManager {
    pub fn builder() -> SpecManagerBuilder {
        SpecManagerBuilder::default()
    }

    pub fn register_spec(&mut self, spec: Specification) {
        self.specs.extend(spec);
    }

    pub fn specification(&self) -> &Specification {
        &self.specs
    }

    /// In-place edits apply to the next run.
    pub fn specification_mut(&mut self) -> &mut Specification {
        &mut self.specs
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Validate `args` (`[spec_name, tokens...]`) and assemble the
    /// configuration.
    pub fn resolve<S: AsRef<str>>(&self, args: &[S]) -> Result<Resolved, SpecError> {
        let (name, tokens) = args.split_first().ok_or(SpecError::NoSpecName)?;
        let name = name.as_ref();

        let parser = self.specs.parser(name)?;
        let validated = self.validator.validate(&parser, tokens)?;

        let config = resolve::resolve(ResolveInput {
            layers: self.layers.clone(),
            options: validated.options.clone(),
            extra_vars: validated.extra_vars,
        });
        info!(spec = name, keys = config.len(), "validation passed");

        Ok(Resolved {
            spec_name: name.to_string(),
            options: validated.options,
            config,
        })
    }

    /// Like [`resolve`](Self::resolve), reduced to a status code: `0` on
    /// success. Failures are returned as errors for the caller to render.
    pub fn run_specs<S: AsRef<str>>(&self, args: &[S]) -> Result<i32, SpecError> {
        self.resolve(args).map(|_| 0)
    }
}
