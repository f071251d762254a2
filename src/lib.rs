//! Layered configuration merging and declarative CLI option validation for
//! deployment tooling.
//!
//! A deployment run starts from a handful of configuration layers (plugin
//! defaults, site defaults files, ...) and a command line such as
//! `example --req-arg-a=yes -e key=value`. This crate validates that command
//! line against a declarative option specification and, on success, folds the
//! validated options into the layers to produce one configuration mapping.
//!
//! ```ignore
//! let manager = SpecManager::builder()
//!     .spec(Specification::from_yaml_str(SPEC)?)
//!     .layer(Layer::new("plugin defaults", defaults, Strategy::NoneAware))
//!     .build();
//! let resolved = manager.resolve(&["example", "--req-arg-a=yes", "--req-arg-b=yes"])?;
//! ```
//!
//! The crate never executes anything. It hands back a validated mapping or a
//! typed [`SpecError`].
//!
//! # Merging
//!
//! [`merge`](merge::merge) combines two nested mappings in place. Keys that
//! hold mappings on both sides are merged recursively; every other collision
//! goes to a [`ConflictResolver`]. Three come built in, also selectable by
//! name through [`Strategy`]:
//!
//! - **greedy**: the incoming value wins.
//! - **none-aware**: sequences accumulate, and any other value only fills in
//!   a `null`.
//! - **unique-append-list**: sequences gain the items they lack; anything
//!   else is greedy.
//!
//! Any `Fn(&mut Mapping, &Mapping, &str)` closure is a resolver too.
//!
//! # Specifications
//!
//! A spec names its options in titled groups. Each option has a type (`str`,
//! `int`, `bool` or `flag`) and optionally a help text, a default, inclusive
//! `minimum`/`maximum` bounds, `required: true`, and `required_when`
//! conditions:
//!
//! ```yaml
//! example:
//!   groups:
//!     - title: Access
//!       options:
//!         req-arg-a:
//!           type: str
//!         req-arg-b:
//!           type: str
//!           required_when: "req-arg-a == yes"
//!         db.host:
//!           type: str
//!           default: localhost
//! ```
//!
//! The raw tree can be edited in place between runs
//! ([`SpecManager::specification_mut`]); every run interprets it afresh, so a
//! broken edit fails the next run with [`SpecError::SpecificationMalformed`].
//!
//! # Validation phases
//!
//! ```text
//! tokens ── parse ── defaults ── ranges ── required_when ── assembly
//! ```
//!
//! The first failing phase ends the run. Missing options are reported all at
//! once, in declaration order. Conditions look at the values after
//! defaulting, so a default can make another option required.
//!
//! # Assembly
//!
//! Layers are merged in order, each with its own strategy. The validated
//! options go on top, nested by their dots (`--db.host=x` becomes
//! `{db: {host: x}}`), and the `-e key=value` extra vars go on top of that.
//!
//! # Settings
//!
//! The `deployspec` binary reads its own settings ([`settings::CoreSettings`])
//! from `deployspec.toml` files and `DEPLOYSPEC__*` environment variables.
//! Library users construct a [`SpecManager`] directly and need none of it.

pub mod error;
pub mod types;

mod builder;
pub mod cli;
mod env;
pub mod loader;
pub mod merge;
pub mod ops;
mod overrides;
mod resolve;
pub mod settings;
pub mod spec;
mod validate;

#[cfg(test)]
mod fixtures;

pub use builder::{Resolved, SpecManager, SpecManagerBuilder};
pub use error::SpecError;
pub use merge::{ConflictResolver, Greedy, NoneAware, UniqueAppendList, insert, insert_dotted, merge};
pub use ops::Report;
pub use resolve::{Layer, ResolveInput, resolve};
pub use spec::{Comparator, Condition, GroupSpec, OptionSpec, OptionType, ParserSpec, Specification};
pub use types::{Mapping, OutputFormat, SearchPath, Strategy, UnknownOptions, Value};
pub use validate::{SpecValidator, Validated};
