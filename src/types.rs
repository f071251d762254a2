use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::merge::{ConflictResolver, Greedy, NoneAware, UniqueAppendList};

/// A nested configuration mapping. Values are mappings, sequences, or scalars
/// (`null` stands for an absent value).
pub type Mapping = serde_json::Map<String, serde_json::Value>;

pub use serde_json::Value;

/// Built-in conflict resolution strategies, selectable by name from settings
/// files and the command line.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// The incoming value always replaces the existing one.
    #[default]
    Greedy,
    /// Sequences accumulate; any other value only fills in a null.
    NoneAware,
    /// Sequences gain the incoming items they do not already contain.
    UniqueAppendList,
}

impl ConflictResolver for Strategy {
    fn resolve(&self, first: &mut Mapping, second: &Mapping, key: &str) {
        match self {
            Strategy::Greedy => Greedy.resolve(first, second, key),
            Strategy::NoneAware => NoneAware.resolve(first, second, key),
            Strategy::UniqueAppendList => UniqueAppendList.resolve(first, second, key),
        }
    }
}

/// What the token parser does with a `--flag` the spec does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownOptions {
    /// Fail the run with the parser's "unexpected argument" error.
    #[default]
    Reject,
    /// Treat the flag as an extra var (`--name=value`, `--name value`, or a
    /// bare `--name` meaning `true`).
    PassThrough,
}

/// Where to search for files.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".deployspec")`.
    Home(String),
    /// Current working directory.
    Cwd,
    /// An explicit path.
    Path(PathBuf),
}

/// Output format of the assembled configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}
