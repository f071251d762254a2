use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("Extra vars must be given as 'key=value', got '{0}'")]
    ExtraVarsFormat(String),

    #[error("Missing required arguments: {}", .0.join(", "))]
    RequiredArgumentsMissing(Vec<String>),

    #[error("Value {value} of '{option}' is outside the allowed range [{min}, {max}]", min = fmt_bound(.minimum), max = fmt_bound(.maximum))]
    RangeViolation {
        option: String,
        value: f64,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },

    #[error("Malformed specification '{spec}', option '{option}': {reason}")]
    SpecificationMalformed {
        spec: String,
        option: String,
        reason: String,
    },

    #[error("Option '{option}' declares unsupported type '{kind}'")]
    UnsupportedOptionType { option: String, kind: String },

    #[error("Unknown spec '{name}' (available: {})", .available.join(", "))]
    SpecNotFound { name: String, available: Vec<String> },

    #[error("No spec name given; the first argument must name a spec")]
    NoSpecName,

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("File '{file}' not found, searched: {}", display_paths(.searched))]
    FileNotFound { file: String, searched: Vec<PathBuf> },

    #[error("File {path} is empty")]
    EmptySettings { path: PathBuf },

    #[error("Failed to parse {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unknown settings keys in {path}: {}", .keys.join(", "))]
    UnknownSettingsKeys { path: PathBuf, keys: Vec<String> },

    #[error("Settings error: {0}")]
    Settings(#[from] confique::Error),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("{path} must contain a mapping at the top level")]
    NotAMapping { path: PathBuf },

    #[error("Key '{0}' not found in the assembled configuration")]
    KeyNotFound(String),

    #[error("Failed to render configuration: {0}")]
    Render(String),
}

impl SpecError {
    /// Process exit code a dispatcher should report for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SpecError::Cli(e) => e.exit_code(),
            SpecError::ExtraVarsFormat(_)
            | SpecError::RequiredArgumentsMissing(_)
            | SpecError::RangeViolation { .. }
            | SpecError::NoSpecName
            | SpecError::SpecNotFound { .. } => 2,
            SpecError::SpecificationMalformed { .. } | SpecError::UnsupportedOptionType { .. } => 3,
            _ => 1,
        }
    }
}

fn fmt_bound(bound: &Option<f64>) -> String {
    bound.map_or_else(|| "-".to_string(), |b| b.to_string())
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
