//! The tool's own settings.
//!
//! [`CoreSettings`] is resolved the same way for every run:
//!
//! 1. Validate each settings file for unknown keys (if strict)
//! 2. Parse and deep-merge the TOML files (later overrides earlier)
//! 3. Deep-merge `DEPLOYSPEC__*` environment variables on top
//! 4. Deserialize the merged mapping into the confique layer
//! 5. Let confique fill defaults
//!
//! [`resolve_settings`] does no I/O. [`load_settings`] discovers the files and
//! reads the process environment, then hands over to it.

use std::path::{Path, PathBuf};

use confique::Config;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::env::env_to_mapping;
use crate::error::SpecError;
use crate::loader;
use crate::merge::{Greedy, merge};
use crate::types::{Mapping, SearchPath, Strategy};

pub const APP_NAME: &str = "deployspec";
pub const SETTINGS_FILE: &str = "deployspec.toml";
pub const ENV_PREFIX: &str = "DEPLOYSPEC";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CoreSettings {
    /// File holding the option specifications.
    #[config(default = "spec.yml")]
    pub spec_file: String,

    /// Directories searched, in order, for the spec file and defaults files.
    #[config(default = [".", "specs"])]
    pub search_paths: Vec<String>,

    /// Log filter used when neither `--verbose` nor `RUST_LOG` is set.
    #[config(default = "warn")]
    pub log_level: String,

    /// Turn undeclared `--flags` into extra vars instead of rejecting them.
    #[config(default = false)]
    pub pass_through_unknown: bool,

    /// How configuration layers are combined.
    #[config(nested)]
    pub merge: MergeSettings,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MergeSettings {
    /// Strategy for defaults files given with `--defaults`.
    #[config(default = "none-aware")]
    pub defaults_strategy: Strategy,
}

impl CoreSettings {
    /// The configured search paths as directories.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let paths: Vec<SearchPath> = self
            .search_paths
            .iter()
            .map(|p| SearchPath::Path(PathBuf::from(p)))
            .collect();
        loader::expand_search_paths(&paths, APP_NAME)
    }
}

/// All pre-loaded data needed to resolve the settings. No I/O happens here.
#[derive(Debug, Clone, Default)]
pub struct SettingsInput {
    /// File contents in precedence order: first = lowest priority, last = highest.
    pub files: Vec<(PathBuf, String)>,
    /// Raw environment variable pairs (pass `std::env::vars().collect()` or synthetic data).
    pub env_vars: Vec<(String, String)>,
    /// Env var prefix (e.g. `"DEPLOYSPEC"`). `None` means env disabled.
    pub env_prefix: Option<String>,
    /// Whether to reject unknown keys in settings files.
    pub strict: bool,
}

pub fn resolve_settings(input: SettingsInput) -> Result<CoreSettings, SpecError> {
    let mut merged = Mapping::new();
    for (path, content) in &input.files {
        if input.strict {
            check_unknown_keys(content, path)?;
        }
        let mapping: Mapping = toml::from_str(content).map_err(|e| SpecError::TomlParse {
            path: path.clone(),
            source: e,
        })?;
        merge(&mut merged, &mapping, &Greedy);
    }

    if let Some(prefix) = &input.env_prefix {
        let env = env_to_mapping(prefix, input.env_vars);
        merge(&mut merged, &env, &Greedy);
    }

    let layer: <CoreSettings as Config>::Layer = serde_json::from_value(Value::Object(merged))
        .map_err(|e| SpecError::InvalidSettings(e.to_string()))?;

    CoreSettings::builder()
        .preloaded(layer)
        .load()
        .map_err(SpecError::from)
}

/// Reject keys the settings struct does not know.
fn check_unknown_keys(content: &str, path: &Path) -> Result<(), SpecError> {
    let mut unknown = Vec::new();
    let deserializer = toml::Deserializer::new(content);
    let _layer: <CoreSettings as Config>::Layer =
        serde_ignored::deserialize(deserializer, |ignored| unknown.push(ignored.to_string()))
            .map_err(|e| SpecError::TomlParse {
                path: path.to_path_buf(),
                source: e,
            })?;

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(SpecError::UnknownSettingsKeys {
            path: path.to_path_buf(),
            keys: unknown,
        })
    }
}

/// Discover settings files (platform config dir, then the working directory),
/// add `explicit` on top, and resolve them with the process environment.
pub fn load_settings(explicit: Option<&Path>) -> Result<CoreSettings, SpecError> {
    let dirs = loader::expand_search_paths(&[SearchPath::Platform, SearchPath::Cwd], APP_NAME);
    let mut files = loader::read_all(&dirs, SETTINGS_FILE)?;

    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path).map_err(|e| SpecError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        files.push((path.to_path_buf(), content));
    }

    resolve_settings(SettingsInput {
        files,
        env_vars: std::env::vars().collect(),
        env_prefix: Some(ENV_PREFIX.to_string()),
        strict: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_input() -> SettingsInput {
        SettingsInput {
            strict: true,
            ..Default::default()
        }
    }

    #[test]
    fn defaults_only() {
        let settings = resolve_settings(empty_input()).unwrap();
        assert_eq!(settings.spec_file, "spec.yml");
        assert_eq!(settings.search_paths, vec![".", "specs"]);
        assert_eq!(settings.log_level, "warn");
        assert!(!settings.pass_through_unknown);
        assert_eq!(settings.merge.defaults_strategy, Strategy::NoneAware);
    }

    #[test]
    fn later_file_overrides_earlier() {
        let input = SettingsInput {
            files: vec![
                ("first.toml".into(), "log_level = \"info\"\n".into()),
                (
                    "second.toml".into(),
                    "log_level = \"debug\"\n[merge]\ndefaults_strategy = \"greedy\"\n".into(),
                ),
            ],
            ..empty_input()
        };
        let settings = resolve_settings(input).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.merge.defaults_strategy, Strategy::Greedy);
    }

    #[test]
    fn env_overrides_file() {
        let input = SettingsInput {
            files: vec![("a.toml".into(), "pass_through_unknown = false\n".into())],
            env_vars: vec![
                ("DEPLOYSPEC__PASS_THROUGH_UNKNOWN".into(), "true".into()),
                (
                    "DEPLOYSPEC__MERGE__DEFAULTS_STRATEGY".into(),
                    "unique-append-list".into(),
                ),
                ("OTHER__LOG_LEVEL".into(), "trace".into()),
            ],
            env_prefix: Some(ENV_PREFIX.into()),
            strict: true,
        };
        let settings = resolve_settings(input).unwrap();
        assert!(settings.pass_through_unknown);
        assert_eq!(
            settings.merge.defaults_strategy,
            Strategy::UniqueAppendList
        );
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn strict_rejects_unknown_keys() {
        let input = SettingsInput {
            files: vec![(
                "bad.toml".into(),
                "spec_fil = \"x.yml\"\n[merge]\nstrategy = \"greedy\"\n".into(),
            )],
            ..empty_input()
        };
        match resolve_settings(input).unwrap_err() {
            SpecError::UnknownSettingsKeys { path, keys } => {
                assert_eq!(path, PathBuf::from("bad.toml"));
                assert_eq!(keys, vec!["spec_fil", "merge.strategy"]);
            }
            other => panic!("Expected UnknownSettingsKeys, got: {other:?}"),
        }
    }

    #[test]
    fn lenient_ignores_unknown_keys() {
        let input = SettingsInput {
            files: vec![("x.toml".into(), "unknown = 1\nlog_level = \"info\"\n".into())],
            strict: false,
            ..Default::default()
        };
        assert_eq!(resolve_settings(input).unwrap().log_level, "info");
    }

    #[test]
    fn malformed_toml_reports_path() {
        let input = SettingsInput {
            files: vec![("broken.toml".into(), "log_level = \n".into())],
            ..empty_input()
        };
        assert!(matches!(
            resolve_settings(input),
            Err(SpecError::TomlParse { .. })
        ));
    }

    #[test]
    fn wrong_type_is_invalid() {
        let input = SettingsInput {
            files: vec![("x.toml".into(), "[merge]\ndefaults_strategy = \"lazy\"\n".into())],
            strict: false,
            ..Default::default()
        };
        assert!(matches!(
            resolve_settings(input),
            Err(SpecError::InvalidSettings(_))
        ));
    }

    #[test]
    fn search_dirs_follow_setting() {
        let settings = resolve_settings(SettingsInput {
            files: vec![("x.toml".into(), "search_paths = [\"/srv/specs\"]\n".into())],
            ..empty_input()
        })
        .unwrap();
        assert_eq!(settings.search_dirs(), vec![PathBuf::from("/srv/specs")]);
    }
}
