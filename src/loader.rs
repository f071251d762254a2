//! File discovery and YAML loading.
//!
//! Each [`SearchPath`] resolves to one concrete directory. Specs and defaults
//! files are looked up as `{dir}/{file_name}` in the order given and the first
//! match wins; a name that already points at an existing file is used as is.
//! Settings files use [`read_all`] instead, which returns every match so the
//! caller can merge them.
//!
//! Missing files are skipped during discovery. Only actual I/O errors
//! (permissions, etc.) are propagated.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::SpecError;
use crate::types::{Mapping, SearchPath};

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to construct the platform-specific
/// config directory (e.g. `~/.config/{app_name}/` on Linux).
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory found).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Resolve every search path, dropping the ones that cannot be resolved.
pub fn expand_search_paths(search_paths: &[SearchPath], app_name: &str) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
        .collect()
}

/// Read `{dir}/{file_name}` from every directory that has it, in order.
pub fn read_all(dirs: &[PathBuf], file_name: &str) -> Result<Vec<(PathBuf, String)>, SpecError> {
    let mut results = Vec::new();
    for dir in dirs {
        let file_path = dir.join(file_name);
        match std::fs::read_to_string(&file_path) {
            Ok(content) => results.push((file_path, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(SpecError::Io {
                    path: file_path,
                    source: e,
                });
            }
        }
    }
    Ok(results)
}

/// Locate `file_name`: as given if it exists, otherwise the first
/// `{dir}/{file_name}` that exists.
pub fn find_file(file_name: &str, dirs: &[PathBuf]) -> Result<PathBuf, SpecError> {
    let direct = Path::new(file_name);
    if direct.is_file() {
        return Ok(direct.to_path_buf());
    }

    let mut searched = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let candidate = dir.join(file_name);
        if candidate.is_file() {
            return Ok(candidate);
        }
        searched.push(std::path::absolute(&candidate).unwrap_or(candidate));
    }

    Err(SpecError::FileNotFound {
        file: file_name.to_string(),
        searched,
    })
}

/// Parse YAML text that must hold a non-empty mapping.
pub fn parse_yaml(path: &Path, content: &str) -> Result<Mapping, SpecError> {
    if content.trim().is_empty() {
        return Err(SpecError::EmptySettings {
            path: path.to_path_buf(),
        });
    }
    let value: Value = serde_yaml::from_str(content).map_err(|e| SpecError::YamlParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    match value {
        Value::Object(mapping) => Ok(mapping),
        Value::Null => Err(SpecError::EmptySettings {
            path: path.to_path_buf(),
        }),
        _ => Err(SpecError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// Find and load a YAML file. Returns the path it was loaded from.
pub fn load_yaml(file_name: &str, dirs: &[PathBuf]) -> Result<(PathBuf, Mapping), SpecError> {
    let path = find_file(file_name, dirs)?;
    debug!(path = %path.display(), "loading YAML file");
    let content = std::fs::read_to_string(&path).map_err(|e| SpecError::Io {
        path: path.clone(),
        source: e,
    })?;
    let mapping = parse_yaml(&path, &content)?;
    Ok((path, mapping))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn resolve_explicit_path() {
        let p = PathBuf::from("/tmp/myconfig");
        let result = resolve_search_path(&SearchPath::Path(p.clone()), "app");
        assert_eq!(result, Some(p));
    }

    #[test]
    fn read_all_skips_missing() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir2.path().join("app.toml"), "port = 1\n").unwrap();

        let dirs = vec![dir1.path().to_path_buf(), dir2.path().to_path_buf()];
        let files = read_all(&dirs, "app.toml").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, dir2.path().join("app.toml"));
        assert_eq!(files[0].1, "port = 1\n");
    }

    #[test]
    fn read_all_keeps_order() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir1.path().join("app.toml"), "a = 1\n").unwrap();
        fs::write(dir2.path().join("app.toml"), "a = 2\n").unwrap();

        let dirs = vec![dir1.path().to_path_buf(), dir2.path().to_path_buf()];
        let files = read_all(&dirs, "app.toml").unwrap();
        assert_eq!(files[0].1, "a = 1\n");
        assert_eq!(files[1].1, "a = 2\n");
    }

    #[test]
    fn first_directory_wins() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir1.path().join("defaults.yml"), "source: first\n").unwrap();
        fs::write(dir2.path().join("defaults.yml"), "source: second\n").unwrap();

        let dirs = vec![dir1.path().to_path_buf(), dir2.path().to_path_buf()];
        let (path, mapping) = load_yaml("defaults.yml", &dirs).unwrap();
        assert_eq!(path, dir1.path().join("defaults.yml"));
        assert_eq!(mapping["source"], json!("first"));
    }

    #[test]
    fn existing_path_used_directly() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("spec.yml");
        fs::write(&file, "example: {}\n").unwrap();

        let (path, mapping) = load_yaml(file.to_str().unwrap(), &[]).unwrap();
        assert_eq!(path, file);
        assert!(mapping.contains_key("example"));
    }

    #[test]
    fn not_found_lists_searched_files() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        let dirs = vec![dir1.path().to_path_buf(), dir2.path().to_path_buf()];

        match load_yaml("missing.yml", &dirs).unwrap_err() {
            SpecError::FileNotFound { file, searched } => {
                assert_eq!(file, "missing.yml");
                assert_eq!(
                    searched,
                    vec![dir1.path().join("missing.yml"), dir2.path().join("missing.yml")]
                );
            }
            other => panic!("Expected FileNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn empty_file_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.yml"), "\n  \n").unwrap();
        fs::write(dir.path().join("null.yml"), "~\n").unwrap();
        let dirs = vec![dir.path().to_path_buf()];

        assert!(matches!(
            load_yaml("empty.yml", &dirs),
            Err(SpecError::EmptySettings { .. })
        ));
        assert!(matches!(
            load_yaml("null.yml", &dirs),
            Err(SpecError::EmptySettings { .. })
        ));
    }

    #[test]
    fn scalar_document_rejected() {
        let err = parse_yaml(Path::new("list.yml"), "- a\n- b\n").unwrap_err();
        assert!(matches!(err, SpecError::NotAMapping { .. }));
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let err = parse_yaml(Path::new("bad.yml"), "key: [unclosed\n").unwrap_err();
        match err {
            SpecError::YamlParse { path, .. } => assert_eq!(path, PathBuf::from("bad.yml")),
            other => panic!("Expected YamlParse, got: {other:?}"),
        }
    }

    #[test]
    fn nested_yaml_keeps_structure() {
        let mapping =
            parse_yaml(Path::new("d.yml"), "db:\n  host: localhost\n  ports: [1, 2]\n").unwrap();
        assert_eq!(mapping["db"], json!({"host": "localhost", "ports": [1, 2]}));
    }
}
