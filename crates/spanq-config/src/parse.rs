//! Configuration file parsing.
//!
//! Parses individual `.spanq.toml` files into intermediate `RawConfig` structures
//! that preserve the optional nature of all fields before merging.

use std::{fs, path::Path};

use serde::Deserialize;
#[cfg(test)]
use toml::de::Error as TomlError;

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
///
/// All fields are optional to support partial configs that will be merged.
/// This mirrors the TOML schema exactly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// When true, stop discovery here - ignore parent and global configs.
    pub root: Option<bool>,
    /// Result size limits.
    pub limits: Option<RawLimits>,
    /// Result cache and worker pool settings.
    pub cache: Option<RawCacheSettings>,
    /// Presentation defaults for derived results.
    pub results: Option<RawResultsSettings>,
}

/// Raw `[limits]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLimits {
    /// Maximum hits to materialize per search; negative means unlimited.
    pub max_hits_to_process: Option<i64>,
    /// Maximum hits to count per search; negative means unlimited.
    pub max_hits_to_count: Option<i64>,
    /// Maximum number of terms a single wildcard or term may expand to.
    pub max_term_expansions: Option<usize>,
}

/// Raw `[cache]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCacheSettings {
    /// Maximum number of completed results kept.
    pub max_entries: Option<u64>,
    /// Seconds a completed result lives after it was written.
    pub ttl_secs: Option<u64>,
    /// Number of worker threads evaluating searches.
    pub worker_threads: Option<usize>,
}

/// Raw `[results]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawResultsSettings {
    /// Number of hits in a window when none is requested.
    pub default_window_size: Option<usize>,
    /// Tokens of context on either side of a hit.
    pub default_context_size: Option<usize>,
    /// Hits stored per group when grouping.
    pub default_group_cap: Option<usize>,
}

/// Parses a configuration file from disk.
///
/// Returns a `RawConfig` with all fields as optionals, ready for merging.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses configuration from a TOML string without path context.
///
/// Useful for validating template content (tests only).
#[cfg(test)]
pub fn parse_config(contents: &str) -> Result<RawConfig, TomlError> {
    toml::from_str(contents)
}

/// Checks if a config file has `root = true` set.
///
/// This is used during discovery to stop traversal at root configs.
/// Returns false if the file cannot be read or parsed.
pub fn is_root_config(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(config) = toml::from_str::<RawConfig>(&contents) else {
        return false;
    };
    config.root == Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config_str("", Path::new("test.toml")).unwrap();
        assert!(config.limits.is_none());
        assert!(config.cache.is_none());
        assert!(config.results.is_none());
        assert!(config.root.is_none());
    }

    #[test]
    fn test_parse_limits() {
        let toml = r#"
[limits]
max_hits_to_process = 1000
max_hits_to_count = -1
max_term_expansions = 50
"#;
        let config = parse_config_str(toml, Path::new("test.toml")).unwrap();
        let limits = config.limits.unwrap();
        assert_eq!(limits.max_hits_to_process, Some(1000));
        assert_eq!(limits.max_hits_to_count, Some(-1));
        assert_eq!(limits.max_term_expansions, Some(50));
    }

    #[test]
    fn test_parse_partial_cache_settings() {
        let toml = r#"
[cache]
worker_threads = 2
"#;
        let config = parse_config_str(toml, Path::new("test.toml")).unwrap();
        let cache = config.cache.unwrap();
        assert_eq!(cache.worker_threads, Some(2));
        assert!(cache.max_entries.is_none());
        assert!(cache.ttl_secs.is_none());
    }

    #[test]
    fn test_parse_results_settings() {
        let toml = r#"
[results]
default_window_size = 50
default_context_size = 3
default_group_cap = 0
"#;
        let config = parse_config_str(toml, Path::new("test.toml")).unwrap();
        let results = config.results.unwrap();
        assert_eq!(results.default_window_size, Some(50));
        assert_eq!(results.default_context_size, Some(3));
        assert_eq!(results.default_group_cap, Some(0));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let toml = "this is not valid toml [[[";
        let result = parse_config_str(toml, Path::new("test.toml"));
        assert!(matches!(result, Err(ConfigError::ParseToml { .. })));
    }

    #[test]
    fn test_parse_unknown_fields_ignored() {
        let toml = r#"
[cache]
max_entries = 5
unknown_field = "ignored"

[unknown_section]
foo = "bar"
"#;
        let config = parse_config_str(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.cache.unwrap().max_entries, Some(5));
    }

    #[test]
    fn test_parse_wrong_type_error() {
        let toml = r#"
[cache]
max_entries = "lots"
"#;
        assert!(parse_config_str(toml, Path::new("test.toml")).is_err());
    }

    #[test]
    fn test_parse_config_file_not_found() {
        let result = parse_config_file(Path::new("/nonexistent/path/.spanq.toml"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_parse_root_flag() {
        let config = parse_config_str("root = true\n", Path::new("test.toml")).unwrap();
        assert_eq!(config.root, Some(true));
        let config = parse_config_str("root = false\n", Path::new("test.toml")).unwrap();
        assert_eq!(config.root, Some(false));
    }

    #[test]
    fn test_is_root_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".spanq.toml");
        fs::write(&config_path, "root = true\n").unwrap();
        assert!(is_root_config(&config_path));

        fs::write(&config_path, "[cache]\nmax_entries = 5\n").unwrap();
        assert!(!is_root_config(&config_path));

        assert!(!is_root_config(Path::new("/nonexistent/.spanq.toml")));
    }
}
