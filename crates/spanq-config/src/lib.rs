//! Configuration system for spanq.
//!
//! spanq uses TOML configuration files named `.spanq.toml`. Configuration is resolved by
//! walking up the directory tree from the current working directory, collecting any
//! `.spanq.toml` files found, then loading `~/.spanq.toml` as the global config with lowest
//! precedence.
//!
//! The settings cover three concerns of the search core: how many hits a search may
//! materialize and count, how the result cache and its worker pool are sized, and the
//! presentation defaults used when a caller does not ask for something specific.

#![warn(missing_docs)]

mod discovery;
mod error;
mod merge;
mod parse;
mod templates;
mod validate;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub use discovery::{CONFIG_FILENAME, ConfigSources, global_config_path};
pub use error::ConfigError;
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{
    RawCacheSettings, RawConfig, RawLimits, RawResultsSettings, parse_config_file,
    parse_config_str,
};
use serde::{Deserialize, Serialize};
pub use templates::config_template;
pub use validate::ConfigWarning;
use validate::validate_config;

/// Top-level merged configuration for spanq.
///
/// This represents the fully resolved configuration after merging all discovered
/// `.spanq.toml` files according to precedence rules.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Result size limits.
    pub limits: Limits,
    /// Result cache and worker pool settings.
    pub cache: CacheSettings,
    /// Presentation defaults.
    pub results: ResultsSettings,
    /// Directory containing the most specific config file.
    pub config_root: Option<PathBuf>,
    /// Files the configuration was merged from. Empty unless built by [`Config::load`].
    pub sources: ConfigSources,
}

impl Config {
    /// Loads configuration by discovering and merging all relevant `.spanq.toml` files.
    ///
    /// Returns `Ok(Config::default())` if no configuration files are found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let sources = ConfigSources::discover(cwd);
        let mut config = Self::load_from_files(&sources.files())?;
        config.sources = sources;
        Ok(config)
    }

    /// Loads configuration from a specific list of config file paths.
    ///
    /// Files should be provided in precedence order: highest precedence first.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        if files.is_empty() {
            return Ok(Self::default());
        }

        let parsed: Vec<ParsedConfig> = files
            .iter()
            .map(|path| {
                let config = parse_config_file(path)?;
                Ok(ParsedConfig {
                    path: path.clone(),
                    config,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        merge_configs(&parsed)
    }

    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }

    /// Serializes the effective settings to TOML format.
    pub fn settings_to_toml(&self) -> Result<String, toml::ser::Error> {
        let serializable = SerializableSettings {
            limits: &self.limits,
            cache: &self.cache,
            results: &self.results,
        };
        toml::to_string_pretty(&serializable)
    }
}

/// Limits on how much work a single search may do.
///
/// Negative values mean "unlimited", matching the TOML representation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum hits to materialize per search.
    pub max_hits_to_process: i64,
    /// Maximum hits to count per search.
    pub max_hits_to_count: i64,
    /// Maximum number of terms a term or wildcard may expand to.
    pub max_term_expansions: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_hits_to_process: 5_000_000,
            max_hits_to_count: 10_000_000,
            max_term_expansions: 1_000,
        }
    }
}

impl Limits {
    /// Returns the processing cap, or `None` when unlimited.
    pub fn process_cap(&self) -> Option<usize> {
        usize::try_from(self.max_hits_to_process).ok()
    }

    /// Returns the counting cap, or `None` when unlimited.
    pub fn count_cap(&self) -> Option<usize> {
        usize::try_from(self.max_hits_to_count).ok()
    }
}

/// Result cache and worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of completed results kept.
    pub max_entries: u64,
    /// Seconds a completed result lives after it was written.
    pub ttl_secs: u64,
    /// Number of worker threads evaluating searches.
    pub worker_threads: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl_secs: 600,
            worker_threads: 4,
        }
    }
}

impl CacheSettings {
    /// Time-to-live of a completed result.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Presentation defaults for derived results.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResultsSettings {
    /// Number of hits in a window when none is requested.
    pub default_window_size: usize,
    /// Tokens of context on either side of a hit.
    pub default_context_size: usize,
    /// Hits stored per group when grouping.
    pub default_group_cap: usize,
}

impl Default for ResultsSettings {
    fn default() -> Self {
        Self {
            default_window_size: 20,
            default_context_size: 5,
            default_group_cap: 10,
        }
    }
}

/// Internal struct for TOML serialization of settings.
#[derive(Serialize)]
struct SerializableSettings<'a> {
    /// Result size limits.
    limits: &'a Limits,
    /// Cache settings.
    cache: &'a CacheSettings,
    /// Presentation defaults.
    results: &'a ResultsSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_defaults() {
        let limits = Limits::default();
        assert_eq!(limits.process_cap(), Some(5_000_000));
        assert_eq!(limits.count_cap(), Some(10_000_000));
        assert_eq!(limits.max_term_expansions, 1_000);
    }

    #[test]
    fn test_negative_limit_is_unlimited() {
        let limits = Limits {
            max_hits_to_process: -1,
            ..Default::default()
        };
        assert_eq!(limits.process_cap(), None);
    }

    #[test]
    fn test_cache_defaults() {
        let cache = CacheSettings::default();
        assert_eq!(cache.max_entries, 1_000);
        assert_eq!(cache.ttl(), Duration::from_secs(600));
        assert_eq!(cache.worker_threads, 4);
    }

    #[test]
    fn test_settings_to_toml() {
        let config = Config::default();
        let toml = config.settings_to_toml().unwrap();

        assert!(toml.contains("[limits]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[results]"));
        assert!(toml.contains("max_entries = 1000"));
        assert!(toml.contains("default_window_size = 20"));

        let parsed: toml::Value =
            toml::from_str(&toml).expect("settings_to_toml should produce valid TOML");
        assert!(parsed.get("limits").is_some());
    }
}
