//! Configuration merging.
//!
//! Merges multiple `RawConfig` files into a single resolved `Config`, applying
//! precedence rules and rejecting values that can never work.

use std::path::{Path, PathBuf};

use crate::{
    CacheSettings, Config, ConfigError, ConfigSources, Limits, ResultsSettings,
    parse::{RawCacheSettings, RawConfig, RawLimits, RawResultsSettings},
};

/// A parsed config file with its source path.
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

/// Merges multiple configuration files into a single resolved `Config`.
///
/// Configs should be provided in precedence order: highest precedence first (closest to CWD),
/// lowest precedence last (global config). For every scalar the first defined value wins.
pub fn merge_configs(configs: &[ParsedConfig]) -> Result<Config, ConfigError> {
    if configs.is_empty() {
        return Ok(Config::default());
    }

    let mut limits = Limits::default();
    let mut cache = CacheSettings::default();
    let mut results = ResultsSettings::default();

    // Lowest precedence first so higher precedence overwrites
    for parsed in configs.iter().rev() {
        if let Some(ref raw) = parsed.config.limits {
            apply_raw_limits(&mut limits, raw);
        }
        if let Some(ref raw) = parsed.config.cache {
            apply_raw_cache(&mut cache, raw, &parsed.path)?;
        }
        if let Some(ref raw) = parsed.config.results {
            apply_raw_results(&mut results, raw);
        }
    }

    let config_root = configs
        .first()
        .and_then(|c| c.path.parent())
        .map(Path::to_path_buf);

    Ok(Config {
        limits,
        cache,
        results,
        config_root,
        sources: ConfigSources::default(),
    })
}

/// Applies raw limits to result, overwriting any present values.
fn apply_raw_limits(result: &mut Limits, raw: &RawLimits) {
    if let Some(v) = raw.max_hits_to_process {
        result.max_hits_to_process = v;
    }
    if let Some(v) = raw.max_hits_to_count {
        result.max_hits_to_count = v;
    }
    if let Some(v) = raw.max_term_expansions {
        result.max_term_expansions = v;
    }
}

/// Applies raw cache settings to result.
fn apply_raw_cache(
    result: &mut CacheSettings,
    raw: &RawCacheSettings,
    path: &Path,
) -> Result<(), ConfigError> {
    if let Some(v) = raw.max_entries {
        result.max_entries = v;
    }
    if let Some(v) = raw.ttl_secs {
        result.ttl_secs = v;
    }
    if let Some(v) = raw.worker_threads {
        if v == 0 {
            return Err(ConfigError::InvalidValue {
                path: path.to_path_buf(),
                key: "cache.worker_threads".to_string(),
                message: "at least one worker thread is required".to_string(),
            });
        }
        result.worker_threads = v;
    }
    Ok(())
}

/// Applies raw results settings to result.
fn apply_raw_results(result: &mut ResultsSettings, raw: &RawResultsSettings) {
    if let Some(v) = raw.default_window_size {
        result.default_window_size = v;
    }
    if let Some(v) = raw.default_context_size {
        result.default_context_size = v;
    }
    if let Some(v) = raw.default_group_cap {
        result.default_group_cap = v;
    }
}
