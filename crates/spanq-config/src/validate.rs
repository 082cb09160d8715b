//! Configuration validation.
//!
//! Validates a loaded configuration and reports warnings for settings that are
//! legal but probably not what the user meant.

use std::fmt;

use crate::Config;

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Counting stops before processing would, so the processing cap never applies.
    CountCapBelowProcessCap {
        /// Configured count cap.
        count: usize,
        /// Configured process cap.
        process: usize,
    },
    /// The cache keeps no completed results, so every search re-executes.
    CacheDisabled,
    /// Windows default to zero hits.
    EmptyDefaultWindow,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountCapBelowProcessCap { count, process } => write!(
                f,
                "max_hits_to_count ({count}) is below max_hits_to_process ({process})"
            ),
            Self::CacheDisabled => write!(f, "cache.max_entries is 0; results are never reused"),
            Self::EmptyDefaultWindow => write!(f, "results.default_window_size is 0"),
        }
    }
}

/// Validates the configuration and returns any warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if let (Some(count), Some(process)) = (config.limits.count_cap(), config.limits.process_cap())
        && count < process
    {
        warnings.push(ConfigWarning::CountCapBelowProcessCap { count, process });
    }
    if config.cache.max_entries == 0 {
        warnings.push(ConfigWarning::CacheDisabled);
    }
    if config.results.default_window_size == 0 {
        warnings.push(ConfigWarning::EmptyDefaultWindow);
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheSettings, Limits};

    #[test]
    fn default_config_has_no_warnings() {
        assert!(validate_config(&Config::default()).is_empty());
    }

    #[test]
    fn count_cap_below_process_cap_warns() {
        let config = Config {
            limits: Limits {
                max_hits_to_process: 100,
                max_hits_to_count: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            validate_config(&config),
            vec![ConfigWarning::CountCapBelowProcessCap {
                count: 10,
                process: 100
            }]
        );
    }

    #[test]
    fn unlimited_count_never_warns() {
        let config = Config {
            limits: Limits {
                max_hits_to_process: 100,
                max_hits_to_count: -1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn disabled_cache_warns() {
        let config = Config {
            cache: CacheSettings {
                max_entries: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(validate_config(&config), vec![ConfigWarning::CacheDisabled]);
    }
}
