//! Error types for spanq configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use toml::de;

/// Errors that can occur when loading or processing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse config file {path}: {source}")]
    ParseToml {
        /// Path to the file that could not be parsed.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: de::Error,
    },

    /// A setting holds a value that can never work.
    #[error("invalid value for {key} in {path}: {message}")]
    InvalidValue {
        /// File that defined the value.
        path: PathBuf,
        /// Dotted key of the setting, e.g. `cache.worker_threads`.
        key: String,
        /// What is wrong with it.
        message: String,
    },
}
