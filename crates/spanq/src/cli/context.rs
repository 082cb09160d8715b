//! Shared context for running CLI commands.

use std::{
    env, fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use spanq_config::Config;
use spanq_search::{QuerySettings, ResultsCache};
use spanq_spans::{InputDocument, MemoryCorpus, SpanQuery};

/// Command execution context built once per CLI invocation.
pub struct CommandContext {
    /// Current working directory.
    pub cwd: PathBuf,
    /// Loaded configuration (may be default if no config files found).
    pub config: Config,
}

impl CommandContext {
    /// Loads the current directory and configuration.
    pub fn load() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        let config = Config::load(&cwd).map_err(|e| {
            eprintln!("error: failed to load configuration: {e}");
            ExitCode::FAILURE
        })?;
        for warning in config.validate() {
            tracing::warn!(%warning, "configuration");
        }
        Ok(Self { cwd, config })
    }

    /// Loads only the current directory, skipping configuration parsing.
    ///
    /// Used for `init`, which should work even when an existing config file is
    /// invalid.
    pub fn load_cwd_only() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        Ok(Self {
            cwd,
            config: Config::default(),
        })
    }

    /// Limits for building queries.
    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings::from_config(&self.config.limits)
    }

    /// Starts the result cache for this invocation.
    pub fn cache(&self) -> Result<ResultsCache, ExitCode> {
        ResultsCache::new(&self.config.cache).map_err(|e| {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        })
    }

    /// Reads a corpus file: a JSON array of documents.
    pub fn load_corpus(&self, path: &Path) -> Result<Arc<MemoryCorpus>, ExitCode> {
        let path = self.cwd.join(path);
        let contents = read_or_failure(&path)?;
        let documents: Vec<InputDocument> = serde_json::from_str(&contents).map_err(|e| {
            eprintln!("error: invalid corpus {}: {e}", path.display());
            ExitCode::FAILURE
        })?;
        let corpus = MemoryCorpus::from_documents(documents).map_err(|e| {
            eprintln!("error: invalid corpus {}: {e}", path.display());
            ExitCode::FAILURE
        })?;
        Ok(Arc::new(corpus))
    }

    /// Parses the query argument.
    ///
    /// `@path` reads JSON from a file, text starting with `{` is JSON, and anything
    /// else is a single case-insensitive word.
    pub fn parse_query(&self, arg: &str) -> Result<SpanQuery, ExitCode> {
        let json = if let Some(file) = arg.strip_prefix('@') {
            read_or_failure(&self.cwd.join(file))?
        } else if arg.trim_start().starts_with('{') {
            arg.to_string()
        } else {
            return Ok(SpanQuery::term(arg.trim()));
        };
        serde_json::from_str(&json).map_err(|e| {
            eprintln!("error: invalid query: {e}");
            ExitCode::FAILURE
        })
    }
}

/// Returns the current working directory or exits with a consistent error.
fn current_dir_or_failure() -> Result<PathBuf, ExitCode> {
    env::current_dir().map_err(|e| {
        eprintln!("error: could not determine current directory: {e}");
        ExitCode::FAILURE
    })
}

/// Reads a file or exits with a consistent error.
fn read_or_failure(path: &Path) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", path.display());
        ExitCode::FAILURE
    })
}
