//! Integration tests for spanq-config.
//!
//! Tests the full configuration loading pipeline: discovery -> parse -> merge.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use spanq_config::{Config, ConfigError, ConfigWarning};

/// Test helper to create a temporary directory structure for tests.
struct TestEnv {
    /// Owned temporary directory.
    root: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates a directory and returns its path.
    fn create_dir(&self, rel_path: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Creates a file with content and returns its path.
    fn create_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}

#[test]
fn test_load_root_config_only() {
    let env = TestEnv::new();
    env.create_file(
        ".spanq.toml",
        r#"
root = true

[limits]
max_hits_to_process = 100

[cache]
worker_threads = 2
"#,
    );

    let config = Config::load(env.path()).unwrap();

    assert_eq!(config.limits.process_cap(), Some(100));
    assert_eq!(config.limits.count_cap(), Some(10_000_000));
    assert_eq!(config.cache.worker_threads, 2);
    assert_eq!(config.config_root.as_deref(), Some(env.path()));
}

#[test]
fn test_nested_configs_merge_with_precedence() {
    let env = TestEnv::new();
    env.create_file(
        ".spanq.toml",
        r#"
root = true

[cache]
max_entries = 50
ttl_secs = 5
"#,
    );
    env.create_file(
        "project/.spanq.toml",
        r#"
[cache]
max_entries = 10
"#,
    );
    let cwd = env.create_dir("project/src");

    let config = Config::load(&cwd).unwrap();

    assert_eq!(config.cache.max_entries, 10);
    assert_eq!(config.cache.ttl_secs, 5);
    assert_eq!(
        config.config_root.as_deref(),
        Some(env.path().join("project").as_path())
    );
}

#[test]
fn test_load_records_merged_files() {
    let env = TestEnv::new();
    let root = env.create_file(".spanq.toml", "root = true\n");
    let project = env.create_file("project/.spanq.toml", "[results]\ndefault_group_cap = 3\n");
    let cwd = env.create_dir("project/src");

    let config = Config::load(&cwd).unwrap();

    assert_eq!(config.results.default_group_cap, 3);
    assert_eq!(config.sources.files(), vec![project, root.clone()]);
    assert_eq!(config.sources.root, Some(root));
    assert_eq!(config.sources.global, None);
}

#[test]
fn test_invalid_toml_reports_path() {
    let env = TestEnv::new();
    let path = env.create_file(".spanq.toml", "root = true\n[cache\n");

    let err = Config::load(env.path()).unwrap_err();
    match err {
        ConfigError::ParseToml { path: p, .. } => assert_eq!(p, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_loaded_config_validates() {
    let env = TestEnv::new();
    env.create_file(
        ".spanq.toml",
        r#"
root = true

[limits]
max_hits_to_process = 1000
max_hits_to_count = 10
"#,
    );

    let config = Config::load(env.path()).unwrap();
    let warnings = config.validate();
    assert_eq!(
        warnings,
        vec![ConfigWarning::CountCapBelowProcessCap {
            count: 10,
            process: 1000
        }]
    );
}

#[test]
fn test_load_from_files_empty_is_default() {
    let config = Config::load_from_files(&[]).unwrap();
    assert_eq!(config.results.default_window_size, 20);
    assert!(config.config_root.is_none());
}
