//! Where configuration comes from.
//!
//! A project's `.spanq.toml` files are found by checking the working directory and
//! each of its ancestors. A file marked `root = true` ends the search and shuts out
//! the per-user file in the home directory, which otherwise comes last.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::parse::is_root_config;

/// The configuration filename.
pub const CONFIG_FILENAME: &str = ".spanq.toml";

/// The configuration files that apply to one working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSources {
    /// Project files, closest to the working directory first.
    pub project: Vec<PathBuf>,
    /// The `root = true` file that ended the search. It is also the last project file.
    pub root: Option<PathBuf>,
    /// The per-user file, when it exists and no root file shuts it out.
    pub global: Option<PathBuf>,
}

impl ConfigSources {
    /// Finds the files for `cwd`, using the current user's home directory.
    pub fn discover(cwd: &Path) -> Self {
        let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        Self::discover_with_home(cwd, home.as_deref())
    }

    /// Finds the files for `cwd`, taking the per-user file from `home`.
    pub fn discover_with_home(cwd: &Path, home: Option<&Path>) -> Self {
        let mut sources = Self::default();
        for dir in cwd.ancestors() {
            let path = dir.join(CONFIG_FILENAME);
            if !path.is_file() {
                continue;
            }
            sources.project.push(path.clone());
            if is_root_config(&path) {
                sources.root = Some(path);
                return sources;
            }
        }

        sources.global = home
            .map(|home| home.join(CONFIG_FILENAME))
            .filter(|path| path.is_file() && !sources.project.contains(path));
        sources
    }

    /// Every file in precedence order, highest first.
    pub fn files(&self) -> Vec<PathBuf> {
        self.project.iter().chain(&self.global).cloned().collect()
    }

    /// True if no file applies and defaults are used throughout.
    pub fn is_empty(&self) -> bool {
        self.project.is_empty() && self.global.is_none()
    }
}

/// Path of the per-user configuration file, or `None` without a home directory.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILENAME))
}
