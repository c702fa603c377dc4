//! Project configuration.
//!
//! Settings are read from `.phpantom.toml` in the project root.  When the
//! project has none, the user-level file `phpantom/config.toml` inside the
//! platform configuration directory is tried.  Missing keys take their
//! defaults, and an unreadable or malformed file is logged and ignored.
//!
//! ```toml
//! [indexing]
//! extensions = ["php", "phtml"]
//! exclude = ["vendor/bin"]
//!
//! [resolution]
//! max_depth = 32
//!
//! [linting]
//! unknown_members = false
//! ```

use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;
use serde::Deserialize;

pub const PROJECT_CONFIG_FILE: &str = ".phpantom.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub indexing: IndexingConfig,
    pub resolution: ResolutionConfig,
    pub linting: LintSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexingConfig {
    /// File extensions (without the dot) that are indexed.
    pub extensions: Vec<String>,
    /// Paths, relative to the project root, that are never indexed.
    pub exclude: Vec<PathBuf>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["php".to_string()],
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Recursion bound shared by classlike resolution and type deduction.
    pub max_depth: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LintSettings {
    pub syntax_errors: bool,
    pub unknown_classes: bool,
    pub unknown_functions: bool,
    pub unknown_constants: bool,
    pub unknown_members: bool,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            syntax_errors: true,
            unknown_classes: true,
            unknown_functions: true,
            unknown_constants: true,
            unknown_members: true,
        }
    }
}

impl Config {
    /// Load the configuration for the project rooted at `root`.
    pub fn load(root: &Path) -> Self {
        let project_file = root.join(PROJECT_CONFIG_FILE);
        if let Some(config) = load_file(&project_file) {
            return config;
        }

        user_config_path()
            .and_then(|path| load_file(&path))
            .unwrap_or_default()
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Whether `path` has one of the configured extensions.
    pub fn is_indexable(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.indexing
                    .extensions
                    .iter()
                    .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }

    /// Whether `path` lies inside one of the excluded paths of `root`.
    pub fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        self.indexing
            .exclude
            .iter()
            .any(|excluded| path.starts_with(root.join(excluded)))
    }
}

fn user_config_path() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("phpantom").join("config.toml"))
}

fn load_file(path: &Path) -> Option<Config> {
    if !path.exists() {
        return None;
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", path.display(), err);
            return None;
        }
    };

    match Config::from_toml(&contents) {
        Ok(config) => Some(config),
        Err(err) => {
            tracing::warn!("Failed to parse {}: {}", path.display(), err);
            None
        }
    }
}
