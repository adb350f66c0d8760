//! Configuration loading for srex.
//!
//! Configuration is stored in TOML and has three optional sections:
//! - `[categories]` extends or replaces the built-in category table
//! - `[filters]` excludes files from organization (names, globs, extensions,
//!   regexes, with include patterns that override exclusions)
//! - `[run]` holds defaults for the recursion policy, worker count and the
//!   outcome log; command-line flags take precedence over these
//!
//! # Configuration File Format
//!
//! ```toml
//! [categories]
//! fallback = "Others"
//! replace_defaults = false
//!
//! [categories.mappings]
//! Ebooks = ["epub", "mobi"]
//!
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp"]
//! extensions = ["part"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [run]
//! recursion = "skip-categories"
//! workers = 4
//! log_file = "file_classification.log"
//! ```

use crate::category_table::{CategoryTable, DEFAULT_FALLBACK};
use crate::walker::RecursionPolicy;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".srexrc.toml";

/// Errors that can occur during configuration loading and compilation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),

    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    /// A category name cannot be used as a directory name.
    #[error("Invalid category name '{0}': must be a single, non-empty path component")]
    InvalidCategory(String),

    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Complete configuration as read from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizerConfig {
    #[serde(default)]
    pub categories: CategoryRules,

    #[serde(default)]
    pub filters: FilterRules,

    #[serde(default)]
    pub run: RunRules,
}

/// Overrides for the category table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRules {
    /// Fallback category for unknown extensions. Defaults to "Others".
    #[serde(default)]
    pub fallback: Option<String>,

    /// Start from an empty table instead of the built-in one.
    #[serde(default)]
    pub replace_defaults: bool,

    /// Category name to list of extensions.
    #[serde(default)]
    pub mappings: BTreeMap<String, Vec<String>>,
}

/// Default run settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRules {
    #[serde(default)]
    pub recursion: Option<RecursionPolicy>,

    #[serde(default)]
    pub workers: Option<usize>,

    /// Append-only outcome log.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to include hidden files and directories (starting with ".").
    /// Defaults to true; set to false to leave dotfiles where they are.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

fn default_enable_hidden_files() -> bool {
    true
}

/// Rules for excluding files from organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the path relative to the root.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "part", "tmp").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl OrganizerConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.srexrc.toml` in the current directory
    /// 3. Look for `~/.config/srex/config.toml` in the home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read, or if any discovered file is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("srex")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Build the category table described by `[categories]`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCategory` if the fallback or any category
    /// is not usable as a single directory name.
    pub fn category_table(&self) -> Result<CategoryTable, ConfigError> {
        let rules = &self.categories;
        let fallback = rules.fallback.as_deref().unwrap_or(DEFAULT_FALLBACK);
        validate_category_name(fallback)?;

        let mut table = if rules.replace_defaults {
            CategoryTable::new(fallback)
        } else {
            CategoryTable::default().with_fallback(fallback)
        };

        for (category, extensions) in &rules.mappings {
            validate_category_name(category)?;
            for ext in extensions {
                table.add_mapping(ext, category);
            }
        }

        Ok(table)
    }

    /// Compile the `[filters]` section for matching.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(self.filters.clone())
    }

    /// Validate the `[run]` section.
    pub fn validate_run(&self) -> Result<(), ConfigError> {
        if self.run.workers == Some(0) {
            return Err(ConfigError::ConfigInvalid(
                "run.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Category names become directory names directly under the root.
fn validate_category_name(name: &str) -> Result<(), ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(ConfigError::InvalidCategory(name.to_string()));
    }
    Ok(())
}

/// Compiled filter structures for efficient file matching.
///
/// All glob and regex patterns are parsed once here instead of on each file.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Create compiled filters from filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| crate::category_table::normalize_extension(ext))
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Whether hidden files and directories take part in the run.
    pub fn hidden_enabled(&self) -> bool {
        self.enable_hidden_files
    }

    /// Check if a file should be organized.
    ///
    /// `file_path` is matched as given; the walker passes paths relative to
    /// the root. Checks run in this order, first match wins:
    /// 1. Include patterns (whitelist)
    /// 2. Hidden file filter
    /// 3. Exact filename
    /// 4. Extension
    /// 5. Glob patterns
    /// 6. Regex patterns
    /// 7. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_any(&self.include_patterns, file_path) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.matches_any(&self.exclude_patterns, file_path) {
            return false;
        }

        if self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
        {
            return false;
        }

        true
    }

    fn matches_any(&self, patterns: &[Pattern], file_path: &Path) -> bool {
        patterns.iter().any(|pattern| pattern.matches_path(file_path))
    }
}

impl Default for CompiledFilters {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude_filenames: HashSet::new(),
            exclude_extensions: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}
