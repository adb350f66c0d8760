//! Extension-based category table.
//!
//! This module maps file extensions to category names. Each category name is
//! also the name of the subdirectory files of that category are moved into.
//!
//! Extensions are normalized to lower case without a leading dot, so `"JPG"`,
//! `".jpg"` and `"jpg"` all refer to the same entry. Lookups never fail: an
//! extension that is not in the table resolves to the fallback category.
//!
//! # Examples
//!
//! ```
//! use srex::category_table::CategoryTable;
//!
//! let table = CategoryTable::default();
//! assert_eq!(table.resolve("png"), "Images");
//! assert_eq!(table.resolve(".PDF"), "Documents");
//! assert_eq!(table.resolve("xyz"), "Others");
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Name of the fallback category used by the built-in table.
pub const DEFAULT_FALLBACK: &str = "Others";

/// Maps normalized file extensions to category names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    extension_map: HashMap<String, String>,
    fallback: String,
}

impl CategoryTable {
    /// Creates an empty table where every file resolves to `fallback`.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            extension_map: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    /// Builds a table from `(category, extensions)` groups.
    ///
    /// # Examples
    ///
    /// ```
    /// use srex::category_table::CategoryTable;
    ///
    /// let table = CategoryTable::from_groups(
    ///     "Other",
    ///     [("Images", &["jpg", "png"][..]), ("PDFs", &["pdf"][..])],
    /// );
    /// assert_eq!(table.resolve("JPG"), "Images");
    /// assert_eq!(table.resolve("csv"), "Other");
    /// ```
    pub fn from_groups<'a, I>(fallback: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [&'a str])>,
    {
        let mut table = Self::new(fallback);
        for (category, extensions) in groups {
            for ext in extensions {
                table.add_mapping(ext, category);
            }
        }
        table
    }

    /// Populates the table with the standard extension mappings.
    fn populate_standard_mappings(&mut self) {
        // Images
        self.add_mapping("jpg", "Images");
        self.add_mapping("jpeg", "Images");
        self.add_mapping("png", "Images");
        self.add_mapping("gif", "Images");
        self.add_mapping("bmp", "Images");
        self.add_mapping("heic", "Images");

        // Plain text
        self.add_mapping("txt", "Text");

        // Documents
        self.add_mapping("pdf", "Documents");
        self.add_mapping("doc", "Documents");
        self.add_mapping("docx", "Documents");

        // Spreadsheets
        self.add_mapping("xls", "Spreadsheets");
        self.add_mapping("xlsx", "Spreadsheets");
        self.add_mapping("csv", "Spreadsheets");

        // Audio
        self.add_mapping("mp3", "Audio");
        self.add_mapping("wav", "Audio");
        self.add_mapping("ogg", "Audio");

        // Videos
        self.add_mapping("mp4", "Videos");
        self.add_mapping("mkv", "Videos");
        self.add_mapping("mov", "Videos");
    }

    /// Adds (or replaces) the category for an extension.
    pub fn add_mapping(&mut self, ext: &str, category: &str) {
        self.extension_map
            .insert(normalize_extension(ext), category.to_string());
    }

    /// Builder-style variant of [`CategoryTable::add_mapping`].
    pub fn with_mapping(mut self, ext: &str, category: &str) -> Self {
        self.add_mapping(ext, category);
        self
    }

    /// Replaces the fallback category.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// The category assigned to files with unknown or missing extensions.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Resolves an extension to its category, falling back when unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use srex::category_table::CategoryTable;
    ///
    /// let table = CategoryTable::default();
    /// assert_eq!(table.resolve("Mp3"), "Audio");
    /// assert_eq!(table.resolve(""), "Others");
    /// ```
    pub fn resolve(&self, ext: &str) -> &str {
        self.extension_map
            .get(&normalize_extension(ext))
            .map(String::as_str)
            .unwrap_or(self.fallback.as_str())
    }

    /// Resolves the category of a file from its extension.
    ///
    /// Files without an extension (including dotfiles such as `.bashrc`)
    /// resolve to the fallback category.
    pub fn resolve_path(&self, path: &Path) -> &str {
        match path.extension() {
            Some(ext) => self.resolve(&ext.to_string_lossy()),
            None => self.fallback.as_str(),
        }
    }

    /// Returns every distinct category name, fallback included, sorted.
    pub fn categories(&self) -> BTreeSet<&str> {
        self.extension_map
            .values()
            .map(String::as_str)
            .chain(std::iter::once(self.fallback.as_str()))
            .collect()
    }

    /// Returns true if `name` is one of this table's category names.
    pub fn is_category(&self, name: &str) -> bool {
        name == self.fallback || self.extension_map.values().any(|c| c == name)
    }

    /// Number of extensions with an explicit mapping.
    pub fn len(&self) -> usize {
        self.extension_map.len()
    }

    /// Returns true if no extension has an explicit mapping.
    pub fn is_empty(&self) -> bool {
        self.extension_map.is_empty()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        let mut table = Self::new(DEFAULT_FALLBACK);
        table.populate_standard_mappings();
        table
    }
}

/// Lower-cases an extension and strips any leading dots.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}
