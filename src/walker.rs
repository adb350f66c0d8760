//! Directory traversal.
//!
//! The walker lists the regular files below the root that take part in a
//! run and, for sequential runs, feeds them one by one to the classifier.

use crate::category_table::CategoryTable;
use crate::classifier::Classifier;
use crate::config::CompiledFilters;
use crate::outcome::RunSummary;
use crate::output::OutcomeSink;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Which subdirectories of the root the walker descends into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecursionPolicy {
    /// Recurse everywhere except the root-level category directories, so
    /// files that were already sorted are not looked at again.
    #[default]
    SkipCategories,
    /// Recurse everywhere, category directories included.
    All,
    /// Only files directly inside the root.
    TopLevel,
}

/// Files found by a walk.
#[derive(Debug, Clone, Default)]
pub struct WalkListing {
    /// Regular files to classify, sorted by path.
    pub files: Vec<PathBuf>,
    /// Entries that could not be read.
    pub unreadable: usize,
}

impl WalkListing {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Walks the tree under a root directory.
pub struct FileWalker<'a> {
    root: &'a Path,
    table: &'a CategoryTable,
    filters: &'a CompiledFilters,
    recursion: RecursionPolicy,
    excluded: &'a [PathBuf],
}

impl<'a> FileWalker<'a> {
    pub fn new(
        root: &'a Path,
        table: &'a CategoryTable,
        filters: &'a CompiledFilters,
        recursion: RecursionPolicy,
    ) -> Self {
        Self {
            root,
            table,
            filters,
            recursion,
            excluded: &[],
        }
    }

    /// Never lists any of `paths`. They are compared against the joined
    /// walk paths, so they should be canonical when the root is.
    pub fn excluding(mut self, paths: &'a [PathBuf]) -> Self {
        self.excluded = paths;
        self
    }

    /// Lists every regular file that should be classified.
    ///
    /// Symbolic links are neither followed nor classified. Unreadable entries
    /// are logged and counted; they never end the walk.
    pub fn list(&self) -> WalkListing {
        let mut walker = WalkDir::new(self.root).follow_links(false).min_depth(1);
        if self.recursion == RecursionPolicy::TopLevel {
            walker = walker.max_depth(1);
        }

        let mut listing = WalkListing::default();
        let entries = walker
            .into_iter()
            .filter_entry(|entry| self.should_enter(entry));

        for entry in entries {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let relative = entry.path().strip_prefix(self.root).unwrap_or(entry.path());
                    if self.excluded.iter().any(|p| p == entry.path()) {
                        debug!(path = %relative.display(), "excluded from the walk");
                    } else if self.filters.should_include(relative) {
                        listing.files.push(entry.into_path());
                    } else {
                        debug!(path = %relative.display(), "excluded by filters");
                    }
                }
                Err(e) => {
                    warn!(
                        path = ?e.path().map(Path::display).map(|d| d.to_string()),
                        error = %e,
                        "skipping unreadable entry"
                    );
                    listing.unreadable += 1;
                }
            }
        }

        listing.files.sort();
        listing
    }

    /// Whether the walk descends into `entry` (files always pass).
    fn should_enter(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }

        let name = entry.file_name().to_string_lossy();
        if !self.filters.hidden_enabled() && name.starts_with('.') {
            return false;
        }

        if self.recursion == RecursionPolicy::SkipCategories
            && entry.depth() == 1
            && self.table.is_category(&name)
        {
            debug!(directory = %name, "not descending into category directory");
            return false;
        }

        true
    }

    /// Lists the tree and classifies every file in order.
    ///
    /// Each file yields exactly one outcome, which is recorded in the
    /// returned summary and passed to `sink`. A failed file is reported and
    /// the walk moves on.
    pub fn walk(&self, classifier: &Classifier<'_>, sink: &dyn OutcomeSink) -> RunSummary {
        walk_listing(self.list(), classifier, sink)
    }
}

/// Classifies the files of an existing listing sequentially.
pub fn walk_listing(
    listing: WalkListing,
    classifier: &Classifier<'_>,
    sink: &dyn OutcomeSink,
) -> RunSummary {
    let mut summary = RunSummary {
        unreadable: listing.unreadable,
        ..RunSummary::default()
    };

    for path in &listing.files {
        let outcome = classifier.outcome_for(path);
        summary.record(&outcome);
        sink.on_outcome(&outcome);
    }

    summary
}
