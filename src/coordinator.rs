//! Run coordination.
//!
//! An [`Organizer`] validates the root, provisions the category directories,
//! lists the files and dispatches them to the classifier, either on the
//! calling thread or on a bounded rayon pool.

use crate::category_table::CategoryTable;
use crate::classifier::Classifier;
use crate::config::{CompiledFilters, OrganizerConfig};
use crate::error::{OrganizeError, OrganizeResult};
use crate::outcome::{ClassificationOutcome, RunSummary};
use crate::output::OutcomeSink;
use crate::provisioner;
use crate::walker::{FileWalker, RecursionPolicy, WalkListing, walk_listing};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Settings for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Report what would happen without touching the filesystem.
    pub dry_run: bool,
    /// Worker threads. `Some(1)` classifies on the calling thread; `None`
    /// lets rayon pick.
    pub workers: Option<usize>,
    pub recursion: RecursionPolicy,
    pub filters: CompiledFilters,
    /// Files the walk never lists, such as a log file written during the run.
    pub excluded_paths: Vec<PathBuf>,
}

/// Command-line values that take precedence over the `[run]` section.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOverrides {
    pub dry_run: bool,
    pub workers: Option<usize>,
    pub recursion: Option<RecursionPolicy>,
}

/// Organizes one root directory.
#[derive(Debug, Clone)]
pub struct Organizer {
    root: PathBuf,
    table: CategoryTable,
    options: RunOptions,
}

impl Organizer {
    pub fn new(root: impl Into<PathBuf>, table: CategoryTable, options: RunOptions) -> Self {
        Self {
            root: root.into(),
            table,
            options,
        }
    }

    /// Builds an organizer from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::Config` if the category table or filters do
    /// not compile, or if the effective worker count is zero.
    pub fn from_config(
        root: impl Into<PathBuf>,
        config: &OrganizerConfig,
        overrides: RunOverrides,
    ) -> OrganizeResult<Self> {
        config.validate_run()?;
        let table = config.category_table()?;
        let filters = config.compile_filters()?;

        let workers = overrides.workers.or(config.run.workers);
        if workers == Some(0) {
            return Err(crate::config::ConfigError::ConfigInvalid(
                "worker count must be at least 1".to_string(),
            )
            .into());
        }

        let options = RunOptions {
            dry_run: overrides.dry_run,
            workers,
            recursion: overrides
                .recursion
                .or(config.run.recursion)
                .unwrap_or_default(),
            filters,
            excluded_paths: Vec::new(),
        };

        Ok(Self::new(root, table, options))
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Keeps `path` out of the walk even if it lies below the root.
    pub fn exclude_path(&mut self, path: impl Into<PathBuf>) {
        self.options.excluded_paths.push(path.into());
    }

    /// Runs the organizer to completion.
    ///
    /// Every listed file produces exactly one outcome, which is passed to
    /// `sink` and counted in the returned summary. Failures of single files
    /// never abort the run.
    ///
    /// # Errors
    ///
    /// * `OrganizeError::InvalidRoot` if the root is missing or not a directory
    /// * `OrganizeError::PermissionDenied` / `OrganizeError::Directory` if a
    ///   category directory cannot be created
    /// * `OrganizeError::EmptyDirectory` if there is nothing to classify;
    ///   this one is not a failure (see [`OrganizeError::is_fatal`])
    /// * `OrganizeError::WorkerPool` if the thread pool cannot be built
    pub fn run(&self, sink: &dyn OutcomeSink) -> OrganizeResult<RunSummary> {
        let root = self.resolve_root()?;
        info!(
            root = %root.display(),
            dry_run = self.options.dry_run,
            recursion = ?self.options.recursion,
            "starting classification"
        );

        if !self.options.dry_run {
            provisioner::ensure(&root, &self.table)?;
        }

        let excluded = self.resolve_excluded();
        let walker = FileWalker::new(
            &root,
            &self.table,
            &self.options.filters,
            self.options.recursion,
        )
        .excluding(&excluded);
        let listing = walker.list();
        if listing.is_empty() {
            info!(root = %root.display(), "nothing to classify");
            return Err(OrganizeError::EmptyDirectory { path: root });
        }

        let classifier = Classifier::new(&root, &self.table).dry_run(self.options.dry_run);
        sink.on_start(listing.len() as u64);

        let summary = match self.options.workers {
            Some(1) => walk_listing(listing, &classifier, sink),
            workers => dispatch_parallel(listing, &classifier, workers, sink)?,
        };

        info!(
            moved = summary.moved,
            skipped = summary.skipped,
            failed = summary.failed,
            planned = summary.planned,
            "classification finished"
        );
        sink.on_finish(&summary);
        Ok(summary)
    }

    fn resolve_root(&self) -> OrganizeResult<PathBuf> {
        let invalid = || OrganizeError::InvalidRoot {
            path: self.root.clone(),
        };
        let root = fs::canonicalize(&self.root).map_err(|_| invalid())?;
        if !root.is_dir() {
            return Err(invalid());
        }
        Ok(root)
    }

    /// Excluded paths in the same canonical form the walk produces.
    fn resolve_excluded(&self) -> Vec<PathBuf> {
        self.options
            .excluded_paths
            .iter()
            .map(|path| fs::canonicalize(path).unwrap_or_else(|_| path.clone()))
            .collect()
    }
}

/// Classifies on a bounded pool; the calling thread consumes the outcomes.
fn dispatch_parallel(
    listing: WalkListing,
    classifier: &Classifier<'_>,
    workers: Option<usize>,
    sink: &dyn OutcomeSink,
) -> OrganizeResult<RunSummary> {
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|idx| format!("srex-worker-{}", idx));
    if let Some(workers) = workers {
        builder = builder.num_threads(workers);
    }
    let pool = builder
        .build()
        .map_err(|e| OrganizeError::WorkerPool(e.to_string()))?;
    debug!(threads = pool.current_num_threads(), "worker pool ready");

    let mut summary = RunSummary {
        unreadable: listing.unreadable,
        ..RunSummary::default()
    };
    let groups = group_by_destination(classifier, listing.files);
    let (sender, receiver) = crossbeam_channel::unbounded::<ClassificationOutcome>();

    std::thread::scope(|scope| {
        scope.spawn(move || {
            pool.install(|| {
                groups.into_par_iter().for_each_with(sender, |sender, group| {
                    for path in group {
                        // The receiver lives until every sender is dropped.
                        let _ = sender.send(classifier.outcome_for(&path));
                    }
                });
            });
        });

        for outcome in receiver.iter() {
            summary.record(&outcome);
            sink.on_outcome(&outcome);
        }
    });

    Ok(summary)
}

/// Groups files that share a destination, keeping listing order.
///
/// Files in one group run one after another, so only one of them can take
/// the destination name.
fn group_by_destination(classifier: &Classifier<'_>, files: Vec<PathBuf>) -> Vec<Vec<PathBuf>> {
    let mut index: HashMap<PathBuf, usize> = HashMap::new();
    let mut groups: Vec<Vec<PathBuf>> = Vec::new();

    for path in files {
        let (_, destination) = classifier.destination_for(&path);
        match index.get(&destination) {
            Some(&slot) => groups[slot].push(path),
            None => {
                index.insert(destination, groups.len());
                groups.push(vec![path]);
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::SkipReason;
    use crate::output::NullSink;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        started: Mutex<Option<u64>>,
        outcomes: Mutex<Vec<ClassificationOutcome>>,
        finished: Mutex<bool>,
    }

    impl OutcomeSink for Recorder {
        fn on_start(&self, total: u64) {
            *self.started.lock().unwrap() = Some(total);
        }

        fn on_outcome(&self, outcome: &ClassificationOutcome) {
            self.outcomes.lock().unwrap().push(outcome.clone());
        }

        fn on_finish(&self, _summary: &RunSummary) {
            *self.finished.lock().unwrap() = true;
        }
    }

    fn populate(root: &Path) {
        fs::create_dir_all(root.join("trip")).unwrap();
        for name in ["a.jpg", "b.pdf", "c.csv", "d.mp4", "e.xyz", "f.TXT"] {
            fs::write(root.join(name), name).unwrap();
        }
        fs::write(root.join("trip").join("g.png"), "g").unwrap();
    }

    fn options(workers: Option<usize>) -> RunOptions {
        RunOptions {
            workers,
            ..RunOptions::default()
        }
    }

    #[test]
    fn test_invalid_root() {
        let organizer = Organizer::new(
            "/non/existent/srex-root",
            CategoryTable::default(),
            RunOptions::default(),
        );
        assert!(matches!(
            organizer.run(&NullSink),
            Err(OrganizeError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let organizer = Organizer::new(&file, CategoryTable::default(), RunOptions::default());
        assert!(matches!(
            organizer.run(&NullSink),
            Err(OrganizeError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn test_empty_root_is_provisioned_and_signalled() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let recorder = Recorder::default();

        let result =
            Organizer::new(temp_dir.path(), CategoryTable::default(), RunOptions::default())
                .run(&recorder);

        match result {
            Err(e @ OrganizeError::EmptyDirectory { .. }) => assert!(!e.is_fatal()),
            other => panic!("expected EmptyDirectory, got {:?}", other),
        }
        assert!(temp_dir.path().join("Images").is_dir());
        assert!(temp_dir.path().join("Others").is_dir());
        assert!(recorder.started.lock().unwrap().is_none());
        assert!(!*recorder.finished.lock().unwrap());
    }

    #[test]
    fn test_sequential_run_reports_every_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        populate(temp_dir.path());
        let recorder = Recorder::default();

        let summary = Organizer::new(temp_dir.path(), CategoryTable::default(), options(Some(1)))
            .run(&recorder)
            .expect("run failed");

        assert_eq!(summary.total, 7);
        assert_eq!(summary.moved, 7);
        assert_eq!(*recorder.started.lock().unwrap(), Some(7));
        assert_eq!(recorder.outcomes.lock().unwrap().len(), 7);
        assert!(*recorder.finished.lock().unwrap());
        assert_eq!(summary.per_category.get("Images"), Some(&2));
        assert_eq!(summary.per_category.get("Others"), Some(&1));
        assert!(temp_dir.path().join("Text").join("f.TXT").exists());
        assert!(temp_dir.path().join("Images").join("g.png").exists());
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let sequential = TempDir::new().expect("Failed to create temp directory");
        let parallel = TempDir::new().expect("Failed to create temp directory");
        populate(sequential.path());
        populate(parallel.path());

        let one = Organizer::new(sequential.path(), CategoryTable::default(), options(Some(1)))
            .run(&NullSink)
            .expect("sequential run failed");
        let many = Organizer::new(parallel.path(), CategoryTable::default(), options(Some(4)))
            .run(&NullSink)
            .expect("parallel run failed");

        assert_eq!(one, many);
        for category in CategoryTable::default().categories() {
            let count = |root: &Path| {
                fs::read_dir(root.join(category))
                    .map(|entries| entries.count())
                    .unwrap_or(0)
            };
            assert_eq!(count(sequential.path()), count(parallel.path()), "{}", category);
        }
    }

    #[test]
    fn test_same_name_files_never_overwrite_in_parallel() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        for dir in ["one", "two", "three"] {
            fs::create_dir_all(root.join(dir)).unwrap();
            fs::write(root.join(dir).join("photo.jpg"), dir).unwrap();
        }

        let summary = Organizer::new(root, CategoryTable::default(), options(Some(3)))
            .run(&NullSink)
            .expect("run failed");

        assert_eq!(summary.moved, 1);
        assert_eq!(summary.skipped, 2);
        let survivors = ["one", "two", "three"]
            .iter()
            .filter(|dir| root.join(dir).join("photo.jpg").exists())
            .count();
        assert_eq!(survivors, 2);
        assert!(root.join("Images").join("photo.jpg").exists());
    }

    #[test]
    fn test_second_run_only_skips() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        populate(temp_dir.path());
        let all = RunOptions {
            recursion: RecursionPolicy::All,
            ..RunOptions::default()
        };
        let organizer = Organizer::new(temp_dir.path(), CategoryTable::default(), all);

        organizer.run(&NullSink).expect("first run failed");
        let recorder = Recorder::default();
        let second = organizer.run(&recorder).expect("second run failed");

        assert_eq!(second.moved, 0);
        assert_eq!(second.skipped, 7);
        assert!(recorder.outcomes.lock().unwrap().iter().all(|o| matches!(
            o,
            ClassificationOutcome::Skipped {
                reason: SkipReason::AlreadyPlaced,
                ..
            }
        )));
    }

    #[test]
    fn test_excluded_path_is_never_classified() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        populate(temp_dir.path());
        let log = temp_dir.path().join("run.log");
        fs::write(&log, "").unwrap();

        let mut organizer =
            Organizer::new(temp_dir.path(), CategoryTable::default(), options(Some(2)));
        organizer.exclude_path(&log);
        let summary = organizer.run(&NullSink).expect("run failed");

        assert_eq!(summary.total, 7);
        assert!(log.exists());
        assert!(!temp_dir.path().join("Others").join("run.log").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        populate(temp_dir.path());
        let dry = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let summary = Organizer::new(temp_dir.path(), CategoryTable::default(), dry)
            .run(&NullSink)
            .expect("dry run failed");

        assert_eq!(summary.planned, 7);
        assert_eq!(summary.moved, 0);
        assert!(temp_dir.path().join("a.jpg").exists());
        assert!(!temp_dir.path().join("Images").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_one_locked_file_does_not_stop_the_rest() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        populate(root);
        let locked = root.join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("stuck.jpg"), "s").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users bypass directory permissions.
        if fs::write(locked.join("write-check"), "x").is_ok() {
            return;
        }

        let result = Organizer::new(root, CategoryTable::default(), options(Some(2))).run(&NullSink);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let summary = result.expect("run failed");

        assert_eq!(summary.total, 8);
        assert_eq!(summary.moved, 7);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].file_name, "stuck.jpg");
        assert!(locked.join("stuck.jpg").exists());
    }

    #[test]
    fn test_from_config_prefers_overrides() {
        let config = OrganizerConfig::from_toml(
            r#"
[run]
recursion = "all"
workers = 2
"#,
        )
        .unwrap();

        let from_file = Organizer::from_config("/tmp", &config, RunOverrides::default()).unwrap();
        assert_eq!(from_file.options().workers, Some(2));
        assert_eq!(from_file.options().recursion, RecursionPolicy::All);

        let overridden = Organizer::from_config(
            "/tmp",
            &config,
            RunOverrides {
                dry_run: true,
                workers: Some(1),
                recursion: Some(RecursionPolicy::TopLevel),
            },
        )
        .unwrap();
        assert!(overridden.options().dry_run);
        assert_eq!(overridden.options().workers, Some(1));
        assert_eq!(overridden.options().recursion, RecursionPolicy::TopLevel);
    }

    #[test]
    fn test_from_config_rejects_zero_workers() {
        let result = Organizer::from_config(
            "/tmp",
            &OrganizerConfig::default(),
            RunOverrides {
                workers: Some(0),
                ..RunOverrides::default()
            },
        );
        assert!(matches!(result, Err(OrganizeError::Config(_))));
    }
}
