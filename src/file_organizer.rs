/// File organization system for moving files into category directories.
///
/// An [`Organizer`] scans the top level of a root directory, classifies each
/// visible regular file, resolves name collisions according to a
/// [`ConflictPolicy`] and moves the file into `root/<category>/`. Each file is
/// handled independently: a failure is reported as a [`FileOutcome::Failed`]
/// and counted, and the run carries on with the next file.
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::file_category::{DEFAULT_CATEGORY, ExtensionTable};
use crate::rules::RuleEngine;

/// What to do when the planned destination already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConflictPolicy {
    /// Append `_1`, `_2`, ... to the base name until the name is free.
    #[default]
    Rename,
    /// Leave the source file where it is.
    Skip,
    /// Replace the existing entry.
    Overwrite,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Rename => "rename",
            ConflictPolicy::Skip => "skip",
            ConflictPolicy::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`ConflictPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid conflict resolution '{0}': expected rename, skip or overwrite")]
pub struct ParsePolicyError(pub String);

impl FromStr for ConflictPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rename" => Ok(ConflictPolicy::Rename),
            "skip" => Ok(ConflictPolicy::Skip),
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Errors that can occur during file organization.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    /// The root directory does not exist.
    #[error("path does not exist: {}", .path.display())]
    RootNotFound { path: PathBuf },
    /// The root path exists but is not a directory.
    #[error("path is not a directory: {}", .path.display())]
    RootNotDirectory { path: PathBuf },
    /// The root directory could not be listed.
    #[error("failed to read directory {}: {source}", .path.display())]
    ReadDirFailed { path: PathBuf, source: io::Error },
    /// Failed to create a category directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// Failed to move a file to its destination.
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    FileMoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// The path has no final file name component (e.g. it ends in `..`).
    #[error("path has no file name: {}", .path.display())]
    MissingFileName { path: PathBuf },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Parameters of a single organize run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrganizeOptions {
    /// Report what would happen without touching the filesystem.
    pub dry_run: bool,
    pub conflict_policy: ConflictPolicy,
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub moved: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl RunStats {
    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Moved { .. } => self.moved += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { .. } => self.errored += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.moved + self.skipped + self.errored
    }
}

/// Result of organizing a single file.
#[derive(Debug)]
pub enum FileOutcome {
    /// The file was moved, or would have been in a dry run.
    Moved {
        source: PathBuf,
        destination: PathBuf,
        category: String,
        /// An existing entry was replaced (or would have been).
        overwrote: bool,
        dry_run: bool,
    },
    /// The destination was taken and the policy is [`ConflictPolicy::Skip`].
    Skipped {
        source: PathBuf,
        destination: PathBuf,
    },
    Failed {
        source: PathBuf,
        error: OrganizeError,
    },
}

impl FileOutcome {
    pub fn source(&self) -> &Path {
        match self {
            FileOutcome::Moved { source, .. }
            | FileOutcome::Skipped { source, .. }
            | FileOutcome::Failed { source, .. } => source,
        }
    }
}

/// Where a file should go, after conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    Move { destination: PathBuf, overwrite: bool },
    Skip { destination: PathBuf },
}

/// Organizes the top-level files of a directory into category subdirectories.
///
/// # Examples
///
/// ```no_run
/// use taxon::file_organizer::{OrganizeOptions, Organizer};
///
/// let organizer = Organizer::new("/home/me/Downloads", OrganizeOptions::default())?;
/// let stats = organizer.organize_files()?;
/// println!("moved {}, skipped {}, errored {}", stats.moved, stats.skipped, stats.errored);
/// # Ok::<(), taxon::file_organizer::OrganizeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Organizer {
    root: PathBuf,
    options: OrganizeOptions,
    rules: Option<RuleEngine>,
    extensions: ExtensionTable,
}

impl Organizer {
    /// Creates an organizer for `root`, which must be an existing directory.
    pub fn new(root: impl Into<PathBuf>, options: OrganizeOptions) -> OrganizeResult<Self> {
        let root = root.into();
        if !root.exists() {
            return Err(OrganizeError::RootNotFound { path: root });
        }
        if !root.is_dir() {
            return Err(OrganizeError::RootNotDirectory { path: root });
        }

        Ok(Self {
            root,
            options,
            rules: None,
            extensions: ExtensionTable::default(),
        })
    }

    /// Uses custom rules for classification. An empty engine is ignored and
    /// the built-in extension table stays in effect.
    pub fn with_rules(mut self, engine: RuleEngine) -> Self {
        self.rules = (!engine.is_empty()).then_some(engine);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> OrganizeOptions {
        self.options
    }

    /// Lists the regular files directly under the root, skipping hidden ones.
    ///
    /// The result is sorted so runs are reproducible.
    pub fn discover_files(&self) -> OrganizeResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root).map_err(|e| OrganizeError::ReadDirFailed {
            path: self.root.clone(),
            source: e,
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        tracing::info!(
            root = %self.root.display(),
            count = files.len(),
            "found {} files to organize",
            files.len()
        );
        Ok(files)
    }

    /// Returns the category folder name for a file name.
    ///
    /// Names that are not valid UTF-8 should be passed lossily converted;
    /// the replacement characters never affect the extension lookup.
    pub fn classify(&self, file_name: &str) -> String {
        match &self.rules {
            Some(engine) => engine.target_folder(file_name, DEFAULT_CATEGORY).to_string(),
            None => self
                .extensions
                .categorize(file_name)
                .dir_name()
                .to_string(),
        }
    }

    /// Organizes every discovered file and returns the final counts.
    ///
    /// Only a failure to list the root directory is returned as an error;
    /// per-file failures are counted in [`RunStats::errored`].
    pub fn organize_files(&self) -> OrganizeResult<RunStats> {
        self.organize_files_with(|_| {})
    }

    /// Like [`organize_files`](Self::organize_files), calling `on_outcome`
    /// after each file.
    pub fn organize_files_with<F>(&self, on_outcome: F) -> OrganizeResult<RunStats>
    where
        F: FnMut(&FileOutcome),
    {
        let files = self.discover_files()?;
        Ok(self.organize_paths_with(&files, on_outcome))
    }

    /// Organizes an already discovered list of files, calling `on_outcome`
    /// after each one.
    ///
    /// Lets a caller size a progress display from
    /// [`discover_files`](Self::discover_files) without listing the root twice.
    pub fn organize_paths_with<F>(&self, files: &[PathBuf], mut on_outcome: F) -> RunStats
    where
        F: FnMut(&FileOutcome),
    {
        let mut stats = RunStats::default();
        for file in files {
            let outcome = self.organize_file(file);
            stats.record(&outcome);
            on_outcome(&outcome);
        }

        tracing::info!(
            moved = stats.moved,
            skipped = stats.skipped,
            errored = stats.errored,
            "organize finished"
        );
        stats
    }

    /// Classifies, plans and moves a single file.
    pub fn organize_file(&self, source: &Path) -> FileOutcome {
        match self.try_organize_file(source) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(file = %source.display(), error = %error, "failed to organize file");
                FileOutcome::Failed {
                    source: source.to_path_buf(),
                    error,
                }
            }
        }
    }

    fn try_organize_file(&self, source: &Path) -> OrganizeResult<FileOutcome> {
        let os_name = source
            .file_name()
            .ok_or_else(|| OrganizeError::MissingFileName {
                path: source.to_path_buf(),
            })?;
        let file_name = os_name.to_string_lossy();

        let category = self.classify(&file_name);
        let target_dir = self.root.join(&category);

        let (destination, overwrote) = match self.plan(source, &target_dir, os_name) {
            Placement::Skip { destination } => {
                tracing::warn!(file = %file_name, "skipping, destination already exists");
                return Ok(FileOutcome::Skipped {
                    source: source.to_path_buf(),
                    destination,
                });
            }
            Placement::Move {
                destination,
                overwrite,
            } => (destination, overwrite),
        };

        if overwrote {
            tracing::warn!(file = %file_name, "overwriting existing file");
        }

        let new_name = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.options.dry_run {
            tracing::info!("[dry run] move: {} -> {}/{}", file_name, category, new_name);
        } else {
            fs::create_dir_all(&target_dir).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: target_dir.clone(),
                source: e,
            })?;
            move_file(source, &destination).map_err(|e| OrganizeError::FileMoveFailed {
                from: source.to_path_buf(),
                to: destination.clone(),
                source: e,
            })?;
            tracing::info!("move: {} -> {}/{}", file_name, category, new_name);
        }

        Ok(FileOutcome::Moved {
            source: source.to_path_buf(),
            destination,
            category,
            overwrote,
            dry_run: self.options.dry_run,
        })
    }

    fn plan(&self, source: &Path, target_dir: &Path, file_name: &OsStr) -> Placement {
        let destination = target_dir.join(file_name);
        if !entry_exists(&destination) || destination == source {
            return Placement::Move {
                destination,
                overwrite: false,
            };
        }

        match self.options.conflict_policy {
            ConflictPolicy::Skip => Placement::Skip { destination },
            ConflictPolicy::Overwrite => Placement::Move {
                destination,
                overwrite: true,
            },
            ConflictPolicy::Rename => Placement::Move {
                destination: target_dir.join(unique_file_name(target_dir, file_name)),
                overwrite: false,
            },
        }
    }
}

/// Generates a name that does not exist yet in `dir`.
///
/// Tries `base_1.ext`, `base_2.ext`, ... splitting at the same point as
/// [`split_extension`](crate::file_category::split_extension), so only the
/// last suffix is preserved: `report.tar.gz` becomes `report.tar_1.gz`. The
/// name is handled as raw OS bytes and need not be valid UTF-8.
///
/// # Examples
///
/// ```no_run
/// use taxon::file_organizer::unique_file_name;
/// use std::path::Path;
///
/// // With "photo.jpg" already present in the folder:
/// assert_eq!(unique_file_name(Path::new("/tmp/images"), "photo.jpg"), "photo_1.jpg");
/// ```
pub fn unique_file_name(dir: &Path, file_name: impl AsRef<OsStr>) -> OsString {
    let file_name = file_name.as_ref();
    let name = Path::new(file_name);
    let base = name.file_stem().unwrap_or(file_name);
    let ext = name.extension();

    (1u64..)
        .map(|n| {
            let mut candidate = base.to_os_string();
            candidate.push(format!("_{n}"));
            if let Some(ext) = ext {
                candidate.push(".");
                candidate.push(ext);
            }
            candidate
        })
        .find(|candidate| !entry_exists(&dir.join(candidate)))
        .unwrap_or_else(|| file_name.to_os_string())
}

/// True if anything, including a dangling symlink, occupies `path`.
fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Renames `from` to `to`, copying and deleting when they are on different
/// filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(from = %from.display(), "rename crosses devices, copying instead");
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Rule, RuleKind};
    use std::fs;
    use tempfile::TempDir;

    fn organizer(dir: &TempDir, policy: ConflictPolicy) -> Organizer {
        Organizer::new(
            dir.path(),
            OrganizeOptions {
                dry_run: false,
                conflict_policy: policy,
            },
        )
        .expect("Failed to create organizer")
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let result = Organizer::new("/non/existent/path", OrganizeOptions::default());
        assert!(matches!(result, Err(OrganizeError::RootNotFound { .. })));
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let result = Organizer::new(&file, OrganizeOptions::default());
        assert!(matches!(result, Err(OrganizeError::RootNotDirectory { .. })));
    }

    #[test]
    fn test_discover_skips_hidden_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        fs::write(temp_dir.path().join(".hidden"), "h").unwrap();
        fs::create_dir(temp_dir.path().join("folder.jpg")).unwrap();

        let files = organizer(&temp_dir, ConflictPolicy::Rename)
            .discover_files()
            .unwrap();
        assert_eq!(files, vec![temp_dir.path().join("a.txt")]);
    }

    #[test]
    fn test_classify_uses_rules_when_present() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = RuleEngine::new();
        engine.add_rule(Rule::new("inv", RuleKind::Keyword, "invoice", "finance"));

        let with_rules = organizer(&temp_dir, ConflictPolicy::Rename).with_rules(engine);
        assert_eq!(with_rules.classify("invoice.pdf"), "finance");
        assert_eq!(with_rules.classify("photo.jpg"), "others");

        let without_rules = organizer(&temp_dir, ConflictPolicy::Rename);
        assert_eq!(without_rules.classify("photo.jpg"), "images");
    }

    #[test]
    fn test_empty_rule_engine_falls_back_to_extensions() {
        let temp_dir = TempDir::new().unwrap();
        let organizer = organizer(&temp_dir, ConflictPolicy::Rename).with_rules(RuleEngine::new());
        assert_eq!(organizer.classify("song.mp3"), "audio");
    }

    #[test]
    fn test_unique_file_name_counts_up() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        assert_eq!(unique_file_name(dir, "photo.jpg"), "photo_1.jpg");

        fs::write(dir.join("photo_1.jpg"), "1").unwrap();
        fs::write(dir.join("photo_2.jpg"), "2").unwrap();
        assert_eq!(unique_file_name(dir, "photo.jpg"), "photo_3.jpg");
    }

    #[test]
    fn test_unique_file_name_splits_last_suffix_only() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(
            unique_file_name(temp_dir.path(), "report.tar.gz"),
            "report.tar_1.gz"
        );
        assert_eq!(unique_file_name(temp_dir.path(), "README"), "README_1");
        assert_eq!(unique_file_name(temp_dir.path(), "file."), "file_1.");
    }

    #[test]
    fn test_organize_paths_uses_given_list() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), "a").unwrap();
        fs::write(temp_dir.path().join("b.mp3"), "b").unwrap();

        let organizer = organizer(&temp_dir, ConflictPolicy::Rename);
        let files = organizer.discover_files().unwrap();
        assert_eq!(files.len(), 2);

        // Appears after discovery, so it is not part of this run.
        fs::write(temp_dir.path().join("late.txt"), "c").unwrap();

        let mut seen = Vec::new();
        let stats = organizer.organize_paths_with(&files, |outcome| {
            seen.push(outcome.source().to_path_buf());
        });

        assert_eq!(stats.moved, 2);
        assert_eq!(seen, files);
        assert!(temp_dir.path().join("images").join("a.jpg").exists());
        assert!(temp_dir.path().join("audio").join("b.mp3").exists());
        assert!(temp_dir.path().join("late.txt").exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_file_name_is_organized() {
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.jpg");
        let source = temp_dir.path().join(name);
        fs::write(&source, "new").unwrap();
        fs::create_dir(temp_dir.path().join("images")).unwrap();
        fs::write(temp_dir.path().join("images").join(name), "old").unwrap();

        let stats = organizer(&temp_dir, ConflictPolicy::Rename)
            .organize_files()
            .unwrap();

        assert_eq!(stats.moved, 1);
        assert_eq!(stats.errored, 0);
        assert!(!source.exists());
        let renamed = temp_dir
            .path()
            .join("images")
            .join(OsStr::from_bytes(b"caf\xe9_1.jpg"));
        assert_eq!(fs::read_to_string(renamed).unwrap(), "new");
    }

    #[test]
    fn test_organize_file_moves_into_category() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("notes.txt");
        fs::write(&source, "notes").unwrap();

        let outcome = organizer(&temp_dir, ConflictPolicy::Rename).organize_file(&source);
        match outcome {
            FileOutcome::Moved {
                destination,
                category,
                overwrote,
                dry_run,
                ..
            } => {
                assert_eq!(category, "documents");
                assert_eq!(destination, temp_dir.path().join("documents").join("notes.txt"));
                assert!(!overwrote);
                assert!(!dry_run);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!source.exists());
    }

    #[test]
    fn test_skip_policy_leaves_source() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("documents")).unwrap();
        fs::write(temp_dir.path().join("documents").join("notes.txt"), "old").unwrap();
        let source = temp_dir.path().join("notes.txt");
        fs::write(&source, "new").unwrap();

        let outcome = organizer(&temp_dir, ConflictPolicy::Skip).organize_file(&source);
        assert!(matches!(outcome, FileOutcome::Skipped { .. }));
        assert!(source.exists());
    }

    #[test]
    fn test_self_move_is_not_a_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("stay.txt");
        fs::write(&source, "x").unwrap();

        let mut engine = RuleEngine::new();
        engine.add_rule(Rule::new("here", RuleKind::Keyword, "stay", "."));
        let organizer = organizer(&temp_dir, ConflictPolicy::Skip).with_rules(engine);

        let target_dir = temp_dir.path().join(organizer.classify("stay.txt"));
        let placement = organizer.plan(&source, &target_dir, OsStr::new("stay.txt"));
        assert!(matches!(placement, Placement::Move { overwrite: false, .. }));

        let outcome = organizer.organize_file(&source);
        assert!(matches!(outcome, FileOutcome::Moved { .. }));
        assert!(source.exists());
    }

    #[test]
    fn test_failure_is_reported_not_raised() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".blocker"), "not a dir").unwrap();
        let source = temp_dir.path().join("doomed.txt");
        fs::write(&source, "x").unwrap();

        let mut engine = RuleEngine::new();
        engine.add_rule(Rule::new("doom", RuleKind::Keyword, "doomed", ".blocker/sub"));
        let outcome = organizer(&temp_dir, ConflictPolicy::Rename)
            .with_rules(engine)
            .organize_file(&source);

        assert!(matches!(
            outcome,
            FileOutcome::Failed {
                error: OrganizeError::DirectoryCreationFailed { .. },
                ..
            }
        ));
        assert!(source.exists());
    }

    #[test]
    fn test_conflict_policy_parsing() {
        assert_eq!("rename".parse(), Ok(ConflictPolicy::Rename));
        assert_eq!("SKIP".parse(), Ok(ConflictPolicy::Skip));
        assert_eq!(" overwrite ".parse(), Ok(ConflictPolicy::Overwrite));
        assert!("replace".parse::<ConflictPolicy>().is_err());
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::Rename);
    }

    #[test]
    fn test_run_stats_record() {
        let mut stats = RunStats::default();
        stats.record(&FileOutcome::Skipped {
            source: PathBuf::from("a"),
            destination: PathBuf::from("b"),
        });
        stats.record(&FileOutcome::Failed {
            source: PathBuf::from("c"),
            error: OrganizeError::MissingFileName {
                path: PathBuf::from("c/.."),
            },
        });
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.errored, 1);
        assert_eq!(stats.total(), 2);
    }
}
