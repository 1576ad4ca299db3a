//! Hierarchical gitignore-style pattern matching.
//!
//! Two kinds of pattern files steer the planners:
//!
//! - `.dotxignore` decides which package objects are left out entirely
//!   ([`IgnoreRules`]).
//! - `.always-create` names destination directories that must be real
//!   directories, never symlinks ([`AlwaysCreateRules`]).
//!
//! Both are built on [`HierarchicalPatternMatcher`], which stacks pattern
//! layers from several sources. Later layers take precedence, and within a
//! layer the last matching pattern wins, exactly like nested `.gitignore`
//! files.
//!
//! The planners only see the [`IgnorePredicate`] and [`RealDirectoryPredicate`]
//! traits, which closures also implement.

mod always_create;
mod ignore_rules;

pub use always_create::AlwaysCreateRules;
pub use ignore_rules::IgnoreRules;

use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Per-package ignore file name.
pub const IGNORE_FILE_NAME: &str = ".dotxignore";

/// User-global ignore file name, inside the dotx config directory.
pub const USER_IGNORE_FILE_NAME: &str = "dotxignore";

/// Per-package always-create file name.
pub const ALWAYS_CREATE_FILE_NAME: &str = ".always-create";

/// User-global always-create file name, inside the dotx config directory.
pub const USER_ALWAYS_CREATE_FILE_NAME: &str = "always-create";

/// Decides which source objects a planner leaves out.
pub trait IgnorePredicate {
    /// Whether `path` (absolute, under the package root) should be ignored.
    fn should_ignore(&self, path: &Path) -> bool;

    /// Filters the child directory names of `directory`, keeping those that
    /// are not ignored.
    ///
    /// Batch form of [`should_ignore`](Self::should_ignore) for callers that
    /// filter a whole directory listing at once. The planner walks with
    /// `walkdir` and prunes per entry through `filter_entry` instead, so the
    /// two must agree: implementors override `should_ignore`, not this.
    fn prune_directories(&self, directory: &Path, names: &[OsString]) -> Vec<OsString> {
        names
            .iter()
            .filter(|name| !self.should_ignore(&directory.join(name)))
            .cloned()
            .collect()
    }
}

impl<F> IgnorePredicate for F
where
    F: Fn(&Path) -> bool,
{
    fn should_ignore(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Decides which destination directories must be created for real.
pub trait RealDirectoryPredicate {
    /// Whether the directory at `relative_destination_path` must be a real
    /// directory. Only the path itself is considered, never its ancestors.
    fn must_be_real_directory(&self, relative_destination_path: &Path) -> bool;
}

impl<F> RealDirectoryPredicate for F
where
    F: Fn(&Path) -> bool,
{
    fn must_be_real_directory(&self, relative_destination_path: &Path) -> bool {
        self(relative_destination_path)
    }
}

/// Where a layer of patterns came from, lowest precedence first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    /// Defaults compiled into dotx.
    BuiltIn,
    /// The user's global pattern file.
    User(PathBuf),
    /// Patterns from the config file or the command line.
    Extra,
    /// A pattern file found inside the package.
    Package(PathBuf),
}

impl PatternSource {
    const fn describe(&self) -> &'static str {
        match self {
            Self::BuiltIn => "built-in",
            Self::User(_) => "user config",
            Self::Extra => "extra",
            Self::Package(_) => "package",
        }
    }
}

/// One compiled pattern file.
#[derive(Debug)]
struct Layer {
    /// Directory the patterns are relative to, as a path relative to the
    /// matcher root. Empty for root-level layers.
    base: PathBuf,
    source: PatternSource,
    matcher: Gitignore,
}

/// Stacks gitignore-style pattern layers with increasing precedence.
#[derive(Debug)]
pub struct HierarchicalPatternMatcher {
    /// Name of the pattern file this matcher serves, for log messages.
    filename: String,
    /// Root all layer bases are relative to.
    root: PathBuf,
    layers: Vec<Layer>,
}

impl HierarchicalPatternMatcher {
    /// Creates a matcher with no layers.
    #[must_use]
    pub fn new(filename: &str, root: &Path) -> Self {
        Self {
            filename: filename.to_string(),
            root: root.to_path_buf(),
            layers: Vec::new(),
        }
    }

    /// Adds a layer from in-memory lines, relative to `base`.
    pub fn add_lines<S: AsRef<str>>(&mut self, base: &Path, lines: &[S], source: PatternSource) {
        let mut builder = GitignoreBuilder::new(self.root.join(base));
        let mut count = 0usize;
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match builder.add_line(None, line) {
                Ok(_) => count += 1,
                Err(e) => warn!(
                    "Skipping invalid {} pattern {line:?} in {}: {e}",
                    source.describe(),
                    self.filename
                ),
            }
        }

        match builder.build() {
            Ok(matcher) => {
                debug!(
                    "Loaded {count} {} patterns for {}",
                    source.describe(),
                    self.filename
                );
                self.layers.push(Layer {
                    base: base.to_path_buf(),
                    source,
                    matcher,
                });
            }
            Err(e) => warn!(
                "Failed to compile {} patterns for {}: {e}",
                source.describe(),
                self.filename
            ),
        }
    }

    /// Adds a layer read from `file`. Missing files are skipped quietly and
    /// unreadable ones with a warning; neither is an error.
    pub fn add_file(&mut self, base: &Path, file: &Path, source: PatternSource) {
        if !file.exists() {
            debug!("No {} patterns at {}", source.describe(), file.display());
            return;
        }
        match std::fs::read_to_string(file) {
            Ok(content) => {
                let lines: Vec<&str> = content.lines().collect();
                self.add_lines(base, &lines, source);
            }
            Err(e) => warn!(
                "Failed to load {} patterns from {}: {e}",
                source.describe(),
                file.display()
            ),
        }
    }

    /// Number of loaded layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Sources of the loaded layers, lowest precedence first.
    pub fn sources(&self) -> impl Iterator<Item = &PatternSource> {
        self.layers.iter().map(|layer| &layer.source)
    }

    /// Whether `path` (relative to the matcher root) matches. The highest
    /// precedence layer with an opinion decides; a negated pattern there
    /// un-ignores the path.
    #[must_use]
    pub fn matches(&self, path: &Path, is_dir: bool) -> bool {
        for layer in self.layers.iter().rev() {
            let Ok(relative) = path.strip_prefix(&layer.base) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            match layer.matcher.matched(relative, is_dir) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }
        false
    }
}

/// Finds every file called `filename` under `root`, shallowest first.
fn find_pattern_files(root: &Path, filename: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == filename)
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort_by_key(|path| {
        (
            path.strip_prefix(root)
                .map_or(usize::MAX, |relative| relative.components().count()),
            path.clone(),
        )
    });
    files
}
