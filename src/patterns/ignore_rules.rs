use super::{
    HierarchicalPatternMatcher, IGNORE_FILE_NAME, IgnorePredicate, PatternSource,
    USER_IGNORE_FILE_NAME, find_pattern_files,
};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Patterns every package ignores unless it whitelists them.
const BUILTIN_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    ".DS_Store",
    "*.swp",
    "*~",
    ".dotxignore",
    ".always-create",
];

/// Ignore rules for one package.
///
/// Layers, lowest precedence first: built-in patterns, the user's global
/// `dotxignore`, extra patterns from the config file and command line, then
/// every `.dotxignore` inside the package from the root down.
#[derive(Debug)]
pub struct IgnoreRules {
    source_root: PathBuf,
    matcher: HierarchicalPatternMatcher,
}

impl IgnoreRules {
    /// Loads the rules for the package at `source_root`.
    ///
    /// `user_config_dir` is the dotx config directory holding the global
    /// pattern file, if there is one.
    #[must_use]
    pub fn load(
        source_root: &Path,
        user_config_dir: Option<&Path>,
        extra_patterns: &[String],
    ) -> Self {
        let mut matcher = HierarchicalPatternMatcher::new(IGNORE_FILE_NAME, source_root);
        let root = Path::new("");

        matcher.add_lines(root, BUILTIN_IGNORE_PATTERNS, PatternSource::BuiltIn);

        if let Some(config_dir) = user_config_dir {
            let user_file = config_dir.join(USER_IGNORE_FILE_NAME);
            matcher.add_file(root, &user_file, PatternSource::User(user_file.clone()));
        }

        if !extra_patterns.is_empty() {
            matcher.add_lines(root, extra_patterns, PatternSource::Extra);
        }

        for file in find_pattern_files(source_root, IGNORE_FILE_NAME) {
            let base = file
                .parent()
                .and_then(|dir| dir.strip_prefix(source_root).ok())
                .unwrap_or(root)
                .to_path_buf();
            matcher.add_file(&base, &file, PatternSource::Package(file.clone()));
        }

        debug!(
            "Ignore rules for {}: {:?}",
            source_root.display(),
            matcher.sources().collect::<Vec<_>>()
        );
        Self {
            source_root: source_root.to_path_buf(),
            matcher,
        }
    }

    /// Whether `path` should be left out of the plan.
    ///
    /// Accepts absolute paths under the package root or paths relative to it.
    /// Paths outside the root are never ignored.
    #[must_use]
    pub fn should_ignore(&self, path: &Path) -> bool {
        let (absolute, relative) = if path.is_absolute() {
            match path.strip_prefix(&self.source_root) {
                Ok(relative) => (path.to_path_buf(), relative.to_path_buf()),
                Err(_) => {
                    warn!(
                        "{} is outside package root {}; not ignoring",
                        path.display(),
                        self.source_root.display()
                    );
                    return false;
                }
            }
        } else {
            (self.source_root.join(path), path.to_path_buf())
        };

        if relative.as_os_str().is_empty() {
            return false;
        }
        self.matcher.matches(&relative, absolute.is_dir())
    }
}

impl IgnorePredicate for IgnoreRules {
    fn should_ignore(&self, path: &Path) -> bool {
        Self::should_ignore(self, path)
    }
}
