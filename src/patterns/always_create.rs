use super::{
    ALWAYS_CREATE_FILE_NAME, HierarchicalPatternMatcher, PatternSource, RealDirectoryPredicate,
    USER_ALWAYS_CREATE_FILE_NAME,
};
use std::path::Path;

/// Directories shared by many programs. Linking one of these wholesale would
/// hand it to a single package.
const BUILTIN_ALWAYS_CREATE_PATTERNS: &[&str] = &[
    "/.config",
    "/.cache",
    "/.ssh",
    "/.gnupg",
    "/.local/share",
    "/.local/bin",
    "/.local/state",
];

/// Rules naming destination directories that must be real directories.
///
/// Patterns are written against destination paths (`.config`, not
/// `dot-config`). A pattern only matches the path it names, so `/.config`
/// does not force `.config/nvim`.
#[derive(Debug)]
pub struct AlwaysCreateRules {
    matcher: HierarchicalPatternMatcher,
}

impl AlwaysCreateRules {
    /// Loads built-in patterns, the user's global `always-create` file, extra
    /// patterns, and the package's own `.always-create`.
    #[must_use]
    pub fn load(
        source_root: &Path,
        user_config_dir: Option<&Path>,
        extra_patterns: &[String],
    ) -> Self {
        let mut matcher = HierarchicalPatternMatcher::new(ALWAYS_CREATE_FILE_NAME, source_root);
        let root = Path::new("");

        matcher.add_lines(root, BUILTIN_ALWAYS_CREATE_PATTERNS, PatternSource::BuiltIn);

        if let Some(config_dir) = user_config_dir {
            let user_file = config_dir.join(USER_ALWAYS_CREATE_FILE_NAME);
            matcher.add_file(root, &user_file, PatternSource::User(user_file.clone()));
        }

        if !extra_patterns.is_empty() {
            matcher.add_lines(root, extra_patterns, PatternSource::Extra);
        }

        let package_file = source_root.join(ALWAYS_CREATE_FILE_NAME);
        matcher.add_file(root, &package_file, PatternSource::Package(package_file.clone()));

        Self { matcher }
    }

    /// Whether the destination directory at `relative_destination_path` must
    /// be created rather than linked.
    #[must_use]
    pub fn must_be_real_directory(&self, relative_destination_path: &Path) -> bool {
        self.matcher.matches(relative_destination_path, true)
    }
}

impl RealDirectoryPredicate for AlwaysCreateRules {
    fn must_be_real_directory(&self, relative_destination_path: &Path) -> bool {
        Self::must_be_real_directory(self, relative_destination_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[rstest]
    #[case(".config", true)]
    #[case(".local/share", true)]
    #[case(".ssh", true)]
    #[case(".config/nvim", false)]
    #[case(".local", false)]
    #[case("sub/.config", false)]
    #[case(".vim", false)]
    fn test_builtin_patterns(#[case] path: &str, #[case] expected: bool) {
        let temp = TempDir::new().unwrap();
        let rules = AlwaysCreateRules::load(temp.path(), None, &[]);
        assert_eq!(rules.must_be_real_directory(Path::new(path)), expected);
    }

    #[test]
    fn test_package_file_adds_and_negates() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(ALWAYS_CREATE_FILE_NAME),
            "# keep these real\n/.vim\n!/.ssh\n",
        )
        .unwrap();
        let rules = AlwaysCreateRules::load(temp.path(), None, &[]);
        assert!(rules.must_be_real_directory(Path::new(".vim")));
        assert!(!rules.must_be_real_directory(Path::new(".ssh")));
        assert!(rules.must_be_real_directory(Path::new(".config")));
    }

    #[test]
    fn test_user_file_and_extra_patterns() {
        let temp = TempDir::new().unwrap();
        let config = TempDir::new().unwrap();
        fs::write(config.path().join(USER_ALWAYS_CREATE_FILE_NAME), "/.emacs.d\n").unwrap();
        let rules = AlwaysCreateRules::load(
            temp.path(),
            Some(config.path()),
            &["/.mozilla".to_string()],
        );
        assert!(rules.must_be_real_directory(Path::new(".emacs.d")));
        assert!(rules.must_be_real_directory(Path::new(".mozilla")));
    }
}
