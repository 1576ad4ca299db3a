use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Expands tilde in path to home directory
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    if let Some(path_str) = path.to_str() {
        if path_str == "~" {
            return dirs::home_dir().context("Could not find home directory");
        }
        if let Some(rest) = path_str.strip_prefix("~/") {
            let home = dirs::home_dir().context("Could not find home directory")?;
            return Ok(home.join(rest));
        }
    }
    Ok(path.to_path_buf())
}

/// Makes a path absolute, resolving relative paths from current directory
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined
pub fn make_absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir = std::env::current_dir().context("Could not read current directory")?;
        Ok(current_dir.join(path))
    }
}

/// Makes a path absolute and removes `.` and `..` components without
/// following symlinks. Used for paths that may themselves be symlinks.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined
pub fn absolute_no_follow(path: &Path) -> Result<PathBuf> {
    Ok(normalize_lexically(&make_absolute(path)?))
}

/// Removes `.` and `..` components without touching the filesystem.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `..` at the root is the root
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Canonicalizes `path`, tolerating a missing tail.
///
/// The longest existing ancestor is resolved and the remaining components are
/// appended untouched. Dry runs plan links into directories that were never
/// created, so the destination cannot always be resolved fully.
#[must_use]
pub fn lenient_canonicalize(path: &Path) -> PathBuf {
    let absolute = make_absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let absolute = normalize_lexically(&absolute);

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(resolved) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(resolved, |acc: PathBuf, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

/// Computes the target to store in a symlink at `link` pointing at `source`.
///
/// Both paths should already be resolved. A relative target is returned when
/// the two share a common ancestor other than the filesystem root, so the
/// link survives moving the whole tree. Otherwise `source` is returned as is.
#[must_use]
pub fn symlink_target(source: &Path, link: &Path) -> PathBuf {
    let Some(link_dir) = link.parent() else {
        return source.to_path_buf();
    };

    let source_parts: Vec<Component<'_>> = source.components().collect();
    let link_parts: Vec<Component<'_>> = link_dir.components().collect();
    let common = source_parts
        .iter()
        .zip(&link_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let shares_more_than_root = source_parts[..common]
        .iter()
        .any(|component| matches!(component, Component::Normal(_)));
    if !shares_more_than_root {
        return source.to_path_buf();
    }

    let mut target = PathBuf::new();
    for _ in common..link_parts.len() {
        target.push("..");
    }
    for component in &source_parts[common..] {
        target.push(component);
    }
    target
}

/// Returns the XDG config home: `$XDG_CONFIG_HOME`, else `~/.config`
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined
pub fn xdg_config_home() -> Result<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Returns the XDG data home: `$XDG_DATA_HOME`, else `~/.local/share`
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined
pub fn xdg_data_home() -> Result<PathBuf> {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

fn xdg_dir(variable: &str, fallback: &str) -> Result<PathBuf> {
    if let Some(value) = std::env::var_os(variable)
        && !value.is_empty()
        && Path::new(&value).is_absolute()
    {
        return Ok(PathBuf::from(value));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(fallback))
}

/// Ensures parent directories exist for a given path
///
/// # Errors
///
/// Returns an error if the parent directories cannot be created
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create parent directories for {}", path.display())
        })?;
    }
    Ok(())
}
