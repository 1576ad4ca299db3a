//! Rebuilding the ledger from the links already present in the target.

use super::{confirm, open_ledger};
use crate::DotxContext;
use crate::ledger::{Ledger, LinkType, PackageId};
use crate::output;
use crate::utils::{expand_tilde, lenient_canonicalize, make_absolute};
use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Scan depth below the target when `--max-depth` is not given.
const DEFAULT_TARGET_DEPTH: usize = 1;

/// Scan depth below `.config` and extra scan paths.
const DEFAULT_NESTED_DEPTH: usize = 3;

/// Options of `dotx sync`.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub max_depth: Option<usize>,
    pub scan_paths: Vec<PathBuf>,
    pub simple: bool,
    pub package_roots: Vec<PathBuf>,
    pub clean: bool,
}

/// A symlink found while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundLink {
    pub link: PathBuf,
    pub is_dir: bool,
}

/// Links grouped by the package directory they point into.
#[derive(Debug, Default)]
pub struct Discovery {
    pub packages: BTreeMap<PathBuf, Vec<FoundLink>>,
    /// Links that are broken or cannot be attributed to a package.
    pub unknown: Vec<FoundLink>,
    pub filtered_out: usize,
}

/// Scans the target for symlinks and records them as installations.
///
/// # Errors
///
/// Returns an error if the ledger cannot be opened or saved, or no answer
/// can be read from the confirmation prompt
pub fn execute(ctx: &DotxContext, options: &SyncOptions) -> Result<()> {
    info!("sync starting");
    ctx.check_target()?;

    let package_roots = options
        .package_roots
        .iter()
        .map(|root| -> Result<PathBuf> {
            Ok(lenient_canonicalize(&make_absolute(&expand_tilde(root)?)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut links = Vec::new();
    for (dir, depth) in scan_plan(&ctx.target, options)? {
        output::info(&format!("Scanning {} (depth {depth})...", dir.display()));
        links.extend(scan_symlinks(&dir, depth));
    }
    // The target scan and the .config scan overlap.
    links.sort_by(|a, b| a.link.cmp(&b.link));
    links.dedup();
    output::success(&format!("Found {} symlink(s)", links.len()));
    if links.is_empty() {
        output::warning("No symlinks found.");
        return Ok(());
    }

    let discovery = group_links(links, &package_roots, ctx.rename_prefix());
    if discovery.filtered_out > 0 {
        output::info(&format!(
            "Filtered out {} symlink(s) not under --package-root",
            discovery.filtered_out
        ));
    }

    let mut ledger = open_ledger(ctx)?;
    if package_roots.is_empty() && ledger.packages().is_empty() {
        output::warning("Warning: No --package-root specified and the ledger is empty.");
        output::warning(
            "  Consider using --package-root to filter packages (e.g., --package-root ~/dotfiles)",
        );
    }

    report(&discovery);

    if ctx.dry_run {
        if options.clean {
            preview_clean(&ledger);
        }
        output::warning("Dry run - no ledger changes made.");
        return Ok(());
    }

    if !confirm(
        ctx,
        "This will record the discovered installations in the ledger. Continue?",
    )? {
        output::warning("Cancelled.");
        return Ok(());
    }

    let mut recorded = 0;
    for (package_path, found) in &discovery.packages {
        let package = PackageId::from_source(package_path);
        for link in found {
            let link_type = if link.is_dir {
                LinkType::Directory
            } else {
                LinkType::File
            };
            ledger
                .record(&package, &link.link, link_type)
                .with_context(|| format!("Failed to record {}", link.link.display()))?;
            debug!("Recorded {} -> {}", link.link.display(), package.package_name);
            recorded += 1;
        }
    }
    output::success(&format!("Recorded {recorded} installation(s) in the ledger."));

    if options.clean {
        let mut cleaned = 0;
        for summary in ledger.packages() {
            let removed = ledger.clean_orphaned(&summary.package_root, &summary.package_name);
            if removed > 0 {
                output::verbose(&format!(
                    "  Cleaned {removed} orphaned entry(ies) from {}",
                    summary.package_name
                ));
            }
            cleaned += removed;
        }
        if cleaned > 0 {
            output::success(&format!("Removed {cleaned} orphaned entry(ies)."));
        } else {
            output::success("No orphaned entries found.");
        }
    }

    ledger.commit().context("Failed to save installation ledger")?;
    info!("sync finished");
    Ok(())
}

/// Directories to scan and how deep: the target itself, its `.config`
/// unless `simple`, and any extra paths.
fn scan_plan(target: &Path, options: &SyncOptions) -> Result<Vec<(PathBuf, usize)>> {
    let mut plan = vec![(
        target.to_path_buf(),
        options.max_depth.unwrap_or(DEFAULT_TARGET_DEPTH),
    )];

    let config_dir = target.join(".config");
    if !options.simple && config_dir.is_dir() && !config_dir.is_symlink() {
        plan.push((
            config_dir,
            options.max_depth.unwrap_or(DEFAULT_NESTED_DEPTH),
        ));
    }

    for path in &options.scan_paths {
        plan.push((
            make_absolute(&expand_tilde(path)?)?,
            options.max_depth.unwrap_or(DEFAULT_NESTED_DEPTH),
        ));
    }
    Ok(plan)
}

/// Symlinks in `dir`, descending at most `max_depth` real directories
/// below it. Symlinked directories are reported, never entered.
pub fn scan_symlinks(dir: &Path, max_depth: usize) -> Vec<FoundLink> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth + 1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping during scan: {e}");
                None
            }
        })
        .filter(walkdir::DirEntry::path_is_symlink)
        .map(|entry| FoundLink {
            is_dir: entry.path().is_dir(),
            link: entry.into_path(),
        })
        .collect()
}

/// Groups links by the package they point into.
///
/// Under a package root, the package is the root's child that holds the link
/// target. Without package roots it is the target's parent directory, moved
/// up past renamed directories (`dot-config`) so that a link into
/// `pkg/dot-config/app` is attributed to `pkg`.
pub fn group_links(links: Vec<FoundLink>, package_roots: &[PathBuf], rename_prefix: &str) -> Discovery {
    let mut discovery = Discovery::default();

    for link in links {
        let Ok(resolved) = link.link.canonicalize() else {
            debug!("Broken symlink: {}", link.link.display());
            discovery.unknown.push(link);
            continue;
        };

        let package = if package_roots.is_empty() {
            guess_package(&resolved, rename_prefix)
        } else {
            match package_under_roots(&resolved, package_roots) {
                Some(package) => Some(package),
                None => {
                    debug!(
                        "Filtered out {} (not under --package-root)",
                        resolved.display()
                    );
                    discovery.filtered_out += 1;
                    continue;
                }
            }
        };

        match package {
            Some(package) => discovery.packages.entry(package).or_default().push(link),
            None => discovery.unknown.push(link),
        }
    }

    discovery
}

fn package_under_roots(resolved: &Path, package_roots: &[PathBuf]) -> Option<PathBuf> {
    package_roots.iter().find_map(|root| {
        let first = resolved.strip_prefix(root).ok()?.components().next()?;
        Some(root.join(first))
    })
}

fn guess_package(resolved: &Path, rename_prefix: &str) -> Option<PathBuf> {
    let mut package = resolved.parent()?;
    while package
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(rename_prefix))
    {
        package = package.parent()?;
    }
    Some(package.to_path_buf())
}

fn report(discovery: &Discovery) {
    output::header(&format!(
        "Discovered {} potential package(s):",
        discovery.packages.len()
    ));
    for (package, links) in &discovery.packages {
        eprintln!("  {}", package.display().to_string().cyan());
        eprintln!("    {} symlink(s)", links.len());
    }
    if !discovery.unknown.is_empty() {
        output::warning(&format!(
            "  Unknown/broken: {} symlink(s)",
            discovery.unknown.len()
        ));
    }
}

fn preview_clean(ledger: &crate::ledger::InstallationDb) {
    output::info("Would clean orphaned entries:");
    let mut total = 0;
    for summary in ledger.packages() {
        let orphaned = ledger.orphaned(&summary.package_root, &summary.package_name);
        if !orphaned.is_empty() {
            total += orphaned.len();
            eprintln!(
                "  {}: {} orphaned entry(ies)",
                summary.package_name,
                orphaned.len()
            );
        }
    }
    if total > 0 {
        output::warning(&format!("Would remove {total} orphaned entry(ies)."));
    } else {
        output::success("No orphaned entries to clean.");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        dotfiles: PathBuf,
        home: PathBuf,
    }

    fn fixture() -> Result<Fixture> {
        let temp = TempDir::new()?;
        let root = temp.path().canonicalize()?;
        let dotfiles = root.join("dotfiles");
        let home = root.join("home");
        fs::create_dir_all(dotfiles.join("bash"))?;
        fs::create_dir_all(dotfiles.join("nvim/dot-config/nvim"))?;
        fs::create_dir_all(home.join(".config"))?;
        fs::write(dotfiles.join("bash/dot-bashrc"), "")?;
        symlink(dotfiles.join("bash/dot-bashrc"), home.join(".bashrc"))?;
        symlink(
            dotfiles.join("nvim/dot-config/nvim"),
            home.join(".config/nvim"),
        )?;
        symlink(root.join("nowhere"), home.join(".broken"))?;
        Ok(Fixture {
            _temp: temp,
            dotfiles,
            home,
        })
    }

    #[test]
    fn test_scan_respects_depth() -> Result<()> {
        let fx = fixture()?;
        let shallow = scan_symlinks(&fx.home, 0);
        let names: Vec<_> = shallow.iter().map(|l| l.link.clone()).collect();
        assert_eq!(names, vec![fx.home.join(".bashrc"), fx.home.join(".broken")]);

        let deeper = scan_symlinks(&fx.home, 1);
        assert_eq!(deeper.len(), 3);
        let nvim = deeper
            .iter()
            .find(|l| l.link.ends_with(".config/nvim"))
            .unwrap();
        assert!(nvim.is_dir);
        Ok(())
    }

    #[test]
    fn test_group_by_package_root() -> Result<()> {
        let fx = fixture()?;
        let links = scan_symlinks(&fx.home, 1);
        let discovery = group_links(links, std::slice::from_ref(&fx.dotfiles), "dot-");

        let packages: Vec<_> = discovery.packages.keys().cloned().collect();
        assert_eq!(packages, vec![fx.dotfiles.join("bash"), fx.dotfiles.join("nvim")]);
        assert_eq!(discovery.unknown.len(), 1);
        assert_eq!(discovery.filtered_out, 0);
        Ok(())
    }

    #[test]
    fn test_group_without_roots_skips_renamed_dirs() -> Result<()> {
        let fx = fixture()?;
        let links = scan_symlinks(&fx.home, 1);
        let discovery = group_links(links, &[], "dot-");

        assert!(discovery.packages.contains_key(&fx.dotfiles.join("bash")));
        assert!(discovery.packages.contains_key(&fx.dotfiles.join("nvim")));
        Ok(())
    }

    #[test]
    fn test_links_outside_roots_are_filtered() -> Result<()> {
        let fx = fixture()?;
        let links = scan_symlinks(&fx.home, 1);
        let elsewhere = fx.home.join("elsewhere");
        let discovery = group_links(links, &[elsewhere], "dot-");

        assert!(discovery.packages.is_empty());
        assert_eq!(discovery.filtered_out, 2);
        Ok(())
    }

    #[test]
    fn test_scan_plan_defaults() -> Result<()> {
        let fx = fixture()?;
        let plan = scan_plan(&fx.home, &SyncOptions::default())?;
        assert_eq!(
            plan,
            vec![(fx.home.clone(), 1), (fx.home.join(".config"), 3)]
        );

        let simple = SyncOptions {
            simple: true,
            max_depth: Some(2),
            ..SyncOptions::default()
        };
        assert_eq!(scan_plan(&fx.home, &simple)?, vec![(fx.home.clone(), 2)]);
        Ok(())
    }
}
