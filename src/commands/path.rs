//! Queries for scripting: `dotx path <name>` and `dotx which <file>`.
//!
//! Both print bare values on stdout so they compose, e.g.
//! `tree $(dotx path bash)` or `dotx path $(dotx which ~/.bashrc)`.

use super::open_ledger;
use crate::DotxContext;
use crate::ledger::InstallationDb;
use crate::utils::paths::absolute_no_follow;
use crate::utils::{expand_tilde, lenient_canonicalize, make_absolute};
use anyhow::{Result, bail};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prints the source directories of the installed package `name`, one per
/// line.
///
/// # Errors
///
/// Returns an error if no such package is recorded
pub fn execute(ctx: &DotxContext, name: &str, package_root: Option<&Path>) -> Result<()> {
    info!("path command for package: {name}");
    let ledger = open_ledger(ctx)?;

    let package_root = package_root
        .map(|root| -> Result<PathBuf> {
            Ok(lenient_canonicalize(&make_absolute(&expand_tilde(root)?)?))
        })
        .transpose()?;

    let sources = source_roots(&ledger, name, package_root.as_deref());
    if sources.is_empty() {
        match package_root {
            Some(root) => bail!(
                "Package '{name}' not found in package root {}",
                root.display()
            ),
            None => bail!("Package '{name}' not found"),
        }
    }

    for source in sources {
        println!("{}", source.display());
    }
    Ok(())
}

/// Prints the name of the package that installed `file`.
///
/// # Errors
///
/// Returns an error if the file is not recorded in the ledger
pub fn which(ctx: &DotxContext, file: &Path) -> Result<()> {
    info!("which command for file: {}", file.display());
    let ledger = open_ledger(ctx)?;
    let target = absolute_no_follow(&expand_tilde(file)?)?;

    match ledger.find_by_target(&target) {
        Some(record) => {
            println!("{}", record.package_name);
            Ok(())
        }
        None => bail!("File '{}' not managed by any package", file.display()),
    }
}

/// Distinct source package directories recorded under `name`, optionally
/// restricted to one package root.
fn source_roots(ledger: &InstallationDb, name: &str, package_root: Option<&Path>) -> BTreeSet<PathBuf> {
    ledger
        .package_roots(name)
        .into_iter()
        .filter(|root| package_root.is_none_or(|wanted| wanted == root))
        .flat_map(|root| {
            ledger
                .installations(&root, name)
                .into_iter()
                .map(|record| record.source_package_root.clone())
                .collect::<Vec<_>>()
        })
        .collect()
}
