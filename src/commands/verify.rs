use super::{open_ledger, package_identity};
use crate::DotxContext;
use crate::output;
use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Checks recorded installations against the filesystem, for one package or
/// for every package in the ledger.
///
/// # Errors
///
/// Returns an error if the ledger cannot be read
pub fn execute(ctx: &DotxContext, package: Option<&Path>) -> Result<()> {
    let ledger = open_ledger(ctx)?;

    let targets: Vec<(PathBuf, String)> = match package {
        Some(path) => {
            let identity = package_identity(path)?;
            vec![(identity.package_root, identity.package_name)]
        }
        None => ledger
            .packages()
            .into_iter()
            .map(|summary| (summary.package_root, summary.package_name))
            .collect(),
    };

    if targets.is_empty() {
        output::warning("No packages to verify.");
        return Ok(());
    }

    let mut total_issues = 0;
    for (package_root, package_name) in &targets {
        let issues = ledger.verify(package_root, package_name);
        if issues.is_empty() {
            continue;
        }
        println!("\n{}", format!("{package_name}:").cyan().bold());
        for issue in &issues {
            println!("  {} {}", "✗".red(), issue.record.target_path.display());
            println!("    {}", format!("Issue: {}", issue.issue).dimmed());
            println!(
                "    {}",
                format!("Expected: {}", issue.record.link_type).dimmed()
            );
        }
        total_issues += issues.len();
    }

    if total_issues == 0 {
        output::success("All installations verified successfully.");
    } else {
        output::warning(&format!("Found {total_issues} issue(s)."));
    }
    Ok(())
}
