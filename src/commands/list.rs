use super::open_ledger;
use crate::DotxContext;
use crate::ledger::PackageSummary;
use crate::output::{self, Align, Table};
use crate::utils::formatters::{
    format_relative_time, format_timestamp, pluralize, truncate_with_ellipsis,
};
use anyhow::Result;
use colored::Color;

const NAME_WIDTH: usize = 40;

/// Lists installed packages as a table, or as `dotx install` commands that
/// would reinstall them.
///
/// # Errors
///
/// Returns an error if the ledger cannot be read
pub fn execute(ctx: &DotxContext, as_commands: bool) -> Result<()> {
    let ledger = open_ledger(ctx)?;
    let packages = ledger.packages();

    if packages.is_empty() {
        output::warning("No packages installed.");
        return Ok(());
    }

    if as_commands {
        for line in reinstall_commands(&packages) {
            println!("{line}");
        }
        return Ok(());
    }

    let mut table = Table::new()
        .column("Package", Align::Left, Some(Color::Cyan))
        .column("Files", Align::Right, Some(Color::Magenta))
        .column("Last Install", Align::Left, Some(Color::Green))
        .column("", Align::Left, None);
    for package in &packages {
        table.add_row(vec![
            truncate_with_ellipsis(&package.package_name, NAME_WIDTH),
            package.file_count.to_string(),
            format_timestamp(&package.latest_install),
            format!("({})", format_relative_time(&package.latest_install)),
        ]);
    }

    output::header("Installed Packages");
    table.print();
    output::info(&format!(
        "Total: {}",
        pluralize(packages.len(), "package", "packages")
    ));
    Ok(())
}

/// One `dotx install <root>/<name>` line per package.
fn reinstall_commands(packages: &[PackageSummary]) -> Vec<String> {
    packages
        .iter()
        .map(|package| {
            format!(
                "dotx install {}",
                package.package_root.join(&package.package_name).display()
            )
        })
        .collect()
}
