use super::{open_ledger, package_identity};
use crate::DotxContext;
use crate::output::{self, Align, Table};
use crate::utils::formatters::{format_path, format_timestamp};
use anyhow::Result;
use colored::{Color, Colorize};
use std::path::Path;

/// Shows every recorded installation of one package.
///
/// # Errors
///
/// Returns an error if the ledger cannot be read
pub fn execute(ctx: &DotxContext, package: &Path) -> Result<()> {
    let identity = package_identity(package)?;
    let ledger = open_ledger(ctx)?;
    if !ledger.package_exists(&identity.package_root, &identity.package_name) {
        output::warning(&format!(
            "No installations found for {}",
            identity.package_name
        ));
        return Ok(());
    }

    let installations = ledger.installations(&identity.package_root, &identity.package_name);
    let home = dirs::home_dir();
    println!("{} {}", "Package:".cyan().bold(), identity.package_name);
    println!(
        "{} {}",
        "Source:".cyan().bold(),
        format_path(&identity.source_package_root, home.as_deref())
    );
    println!(
        "{} {}",
        "Installed files:".cyan().bold(),
        installations.len()
    );
    println!();

    let mut table = Table::new()
        .column("Target Path", Align::Left, Some(Color::Cyan))
        .column("Type", Align::Left, Some(Color::Yellow))
        .column("Installed At", Align::Left, Some(Color::Green));
    for record in installations {
        table.add_row(vec![
            format_path(&record.target_path, home.as_deref()),
            record.link_type.to_string(),
            format_timestamp(&record.installed_at),
        ]);
    }
    table.print();
    Ok(())
}
