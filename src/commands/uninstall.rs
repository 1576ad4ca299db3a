use super::{execute_plans, plan_packages};
use crate::DotxContext;
use crate::output;
use crate::plan::{Action, log_extracted_plan};
use crate::planner::plan_uninstall;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{Level, info};

/// Removes the links each package installed. Anything at the target that is
/// not a symlink is left alone.
///
/// # Errors
///
/// Returns an error if:
/// - The target directory or a package does not exist
/// - A link cannot be removed
pub fn execute(ctx: &DotxContext, packages: &[PathBuf]) -> Result<()> {
    info!("uninstall starting");
    ctx.check_target()?;

    let plans = plan_packages(ctx, packages, plan_uninstall)?;
    for package_plan in &plans {
        log_extracted_plan(
            &package_plan.plan,
            Some(&format!(
                "Actual plan to uninstall {}",
                package_plan.source.display()
            )),
            Level::DEBUG,
            &[Action::Unlink],
            |node| node.to_string(),
        );
    }

    let summary = execute_plans(ctx, &plans, "Uninstalling", &[Action::Unlink])?;
    if ctx.dry_run {
        output::info(&format!(
            "Dry run: would have removed {} symlink(s) from {} package(s)",
            summary.removed_links,
            plans.len()
        ));
    } else {
        output::success(&format!(
            "Removed {} symlink(s) from {} package(s)",
            summary.removed_links,
            plans.len()
        ));
    }

    info!("uninstall finished");
    Ok(())
}
