use super::{PackagePlan, execute_plans, plan_packages};
use crate::DotxContext;
use crate::output;
use crate::plan::execute::ExecutionSummary;
use crate::plan::{Action, extract_plan, log_extracted_plan};
use crate::planner::plan_install;
use anyhow::{Result, bail};
use std::path::PathBuf;
use tracing::{Level, info};

/// Installs every package, or none of them if any would overwrite
/// something already at the target.
///
/// # Errors
///
/// Returns an error if:
/// - The target directory or a package does not exist
/// - Any package has conflicts (nothing is changed then)
/// - A filesystem operation fails
pub fn execute(ctx: &DotxContext, packages: &[PathBuf]) -> Result<()> {
    info!("install starting");
    ctx.check_target()?;

    let plans = plan_packages(ctx, packages, plan_install)?;
    for package_plan in &plans {
        log_extracted_plan(
            &package_plan.plan,
            Some(&format!(
                "Actual plan to install {}",
                package_plan.source.display()
            )),
            Level::DEBUG,
            &[Action::Link, Action::Create],
            |node| node.to_string(),
        );
    }

    if report_conflicts(ctx, &plans) {
        bail!("Refusing to install - conflicts detected");
    }

    let summary = execute_plans(ctx, &plans, "Installing", &[Action::Link, Action::Create])?;
    let message = summary_message(&summary, plans.len());
    if ctx.dry_run {
        output::info(&format!("Dry run: would have {}", lowercase_first(&message)));
    } else {
        output::success(&message);
    }

    info!("install finished");
    Ok(())
}

/// Prints the `Fail` nodes of every plan; returns whether there were any.
fn report_conflicts(ctx: &DotxContext, plans: &[PackagePlan]) -> bool {
    let mut conflicts = false;
    for package_plan in plans {
        let failures = extract_plan(&package_plan.plan, &[Action::Fail]);
        if failures.is_empty() {
            continue;
        }
        conflicts = true;
        output::error(&format!(
            "can't install {} - would overwrite:",
            package_plan.package.package_name
        ));
        for node in failures {
            eprintln!(
                "  {}",
                ctx.target.join(&node.relative_destination_path).display()
            );
        }
        eprintln!();
    }
    conflicts
}

fn summary_message(summary: &ExecutionSummary, package_count: usize) -> String {
    let mut parts = Vec::new();
    if summary.linked_files > 0 {
        parts.push(format!("{} file(s)", summary.linked_files));
    }
    if summary.dirs() > 0 {
        parts.push(format!("{} dir(s)", summary.dirs()));
    }
    let installed = if parts.is_empty() {
        "nothing".to_string()
    } else {
        parts.join(" and ")
    };
    format!("Installed {installed} from {package_count} package(s)")
}

fn lowercase_first(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}
