use super::{PlanRules, plan_install_paths, walked_directories};
use crate::error::Result;
use crate::plan::{Action, Plan, is_root, log_extracted_plan, mark_all_descendants};
use std::path::Path;
use tracing::{Level, info};

/// Plans removing the package at `source_root` from `destination_root`.
///
/// Directories are visited top-down, skipping any already marked `Skip`.
/// Children that are not walked themselves (files, and symlinked source
/// directories) are marked `Unlink` when their destination is a symlink.
/// A directory whose destination does not resolve becomes `Skip`; one whose
/// destination is a live symlink becomes `Unlink`. Either way its descendants are
/// skipped, since there is nothing below it left to remove by hand. A real
/// destination directory stays `Unset` and is walked into.
///
/// # Errors
///
/// Returns an error if `source_root` is not a readable directory.
pub fn plan_uninstall(
    source_root: &Path,
    destination_root: &Path,
    rules: &PlanRules<'_>,
) -> Result<Plan> {
    info!(
        "Planning uninstall of {} from {}",
        source_root.display(),
        destination_root.display()
    );
    let mut plan = plan_install_paths(source_root, rules)?;
    let directories = walked_directories(source_root, &plan);

    for directory in &directories {
        if plan.action(directory) == Some(Action::Skip) {
            continue;
        }

        for child in plan.children(directory) {
            if directories.binary_search(&child).is_ok() {
                continue;
            }
            let Some(node) = plan.get(&child) else {
                continue;
            };
            if destination_root
                .join(&node.relative_destination_path)
                .is_symlink()
            {
                plan.set_action(&child, Action::Unlink);
            }
        }

        if is_root(directory) {
            continue;
        }
        let Some(node) = plan.get(directory) else {
            continue;
        };
        let destination = destination_root.join(&node.relative_destination_path);
        let action = if !destination.exists() {
            Some(Action::Skip)
        } else if destination.is_symlink() {
            Some(Action::Unlink)
        } else {
            None
        };

        if let Some(action) = action {
            plan.set_action(directory, action);
            mark_all_descendants(directory, Action::Skip, &[Action::Unset], &mut plan);
        }
    }

    plan.remove_root();
    log_extracted_plan(
        &plan,
        Some("uninstall"),
        Level::DEBUG,
        &[Action::Unlink],
        |node| node.to_string(),
    );
    Ok(plan)
}
