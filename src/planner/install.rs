use super::{PlanRules, walked_directories};
use crate::error::{DotxError, Result};
use crate::patterns::RealDirectoryPredicate;
use crate::plan::{
    Action, Plan, PlanNode, is_root, join_key, log_extracted_plan, mark_all_ancestors,
    mark_immediate_children, parent_key,
};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{Level, debug, info, warn};
use walkdir::WalkDir;

/// Plans installing the package at `source_root` into `destination_root`.
///
/// The skeleton from [`plan_install_paths`] is visited bottom-up. Each
/// directory first fails any child whose destination is a regular file, then
/// decides its own action:
///
/// 1. the package root always `Exists`;
/// 2. a destination that already exists is `Exists`, and so are its ancestors;
/// 3. a directory with a child to rename, or one already forced by a
///    descendant, is `Create`, and so are its ancestors up to the first
///    `Exists`;
/// 4. a destination the always-create rules name is `Create` the same way;
/// 5. anything else is `Link`ed as a whole.
///
/// `Create` and `Exists` turn undecided children into `Link`. `Link` turns
/// undecided and linked children into `Skip`, since the parent's link covers
/// them.
///
/// # Errors
///
/// Returns an error if `source_root` is not a readable directory.
pub fn plan_install(source_root: &Path, destination_root: &Path, rules: &PlanRules<'_>) -> Result<Plan> {
    info!(
        "Planning install of {} into {}",
        source_root.display(),
        destination_root.display()
    );
    let mut plan = plan_install_paths(source_root, rules)?;

    for directory in walked_directories(source_root, &plan).iter().rev() {
        decide_directory(directory, destination_root, rules.always_create, &mut plan);
    }

    plan.remove_root();
    log_extracted_plan(
        &plan,
        Some("install"),
        Level::DEBUG,
        &[Action::Create, Action::Link, Action::Fail],
        |node| node.to_string(),
    );
    Ok(plan)
}

fn decide_directory(
    directory: &Path,
    destination_root: &Path,
    always_create: &dyn RealDirectoryPredicate,
    plan: &mut Plan,
) {
    let mut found_children_to_rename = false;
    for child in plan.children(directory) {
        let Some(node) = plan.get(&child) else {
            continue;
        };
        found_children_to_rename |= node.requires_rename;
        let destination = destination_root.join(&node.relative_destination_path);
        if blocks_install(&destination, node.is_dir) {
            debug!("Conflict: {} already exists", destination.display());
            plan.set_action(&child, Action::Fail);
        }
    }

    let Some(node) = plan.get(directory) else {
        return;
    };
    let relative_destination = node.relative_destination_path.clone();
    let forced_by_descendant = node.action == Action::Create;

    let action = if is_root(directory) {
        Action::Exists
    } else if destination_root.join(&relative_destination).exists() {
        mark_all_ancestors(directory, Action::Exists, Action::Exists, plan);
        Action::Exists
    } else if found_children_to_rename
        || forced_by_descendant
        || always_create.must_be_real_directory(&relative_destination)
    {
        mark_all_ancestors(directory, Action::Create, Action::Exists, plan);
        Action::Create
    } else {
        Action::Link
    };
    plan.set_action(directory, action);

    match action {
        Action::Create | Action::Exists => {
            mark_immediate_children(directory, Action::Link, &[Action::Unset], plan);
        }
        Action::Link => {
            mark_immediate_children(
                directory,
                Action::Skip,
                &[Action::Unset, Action::Link],
                plan,
            );
        }
        _ => {}
    }
}

/// Whether whatever sits at `destination` stops a source object from being
/// installed there. Symlinks are not followed: a file can only be linked
/// where nothing exists, not even a dangling or identical link. A directory
/// can move into anything that resolves to a directory.
fn blocks_install(destination: &Path, is_dir: bool) -> bool {
    if destination.symlink_metadata().is_err() {
        return false;
    }
    !is_dir || !destination.is_dir()
}

/// Builds the plan skeleton for the package at `source_root`.
///
/// Walks the package top-down, leaving out (and not descending into) whatever
/// the ignore rules reject. Every node starts `Unset` except the bootstrap
/// root, which `Exists`. Names starting with the rename prefix get a leading
/// `.` instead, in the last component only; parents are visited first so a
/// renamed parent's destination is already known.
///
/// # Errors
///
/// Returns an error if `source_root` is not a readable directory.
pub fn plan_install_paths(source_root: &Path, rules: &PlanRules<'_>) -> Result<Plan> {
    let metadata = fs::metadata(source_root).map_err(|e| DotxError::io(source_root, e))?;
    if !metadata.is_dir() {
        return Err(DotxError::io(
            source_root,
            io::Error::new(io::ErrorKind::NotADirectory, "package is not a directory"),
        ));
    }

    let mut plan = Plan::with_root();
    let walker = WalkDir::new(source_root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !rules.ignore.should_ignore(entry.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {e}", source_root.display());
                continue;
            }
        };
        let Ok(relative_source) = entry.path().strip_prefix(source_root) else {
            continue;
        };
        let Some(parent) = parent_key(relative_source) else {
            continue;
        };
        let Some(parent_destination) = plan
            .get(&parent)
            .map(|node| node.relative_destination_path.clone())
        else {
            continue;
        };

        let name = entry.file_name();
        let renamed = name
            .to_str()
            .filter(|_| !rules.rename_prefix.is_empty())
            .and_then(|name| name.strip_prefix(rules.rename_prefix))
            .map(|rest| format!(".{rest}"));
        let requires_rename = renamed.is_some();
        let relative_destination = match renamed {
            Some(renamed) => join_key(&parent_destination, renamed),
            None => join_key(&parent_destination, name),
        };

        plan.insert(PlanNode::new(
            requires_rename,
            relative_source.to_path_buf(),
            relative_destination,
            entry.path().is_dir(),
        ));
    }

    log_extracted_plan(
        &plan,
        Some("planned (un)install paths"),
        Level::TRACE,
        &[Action::Unset],
        |node| {
            format!(
                "{} -> {}",
                node.relative_source_path.display(),
                node.relative_destination_path.display()
            )
        },
    );
    Ok(plan)
}
