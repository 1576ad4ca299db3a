//! Install and uninstall planners.
//!
//! Both planners start from the same skeleton built by
//! [`plan_install_paths`], then inspect the destination to decide what to do
//! with each object. Neither touches the filesystem beyond reading it; the
//! resulting [`Plan`](crate::plan::Plan) is applied by
//! [`execute_plan`](crate::plan::execute::execute_plan).

mod install;
mod uninstall;

pub use install::{plan_install, plan_install_paths};
pub use uninstall::plan_uninstall;

use crate::patterns::{IgnorePredicate, RealDirectoryPredicate};
use crate::plan::{Plan, is_root};
use std::path::{Path, PathBuf};

/// Default prefix marking names to install with a leading dot.
pub const DEFAULT_RENAME_PREFIX: &str = "dot-";

/// The collaborators a planner consults.
#[derive(Clone, Copy)]
pub struct PlanRules<'a> {
    /// Which source objects to leave out.
    pub ignore: &'a dyn IgnorePredicate,
    /// Which destination directories must be created rather than linked.
    pub always_create: &'a dyn RealDirectoryPredicate,
    /// Name prefix replaced by `.` at the destination.
    pub rename_prefix: &'a str,
}

impl<'a> PlanRules<'a> {
    /// Rules using the default rename prefix.
    #[must_use]
    pub fn new(
        ignore: &'a dyn IgnorePredicate,
        always_create: &'a dyn RealDirectoryPredicate,
    ) -> Self {
        Self {
            ignore,
            always_create,
            rename_prefix: DEFAULT_RENAME_PREFIX,
        }
    }

    /// Replaces the rename prefix.
    #[must_use]
    pub fn with_rename_prefix(mut self, rename_prefix: &'a str) -> Self {
        self.rename_prefix = rename_prefix;
        self
    }
}

/// Ignores nothing and never forces a real directory.
pub fn permissive_predicate(_: &Path) -> bool {
    false
}

/// Keys of the directories a walk of `source_root` actually enters, in
/// ascending order with the root first. Symlinked source directories are
/// planned as leaves and not included.
pub(crate) fn walked_directories(source_root: &Path, plan: &Plan) -> Vec<PathBuf> {
    plan.iter()
        .filter(|(key, node)| {
            is_root(key) || (node.is_dir && !source_root.join(key).is_symlink())
        })
        .map(|(key, _)| key.clone())
        .collect()
}
