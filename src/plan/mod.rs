//! Install and uninstall plans.
//!
//! A planner walks a package tree and builds a [`Plan`]: one [`PlanNode`] per
//! file-system object, keyed by its path relative to the package root. As the
//! planner learns about the destination it marks nodes with an [`Action`].
//! Marking a directory can constrain its children, and marking a child can
//! force every ancestor up the chain, so the marking helpers live here while
//! the decision of *what* to mark belongs to the planners.
//!
//! Parent/child relationships are never stored. They are derived from the
//! keys: the plan is ordered by path and every directory's descendants sort
//! directly after it.

pub mod execute;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use tracing::{Level, event};

/// Key of the synthetic node standing for the package root itself.
pub const ROOT: &str = ".";

/// What a plan intends to do with one file-system object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Not decided yet. Only planners ever see this value.
    Unset,
    /// Nothing to do because an ancestor is linked or unlinked as a unit.
    Skip,
    /// Install with a single symlink.
    Link,
    /// The directory cannot be linked and must be made for real.
    Create,
    /// The directory already exists at the destination.
    Exists,
    /// Remove the symlink at the destination.
    Unlink,
    /// A regular file at the destination blocks the install.
    Fail,
}

impl Action {
    /// Lowercase name used in logs and dry-run listings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Skip => "skip",
            Self::Link => "link",
            Self::Create => "create",
            Self::Exists => "exists",
            Self::Unlink => "unlink",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to install or uninstall a single file-system object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanNode {
    /// What the plan will do with this object.
    pub action: Action,
    /// `true` when the source name carries the rename prefix, e.g. a source
    /// of `dot-bashrc` installed as `.bashrc`.
    pub requires_rename: bool,
    /// Path of the source object relative to the package root.
    pub relative_source_path: PathBuf,
    /// Path of the installed object relative to the destination root.
    pub relative_destination_path: PathBuf,
    /// Whether the source object is a directory (symlinks followed).
    pub is_dir: bool,
}

impl PlanNode {
    /// Creates an undecided node.
    #[must_use]
    pub fn new(
        requires_rename: bool,
        relative_source_path: PathBuf,
        relative_destination_path: PathBuf,
        is_dir: bool,
    ) -> Self {
        Self {
            action: Action::Unset,
            requires_rename,
            relative_source_path,
            relative_destination_path,
            is_dir,
        }
    }

    /// The bootstrap node for the package root.
    #[must_use]
    pub fn root() -> Self {
        Self {
            action: Action::Exists,
            requires_rename: false,
            relative_source_path: PathBuf::from(ROOT),
            relative_destination_path: PathBuf::from(ROOT),
            is_dir: true,
        }
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.action,
            self.relative_source_path.display(),
            self.relative_destination_path.display()
        )
    }
}

/// Joins `name` under a plan key, treating the root key as empty.
#[must_use]
pub fn join_key(parent: &Path, name: impl AsRef<Path>) -> PathBuf {
    if is_root(parent) {
        name.as_ref().to_path_buf()
    } else {
        parent.join(name)
    }
}

/// Returns the plan key of `path`'s parent, or `None` for the root itself.
#[must_use]
pub fn parent_key(path: &Path) -> Option<PathBuf> {
    if is_root(path) {
        return None;
    }
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Some(PathBuf::from(ROOT)),
        Some(parent) => Some(parent.to_path_buf()),
        None => Some(PathBuf::from(ROOT)),
    }
}

/// Whether `path` is the root key.
#[must_use]
pub fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path == Path::new(ROOT)
}

/// A set of [`PlanNode`]s keyed by path relative to the package root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Nodes ordered by relative source path, so iteration is top-down.
    nodes: BTreeMap<PathBuf, PlanNode>,
}

impl Plan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a plan holding only the bootstrap root node.
    #[must_use]
    pub fn with_root() -> Self {
        let mut plan = Self::new();
        plan.insert(PlanNode::root());
        plan
    }

    /// Inserts a node under its own relative source path.
    pub fn insert(&mut self, node: PlanNode) {
        self.nodes.insert(node.relative_source_path.clone(), node);
    }

    /// Removes the bootstrap root node, if present.
    pub fn remove_root(&mut self) -> Option<PlanNode> {
        self.nodes.remove(Path::new(ROOT))
    }

    /// Looks up a node.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&PlanNode> {
        self.nodes.get(path)
    }

    /// Looks up a node mutably.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut PlanNode> {
        self.nodes.get_mut(path)
    }

    /// Whether the plan has a node for `path`.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    /// The action recorded for `path`.
    #[must_use]
    pub fn action(&self, path: &Path) -> Option<Action> {
        self.nodes.get(path).map(|node| node.action)
    }

    /// Sets the action of `path` if it is in the plan.
    pub fn set_action(&mut self, path: &Path, action: Action) {
        if let Some(node) = self.nodes.get_mut(path) {
            node.action = action;
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the plan is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates nodes in ascending path order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&PathBuf, &PlanNode)> {
        self.nodes.iter()
    }

    /// Iterates nodes in ascending path order.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &PlanNode> {
        self.nodes.values()
    }

    /// Keys of the immediate children of `parent` that are in the plan.
    #[must_use]
    pub fn children(&self, parent: &Path) -> Vec<PathBuf> {
        if is_root(parent) {
            return self
                .nodes
                .keys()
                .filter(|key| !is_root(key) && key.components().count() == 1)
                .cloned()
                .collect();
        }
        let depth = parent.components().count() + 1;
        self.descendant_keys(parent)
            .into_iter()
            .filter(|key| key.components().count() == depth)
            .collect()
    }

    /// Keys of every descendant of `parent` in the plan.
    #[must_use]
    pub fn descendant_keys(&self, parent: &Path) -> Vec<PathBuf> {
        if is_root(parent) {
            return self
                .nodes
                .keys()
                .filter(|key| !is_root(key))
                .cloned()
                .collect();
        }
        self.nodes
            .range::<Path, _>((Bound::Excluded(parent), Bound::Unbounded))
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(parent))
            .cloned()
            .collect()
    }

    /// Whether any node carries one of `actions`.
    #[must_use]
    pub fn has_any(&self, actions: &[Action]) -> bool {
        self.nodes.values().any(|node| actions.contains(&node.action))
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = (&'a PathBuf, &'a PlanNode);
    type IntoIter = std::collections::btree_map::Iter<'a, PathBuf, PlanNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// Extracts the nodes whose action is in `actions`, sorted by relative source
/// path so that executing them in order works top-down.
#[must_use]
pub fn extract_plan<'a>(plan: &'a Plan, actions: &[Action]) -> Vec<&'a PlanNode> {
    plan.nodes()
        .filter(|node| actions.contains(&node.action))
        .collect()
}

/// Logs the nodes of `plan` whose action is in `actions` at `level`, framed by
/// begin/end markers. `describe` controls how each node is rendered.
pub fn log_extracted_plan<F>(
    plan: &Plan,
    description: Option<&str>,
    level: Level,
    actions: &[Action],
    describe: F,
) where
    F: Fn(&PlanNode) -> String,
{
    let header = match description {
        Some(description) => format!("---BEGIN PLAN: {description}---"),
        None => "---BEGIN PLAN---".to_string(),
    };
    log_at(level, &header);
    for node in extract_plan(plan, actions) {
        log_at(level, &describe(node));
    }
    log_at(level, "---END PLAN---");
}

/// `tracing` macros need a constant level, so dispatch by hand.
fn log_at(level: Level, message: &str) {
    match level {
        Level::ERROR => event!(Level::ERROR, "{message}"),
        Level::WARN => event!(Level::WARN, "{message}"),
        Level::INFO => event!(Level::INFO, "{message}"),
        Level::DEBUG => event!(Level::DEBUG, "{message}"),
        Level::TRACE => event!(Level::TRACE, "{message}"),
    }
}

/// Marks each ancestor of `child` with `mark`, climbing until an ancestor
/// already carrying `stop_mark` is reached. Ancestors missing from the plan
/// are passed over.
pub fn mark_all_ancestors(child: &Path, mark: Action, stop_mark: Action, plan: &mut Plan) {
    let mut current = parent_key(child);
    while let Some(ancestor) = current {
        if let Some(node) = plan.get_mut(&ancestor) {
            if node.action == stop_mark {
                break;
            }
            node.action = mark;
        }
        current = parent_key(&ancestor);
    }
}

/// Marks every descendant of `parent` with `mark`, but only those currently
/// carrying an action in `allow_overwrite`.
pub fn mark_all_descendants(
    parent: &Path,
    mark: Action,
    allow_overwrite: &[Action],
    plan: &mut Plan,
) {
    for key in plan.descendant_keys(parent) {
        overwrite(plan, &key, mark, allow_overwrite);
    }
}

/// Marks each immediate child of `parent` with `mark`, but only those
/// currently carrying an action in `allow_overwrite`.
pub fn mark_immediate_children(
    parent: &Path,
    mark: Action,
    allow_overwrite: &[Action],
    plan: &mut Plan,
) {
    for key in plan.children(parent) {
        overwrite(plan, &key, mark, allow_overwrite);
    }
}

fn overwrite(plan: &mut Plan, key: &Path, mark: Action, allow_overwrite: &[Action]) {
    if let Some(node) = plan.get_mut(key)
        && allow_overwrite.contains(&node.action)
    {
        node.action = mark;
    }
}
