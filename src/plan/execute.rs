//! Applying a plan to the filesystem.

use super::{Action, Plan, PlanNode, extract_plan};
use crate::error::{DotxError, Result};
use crate::ledger::{Ledger, LinkType, PackageId};
use crate::utils::paths::{lenient_canonicalize, symlink_target};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Knobs for [`execute_plan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Describe every operation without performing any of them.
    pub dry_run: bool,
}

/// One filesystem operation taken from a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `mkdir <path>`
    CreateDir { path: PathBuf },
    /// `ln -s <target> <link>`
    Symlink {
        target: PathBuf,
        link: PathBuf,
        is_dir: bool,
    },
    /// `rm <path>`
    RemoveLink { path: PathBuf },
}

impl Operation {
    /// Shell command equivalent, as shown by dry runs.
    #[must_use]
    pub fn to_shell(&self) -> String {
        match self {
            Self::CreateDir { path } => format!("mkdir {}", path.display()),
            Self::Symlink { target, link, .. } => {
                format!("ln -s {} {}", target.display(), link.display())
            }
            Self::RemoveLink { path } => format!("rm {}", path.display()),
        }
    }

    /// The destination path the operation changes.
    #[must_use]
    pub fn destination(&self) -> &Path {
        match self {
            Self::CreateDir { path } | Self::RemoveLink { path } => path,
            Self::Symlink { link, .. } => link,
        }
    }
}

/// What [`execute_plan`] did, or in a dry run, would have done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Operations in execution order.
    pub operations: Vec<Operation>,
    pub linked_files: usize,
    pub linked_dirs: usize,
    pub created_dirs: usize,
    pub removed_links: usize,
}

impl ExecutionSummary {
    /// Folds another package's summary into this one.
    pub fn merge(&mut self, other: Self) {
        self.operations.extend(other.operations);
        self.linked_files += other.linked_files;
        self.linked_dirs += other.linked_dirs;
        self.created_dirs += other.created_dirs;
        self.removed_links += other.removed_links;
    }

    /// Directories linked or created.
    #[must_use]
    pub const fn dirs(&self) -> usize {
        self.linked_dirs + self.created_dirs
    }
}

/// Performs the `Create`, `Link` and `Unlink` nodes of `plan`, in ascending
/// source path order. Every other action is ignored.
///
/// Each real `Create` or `Link` is recorded in `ledger` under `package`, and
/// each real `Unlink` removed from it. A dry run touches neither the
/// filesystem nor the ledger.
///
/// # Errors
///
/// Returns [`DotxError::StateMismatch`] when the destination no longer looks
/// the way the plan expected, and [`DotxError::Io`] for other filesystem
/// failures. Operations already performed are not rolled back.
pub fn execute_plan(
    source_root: &Path,
    destination_root: &Path,
    plan: &Plan,
    package: &PackageId,
    ledger: &mut dyn Ledger,
    options: &ExecuteOptions,
) -> Result<ExecutionSummary> {
    let mut summary = ExecutionSummary::default();

    for step in extract_plan(plan, &[Action::Create, Action::Link, Action::Unlink]) {
        let operation = operation_for(source_root, destination_root, step);
        if options.dry_run {
            debug!("(dry run) {}", operation.to_shell());
        } else {
            if !apply(&operation)? {
                debug!("{} is already a directory", operation.destination().display());
                continue;
            }
            info!("{}", operation.to_shell());
            notify(ledger, package, &operation)?;
        }
        tally(&mut summary, &operation);
        summary.operations.push(operation);
    }

    Ok(summary)
}

fn operation_for(source_root: &Path, destination_root: &Path, step: &PlanNode) -> Operation {
    let destination = destination_root.join(&step.relative_destination_path);
    match step.action {
        Action::Create => Operation::CreateDir { path: destination },
        Action::Link => {
            let source = lenient_canonicalize(&source_root.join(&step.relative_source_path));
            let resolved_link = match (destination.parent(), destination.file_name()) {
                (Some(parent), Some(name)) => lenient_canonicalize(parent).join(name),
                _ => lenient_canonicalize(&destination),
            };
            Operation::Symlink {
                target: symlink_target(&source, &resolved_link),
                link: destination,
                is_dir: step.is_dir,
            }
        }
        _ => Operation::RemoveLink { path: destination },
    }
}

/// Performs `operation`. Returns `false` when a directory to create is
/// already there, which happens when several packages planned the same
/// shared directory before any of them was installed.
fn apply(operation: &Operation) -> Result<bool> {
    match operation {
        Operation::CreateDir { path } => match fs::create_dir(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let is_real_dir = path
                    .symlink_metadata()
                    .is_ok_and(|metadata| metadata.file_type().is_dir());
                if is_real_dir {
                    Ok(false)
                } else {
                    Err(DotxError::StateMismatch {
                        path: path.clone(),
                        expected: "nothing or a directory at the directory to create",
                    })
                }
            }
            Err(e) => Err(DotxError::io(path, e)),
        },
        Operation::Symlink {
            target,
            link,
            is_dir,
        } => {
            if link.symlink_metadata().is_ok() {
                return Err(DotxError::StateMismatch {
                    path: link.clone(),
                    expected: "nothing at the link to create",
                });
            }
            create_symlink(target, link, *is_dir)
                .map(|()| true)
                .map_err(|e| DotxError::io(link, e))
        }
        Operation::RemoveLink { path } => {
            let is_symlink = path
                .symlink_metadata()
                .is_ok_and(|metadata| metadata.file_type().is_symlink());
            if !is_symlink {
                return Err(DotxError::StateMismatch {
                    path: path.clone(),
                    expected: "a symlink to remove",
                });
            }
            remove_symlink(path)
                .map(|()| true)
                .map_err(|e| DotxError::io(path, e))
        }
    }
}

fn notify(ledger: &mut dyn Ledger, package: &PackageId, operation: &Operation) -> Result<()> {
    match operation {
        Operation::CreateDir { path } => ledger.record(package, path, LinkType::CreatedDir),
        Operation::Symlink { link, is_dir, .. } => {
            let link_type = if *is_dir {
                LinkType::Directory
            } else {
                LinkType::File
            };
            ledger.record(package, link, link_type)
        }
        Operation::RemoveLink { path } => ledger.remove(path),
    }
}

fn tally(summary: &mut ExecutionSummary, operation: &Operation) {
    match operation {
        Operation::CreateDir { .. } => summary.created_dirs += 1,
        Operation::Symlink { is_dir: true, .. } => summary.linked_dirs += 1,
        Operation::Symlink { is_dir: false, .. } => summary.linked_files += 1,
        Operation::RemoveLink { .. } => summary.removed_links += 1,
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path, _is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(unix)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

#[cfg(windows)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    // Directory symlinks are directories to Windows.
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ledger::NoOpLedger;
    use crate::plan::PlanNode;
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingLedger {
        records: HashMap<PathBuf, LinkType>,
        removed: Vec<PathBuf>,
    }

    impl Ledger for RecordingLedger {
        fn record(&mut self, _package: &PackageId, target: &Path, link_type: LinkType) -> Result<()> {
            self.records.insert(target.to_path_buf(), link_type);
            Ok(())
        }

        fn remove(&mut self, target: &Path) -> Result<()> {
            self.removed.push(target.to_path_buf());
            Ok(())
        }
    }

    struct Fixture {
        _temp: tempfile::TempDir,
        source: PathBuf,
        destination: PathBuf,
        package: PackageId,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let source = root.join("dotfiles/pkg");
        let destination = root.join("home");
        fs::create_dir_all(source.join("dot-config")).unwrap();
        fs::write(source.join("dot-bashrc"), "export A=1").unwrap();
        fs::write(source.join("dot-config/app.conf"), "").unwrap();
        fs::create_dir_all(&destination).unwrap();
        let package = PackageId::from_source(&source);
        Fixture {
            _temp: temp,
            source,
            destination,
            package,
        }
    }

    fn step(action: Action, src: &str, dst: &str, is_dir: bool) -> PlanNode {
        let mut node = PlanNode::new(false, PathBuf::from(src), PathBuf::from(dst), is_dir);
        node.action = action;
        node
    }

    fn install_plan() -> Plan {
        let mut plan = Plan::new();
        plan.insert(step(Action::Link, "dot-bashrc", ".bashrc", false));
        plan.insert(step(Action::Create, "dot-config", ".config", true));
        plan.insert(step(Action::Link, "dot-config/app.conf", ".config/app.conf", false));
        plan.insert(step(Action::Skip, "skipped", "skipped", false));
        plan
    }

    #[test]
    fn test_execute_creates_links_and_directories() {
        let f = fixture();
        let mut ledger = RecordingLedger::default();
        let summary = execute_plan(
            &f.source,
            &f.destination,
            &install_plan(),
            &f.package,
            &mut ledger,
            &ExecuteOptions::default(),
        )
        .unwrap();

        let bashrc = f.destination.join(".bashrc");
        assert!(bashrc.is_symlink());
        assert_eq!(
            fs::read_link(&bashrc).unwrap(),
            PathBuf::from("../dotfiles/pkg/dot-bashrc")
        );
        assert_eq!(fs::read_to_string(&bashrc).unwrap(), "export A=1");

        let config = f.destination.join(".config");
        assert!(config.is_dir() && !config.is_symlink());
        assert_eq!(
            fs::read_link(config.join("app.conf")).unwrap(),
            PathBuf::from("../../dotfiles/pkg/dot-config/app.conf")
        );

        assert_eq!(summary.linked_files, 2);
        assert_eq!(summary.created_dirs, 1);
        assert_eq!(summary.operations.len(), 3);
        assert_eq!(ledger.records.get(&config), Some(&LinkType::CreatedDir));
        assert_eq!(ledger.records.get(&bashrc), Some(&LinkType::File));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let f = fixture();
        let mut ledger = RecordingLedger::default();
        let summary = execute_plan(
            &f.source,
            &f.destination,
            &install_plan(),
            &f.package,
            &mut ledger,
            &ExecuteOptions { dry_run: true },
        )
        .unwrap();

        assert!(!f.destination.join(".bashrc").exists());
        assert!(!f.destination.join(".config").exists());
        assert!(ledger.records.is_empty());

        let commands: Vec<String> = summary.operations.iter().map(Operation::to_shell).collect();
        assert_eq!(
            commands,
            vec![
                format!(
                    "ln -s ../dotfiles/pkg/dot-bashrc {}",
                    f.destination.join(".bashrc").display()
                ),
                format!("mkdir {}", f.destination.join(".config").display()),
                format!(
                    "ln -s ../../dotfiles/pkg/dot-config/app.conf {}",
                    f.destination.join(".config/app.conf").display()
                ),
            ]
        );
    }

    #[test]
    fn test_unlink_removes_symlink_and_ledger_record() {
        let f = fixture();
        let link = f.destination.join(".bashrc");
        std::os::unix::fs::symlink(f.source.join("dot-bashrc"), &link).unwrap();

        let mut plan = Plan::new();
        plan.insert(step(Action::Unlink, "dot-bashrc", ".bashrc", false));
        let mut ledger = RecordingLedger::default();
        let summary = execute_plan(
            &f.source,
            &f.destination,
            &plan,
            &f.package,
            &mut ledger,
            &ExecuteOptions::default(),
        )
        .unwrap();

        assert!(link.symlink_metadata().is_err());
        assert!(f.source.join("dot-bashrc").exists());
        assert_eq!(summary.removed_links, 1);
        assert_eq!(ledger.removed, vec![link]);
    }

    #[test]
    fn test_unlink_of_regular_file_is_a_state_mismatch() {
        let f = fixture();
        fs::write(f.destination.join(".bashrc"), "mine").unwrap();

        let mut plan = Plan::new();
        plan.insert(step(Action::Unlink, "dot-bashrc", ".bashrc", false));
        let err = execute_plan(
            &f.source,
            &f.destination,
            &plan,
            &f.package,
            &mut NoOpLedger,
            &ExecuteOptions::default(),
        )
        .unwrap_err();

        assert!(err.is_state_mismatch());
        assert_eq!(
            fs::read_to_string(f.destination.join(".bashrc")).unwrap(),
            "mine"
        );
    }

    #[test]
    fn test_create_over_existing_path_is_a_state_mismatch() {
        let f = fixture();
        fs::write(f.destination.join(".config"), "").unwrap();

        let mut plan = Plan::new();
        plan.insert(step(Action::Create, "dot-config", ".config", true));
        let err = execute_plan(
            &f.source,
            &f.destination,
            &plan,
            &f.package,
            &mut NoOpLedger,
            &ExecuteOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_state_mismatch());
    }

    #[test]
    fn test_create_over_existing_directory_is_done() {
        let f = fixture();
        let config = f.destination.join(".config");
        fs::create_dir(&config).unwrap();

        let mut ledger = RecordingLedger::default();
        let summary = execute_plan(
            &f.source,
            &f.destination,
            &install_plan(),
            &f.package,
            &mut ledger,
            &ExecuteOptions::default(),
        )
        .unwrap();

        assert!(config.join("app.conf").is_symlink());
        assert_eq!(summary.created_dirs, 0);
        assert_eq!(summary.linked_files, 2);
        // The directory belongs to whoever created it first
        assert_eq!(ledger.records.get(&config), None);
    }

    #[test]
    fn test_create_over_directory_symlink_is_a_state_mismatch() {
        let f = fixture();
        let elsewhere = f.destination.join("elsewhere");
        fs::create_dir(&elsewhere).unwrap();
        std::os::unix::fs::symlink(&elsewhere, f.destination.join(".config")).unwrap();

        let mut plan = Plan::new();
        plan.insert(step(Action::Create, "dot-config", ".config", true));
        let err = execute_plan(
            &f.source,
            &f.destination,
            &plan,
            &f.package,
            &mut NoOpLedger,
            &ExecuteOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_state_mismatch());
    }

    #[test]
    fn test_link_over_existing_path_is_a_state_mismatch() {
        let f = fixture();
        fs::write(f.destination.join(".bashrc"), "").unwrap();

        let mut plan = Plan::new();
        plan.insert(step(Action::Link, "dot-bashrc", ".bashrc", false));
        let err = execute_plan(
            &f.source,
            &f.destination,
            &plan,
            &f.package,
            &mut NoOpLedger,
            &ExecuteOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_state_mismatch());
    }

    #[test]
    fn test_create_with_missing_parent_is_an_io_error() {
        let f = fixture();
        let mut plan = Plan::new();
        plan.insert(step(Action::Create, "dot-config", "missing/.config", true));
        let err = execute_plan(
            &f.source,
            &f.destination,
            &plan,
            &f.package,
            &mut NoOpLedger,
            &ExecuteOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DotxError::Io { .. }));
    }

    #[test]
    fn test_summary_merge() {
        let mut total = ExecutionSummary {
            linked_files: 1,
            created_dirs: 1,
            ..ExecutionSummary::default()
        };
        total.merge(ExecutionSummary {
            linked_dirs: 2,
            removed_links: 3,
            ..ExecutionSummary::default()
        });
        assert_eq!(total.linked_files, 1);
        assert_eq!(total.dirs(), 3);
        assert_eq!(total.removed_links, 3);
    }
}
