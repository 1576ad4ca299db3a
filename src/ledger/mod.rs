//! Installation ledger.
//!
//! The planners never look at the ledger. Only the executor talks to it,
//! through the two-method [`Ledger`] trait: every real `Create` or `Link`
//! is recorded and every real `Unlink` removed. The persisted
//! implementation is [`InstallationDb`]; [`NoOpLedger`] stands in when the
//! ledger is disabled.

mod db;
mod lock;

pub use db::{InstallationDb, InstallationRecord, IssueKind, PackageSummary, VerifyIssue};
pub use lock::LedgerLock;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Ledger file name inside the dotx data directory.
pub const LEDGER_FILE_NAME: &str = "installed.toml";

/// Current ledger format version.
pub const LEDGER_VERSION: u32 = 1;

/// How a destination object was installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Symlink to a file.
    File,
    /// Symlink to a directory.
    Directory,
    /// Real directory made so its children could be linked.
    CreatedDir,
}

impl LinkType {
    /// Name as stored in the ledger.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::CreatedDir => "created_dir",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an installed package.
///
/// Packages are grouped by the directory holding them (`package_root`, e.g.
/// `~/dotfiles`) and their name (`helix`). `source_package_root` is the
/// package directory itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageId {
    /// Resolved directory containing the package.
    pub package_root: PathBuf,
    /// Package directory name.
    pub package_name: String,
    /// Resolved package directory.
    pub source_package_root: PathBuf,
}

impl PackageId {
    /// Builds the identity of the package at `source_package_root`, which
    /// should already be resolved.
    #[must_use]
    pub fn from_source(source_package_root: &Path) -> Self {
        let package_name = source_package_root
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
        let package_root = source_package_root
            .parent()
            .map_or_else(|| source_package_root.to_path_buf(), Path::to_path_buf);
        Self {
            package_root,
            package_name,
            source_package_root: source_package_root.to_path_buf(),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.package_name, self.package_root.display())
    }
}

/// Receives notifications from the plan executor.
pub trait Ledger {
    /// Records that `target` was installed from `package`. An existing record
    /// for the same target is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    fn record(&mut self, package: &PackageId, target: &Path, link_type: LinkType) -> Result<()>;

    /// Forgets the record for `target`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be removed.
    fn remove(&mut self, target: &Path) -> Result<()>;
}

/// A ledger that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLedger;

impl Ledger for NoOpLedger {
    fn record(&mut self, _package: &PackageId, _target: &Path, _link_type: LinkType) -> Result<()> {
        Ok(())
    }

    fn remove(&mut self, _target: &Path) -> Result<()> {
        Ok(())
    }
}
