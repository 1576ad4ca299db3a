use super::{LEDGER_VERSION, Ledger, LedgerLock, LinkType, PackageId};
use crate::error::{DotxError, Result};
use crate::utils::paths::absolute_no_follow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One installed destination object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub package_root: PathBuf,
    pub package_name: String,
    pub source_package_root: PathBuf,
    /// Absolute destination path. Never resolved, since it is usually a
    /// symlink itself.
    pub target_path: PathBuf,
    pub link_type: LinkType,
    pub installed_at: DateTime<Utc>,
}

/// Per-package totals for `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    pub package_root: PathBuf,
    pub package_name: String,
    pub file_count: usize,
    pub latest_install: DateTime<Utc>,
}

/// What is wrong with an installed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Recorded but gone from the filesystem.
    Missing,
    /// Recorded as a link but no longer a symlink.
    NotSymlink,
    /// Recorded as a created directory but no longer a real directory.
    NotDirectory,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing (recorded but not on the filesystem)",
            Self::NotSymlink => "not a symlink (should be a symlink)",
            Self::NotDirectory => "not a real directory (should be a created directory)",
        })
    }
}

/// A ledger record that no longer matches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyIssue {
    pub record: InstallationRecord,
    pub issue: IssueKind,
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    #[serde(default)]
    installations: Vec<InstallationRecord>,
}

/// The persisted ledger.
///
/// Opening takes an exclusive lock that is held until the value is dropped.
/// Changes stay in memory until [`InstallationDb::commit`] writes them back
/// atomically; dropping without committing discards them.
#[derive(Debug)]
pub struct InstallationDb {
    path: PathBuf,
    /// Keyed by target path, so recording a target twice replaces it.
    records: BTreeMap<PathBuf, InstallationRecord>,
    dirty: bool,
    _lock: LedgerLock,
}

impl InstallationDb {
    /// Opens (or starts) the ledger at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be taken, the file cannot be read
    /// or parsed, or it was written by an incompatible version.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| DotxError::io(parent, e))?;
        }
        let lock = LedgerLock::acquire(path)?;

        let records = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| DotxError::io(path, e))?;
            Self::parse(path, &content)?
        } else {
            debug!("No ledger at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            records,
            dirty: false,
            _lock: lock,
        })
    }

    fn parse(path: &Path, content: &str) -> Result<BTreeMap<PathBuf, InstallationRecord>> {
        let table: toml::Table = toml::from_str(content)
            .map_err(|e| DotxError::Ledger(format!("failed to parse {}: {e}", path.display())))?;

        let version = table.get("version").and_then(toml::Value::as_integer);
        if version != Some(i64::from(LEDGER_VERSION)) {
            return Err(DotxError::IncompatibleLedger {
                path: path.to_path_buf(),
            });
        }

        let file: LedgerFile = toml::Value::Table(table)
            .try_into()
            .map_err(|e| DotxError::Ledger(format!("failed to read {}: {e}", path.display())))?;

        Ok(file
            .installations
            .into_iter()
            .map(|record| (record.target_path.clone(), record))
            .collect())
    }

    /// Location of the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are uncommitted changes.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes the ledger back if anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn commit(mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let file = LedgerFile {
            version: LEDGER_VERSION,
            installations: self.records.values().cloned().collect(),
        };
        let content = toml::to_string_pretty(&file)
            .map_err(|e| DotxError::Ledger(format!("failed to serialize ledger: {e}")))?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| DotxError::io(dir, e))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| DotxError::io(temp.path().to_path_buf(), e))?;
        temp.persist(&self.path)
            .map_err(|e| DotxError::io(&self.path, e.error))?;

        self.dirty = false;
        debug!(
            "Saved {} ledger records to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Every record, ordered by target path.
    pub fn all(&self) -> impl Iterator<Item = &InstallationRecord> {
        self.records.values()
    }

    /// Records for one package, ordered by target path.
    #[must_use]
    pub fn installations(&self, package_root: &Path, package_name: &str) -> Vec<&InstallationRecord> {
        self.records
            .values()
            .filter(|record| {
                record.package_root == package_root && record.package_name == package_name
            })
            .collect()
    }

    /// Totals per package, ordered by package name.
    #[must_use]
    pub fn packages(&self) -> Vec<PackageSummary> {
        let mut grouped: BTreeMap<(String, PathBuf), PackageSummary> = BTreeMap::new();
        for record in self.records.values() {
            grouped
                .entry((record.package_name.clone(), record.package_root.clone()))
                .and_modify(|summary| {
                    summary.file_count += 1;
                    summary.latest_install = summary.latest_install.max(record.installed_at);
                })
                .or_insert_with(|| PackageSummary {
                    package_root: record.package_root.clone(),
                    package_name: record.package_name.clone(),
                    file_count: 1,
                    latest_install: record.installed_at,
                });
        }
        grouped.into_values().collect()
    }

    /// Package roots holding a package called `package_name`.
    #[must_use]
    pub fn package_roots(&self, package_name: &str) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self
            .records
            .values()
            .filter(|record| record.package_name == package_name)
            .map(|record| record.package_root.clone())
            .collect();
        roots.sort();
        roots.dedup();
        roots
    }

    /// The record for an installed target, if dotx installed it.
    #[must_use]
    pub fn find_by_target(&self, target: &Path) -> Option<&InstallationRecord> {
        self.records.get(target)
    }

    /// Whether anything is recorded for the package.
    #[must_use]
    pub fn package_exists(&self, package_root: &Path, package_name: &str) -> bool {
        self.records.values().any(|record| {
            record.package_root == package_root && record.package_name == package_name
        })
    }

    /// Checks one package's records against the filesystem.
    #[must_use]
    pub fn verify(&self, package_root: &Path, package_name: &str) -> Vec<VerifyIssue> {
        self.installations(package_root, package_name)
            .into_iter()
            .filter_map(|record| {
                check_record(record).map(|issue| VerifyIssue {
                    record: record.clone(),
                    issue,
                })
            })
            .collect()
    }

    /// Records of one package whose targets are gone.
    #[must_use]
    pub fn orphaned(&self, package_root: &Path, package_name: &str) -> Vec<&InstallationRecord> {
        self.installations(package_root, package_name)
            .into_iter()
            .filter(|record| !record.target_path.exists())
            .collect()
    }

    /// Removes the orphaned records of one package and returns how many went.
    pub fn clean_orphaned(&mut self, package_root: &Path, package_name: &str) -> usize {
        let targets: Vec<PathBuf> = self
            .orphaned(package_root, package_name)
            .into_iter()
            .map(|record| record.target_path.clone())
            .collect();
        for target in &targets {
            self.records.remove(target);
            info!("Removed orphaned ledger entry: {}", target.display());
        }
        if !targets.is_empty() {
            self.dirty = true;
        }
        targets.len()
    }
}

fn check_record(record: &InstallationRecord) -> Option<IssueKind> {
    let target = &record.target_path;
    if !target.exists() {
        return Some(IssueKind::Missing);
    }
    match record.link_type {
        LinkType::File | LinkType::Directory if !target.is_symlink() => Some(IssueKind::NotSymlink),
        LinkType::CreatedDir if !target.is_dir() || target.is_symlink() => {
            Some(IssueKind::NotDirectory)
        }
        _ => None,
    }
}

impl Ledger for InstallationDb {
    fn record(&mut self, package: &PackageId, target: &Path, link_type: LinkType) -> Result<()> {
        let target_path = absolute_no_follow(target)
            .map_err(|e| DotxError::Ledger(format!("{}: {e}", target.display())))?;
        debug!(
            "Recorded installation: {} from {}",
            target_path.display(),
            package
        );
        self.records.insert(
            target_path.clone(),
            InstallationRecord {
                package_root: package.package_root.clone(),
                package_name: package.package_name.clone(),
                source_package_root: package.source_package_root.clone(),
                target_path,
                link_type,
                installed_at: Utc::now(),
            },
        );
        self.dirty = true;
        Ok(())
    }

    fn remove(&mut self, target: &Path) -> Result<()> {
        let target_path = absolute_no_follow(target)
            .map_err(|e| DotxError::Ledger(format!("{}: {e}", target.display())))?;
        if self.records.remove(&target_path).is_some() {
            debug!("Removed installation record: {}", target_path.display());
            self.dirty = true;
        }
        Ok(())
    }
}
