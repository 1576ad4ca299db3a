//! Exclusive lock on the ledger file.
//!
//! Two dotx processes writing the ledger at once would lose records, so every
//! open ledger holds an `fs4` lock on a sibling `.lock` file. The lock is
//! released when dropped.

use crate::error::{DotxError, Result};
use fs4::fs_std::FileExt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// How long to wait for another process to release the ledger.
const LOCK_TIMEOUT: Duration = if cfg!(test) {
    Duration::from_millis(100)
} else {
    Duration::from_secs(10)
};

const RETRY_INTERVAL: Duration = if cfg!(test) {
    Duration::from_millis(10)
} else {
    Duration::from_millis(100)
};

/// Holds the exclusive ledger lock until dropped.
#[derive(Debug)]
pub struct LedgerLock {
    lock_file: File,
    lock_path: PathBuf,
}

impl LedgerLock {
    /// Acquires the lock guarding `ledger_path`, waiting up to a few seconds
    /// if another process holds it.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or the lock is
    /// still held when the timeout expires.
    pub fn acquire(ledger_path: &Path) -> Result<Self> {
        let lock_path = lock_path_for(ledger_path);
        let deadline = Instant::now() + LOCK_TIMEOUT;

        let lock_file = loop {
            let file = File::options()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)
                .map_err(|e| DotxError::io(&lock_path, e))?;

            if matches!(file.try_lock_exclusive(), Ok(true)) {
                break file;
            }
            if Instant::now() >= deadline {
                return Err(DotxError::Ledger(format!(
                    "another dotx process is using the ledger; \
                     wait for it to finish or remove the stale lock at {}",
                    lock_path.display()
                )));
            }
            std::thread::sleep(RETRY_INTERVAL);
        };

        write_owner(&lock_file);
        debug!("Acquired ledger lock {}", lock_path.display());
        Ok(Self {
            lock_file,
            lock_path,
        })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

/// Leaves the owner's pid and start time in the lock file, to help whoever
/// finds a stale one.
fn write_owner(mut file: &File) {
    let _ = file.set_len(0);
    let _ = writeln!(
        file,
        "pid={}\ntime={}",
        std::process::id(),
        humantime::format_rfc3339(SystemTime::now())
    );
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);

        if let Err(e) = fs::remove_file(&self.lock_path) {
            warn!(
                "Failed to remove ledger lock {}: {e}",
                self.lock_path.display()
            );
        }
    }
}

/// `installed.toml` is guarded by `installed.toml.lock`.
fn lock_path_for(ledger_path: &Path) -> PathBuf {
    let mut name = ledger_path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".lock");
    ledger_path.with_file_name(name)
}
