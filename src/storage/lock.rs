//! Advisory file locks
//!
//! A lock is held while its lock file exists. The file is created atomically
//! and records the holder's process id, so a lock left behind by a crashed
//! process can be reclaimed. `FileLock` releases the lock when dropped.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Retry schedule used while waiting for a lock file to disappear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    /// Sleep between two attempts
    pub retry_interval: Duration,
    /// Attempts before giving up
    pub max_attempts: u32,
}

impl LockPolicy {
    /// Policy for per-table locks taken around insert and delete
    pub const TABLE: LockPolicy = LockPolicy {
        retry_interval: Duration::from_millis(10),
        max_attempts: 1000,
    };

    /// Policy for the schema-wide lock taken when a database is opened
    pub const DATABASE: LockPolicy = LockPolicy {
        retry_interval: Duration::from_millis(100),
        max_attempts: 50,
    };

    pub fn new(retry_interval: Duration, max_attempts: u32) -> Self {
        Self {
            retry_interval,
            max_attempts,
        }
    }
}

/// A held advisory lock; the lock file is removed on drop
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    released: bool,
}

impl FileLock {
    /// Acquire the lock at `path`, retrying according to `policy`.
    ///
    /// Fails with `Error::LockTimeout` once the attempts are exhausted.
    pub fn acquire(path: impl Into<PathBuf>, policy: LockPolicy) -> Result<Self> {
        let path = path.into();
        let mut attempts = 0;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    write!(file, "{}", std::process::id())?;
                    debug!(lock = %path.display(), "lock acquired");
                    return Ok(Self {
                        path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if reclaim_if_stale(&path)? {
                        continue;
                    }
                }
                Err(e) => return Err(e.into()),
            }

            attempts += 1;
            if attempts >= policy.max_attempts {
                warn!(lock = %path.display(), attempts, "lock timeout");
                return Err(Error::LockTimeout(path));
            }
            thread::sleep(policy.retry_interval);
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock, reporting a failure to remove the lock file
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        remove_lock_file(&self.path)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_lock_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}

fn remove_lock_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(lock = %path.display(), "lock released");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Process id recorded in a lock file, if it holds one
pub fn lock_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Remove the lock file when its holder is gone. Returns true when the caller
/// should retry immediately (the file was reclaimed or has vanished).
fn reclaim_if_stale(path: &Path) -> Result<bool> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };

    // Unreadable holder ids (or a holder that is still being written) are treated as alive.
    let Ok(pid) = contents.trim().parse::<u32>() else {
        return Ok(false);
    };
    if process_alive(pid) {
        return Ok(false);
    }

    if remove_if_held_by(path, pid)? {
        warn!(lock = %path.display(), pid, "reclaimed stale lock");
    }
    Ok(true)
}

/// Remove the lock file only if it still records `pid`.
///
/// The file is first renamed to a private name so that the check and the
/// removal act on the same file. If another waiter replaced the stale lock in
/// the meantime, its lock is put back (when the path is still free).
fn remove_if_held_by(path: &Path, pid: u32) -> Result<bool> {
    static RECLAIM_SEQ: AtomicU64 = AtomicU64::new(0);

    let mut moved_name = path.as_os_str().to_owned();
    moved_name.push(format!(
        ".stale.{}.{}",
        std::process::id(),
        RECLAIM_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    let moved = PathBuf::from(moved_name);

    match fs::rename(path, &moved) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    }

    if lock_holder(&moved) == Some(pid) {
        fs::remove_file(&moved)?;
        return Ok(true);
    }

    // Took a live lock by mistake; link it back without overwriting a newer one.
    match fs::hard_link(&moved, path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            warn!(lock = %path.display(), "lock was replaced while reclaiming");
        }
        Err(e) => return Err(e.into()),
    }
    fs::remove_file(&moved)?;
    Ok(false)
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    pid == std::process::id() || Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}
