use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use crate::error::RegistryError;

/// How long a writer waits for the lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// A lock file untouched for this long is left over from a dead writer and
/// is taken over.
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(120);

const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Exclusive per-network write lock, held as a marker file.
///
/// The file is created with `create_new`, so at most one holder exists at a
/// time. It is removed when the guard is dropped.
#[derive(Debug)]
pub struct RegistryLock {
    path: PathBuf,
}

impl RegistryLock {
    /// Lock file path for a network inside `dir`.
    pub fn path_for(dir: &Path, network: &str) -> PathBuf {
        dir.join(format!("{network}.registry.lock"))
    }

    /// Blocks until the lock is acquired or `timeout` elapses.
    pub fn acquire(dir: &Path, network: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let path = Self::path_for(dir, network);
        let deadline = Instant::now() + timeout;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    // Holder pid, for humans inspecting a stale lock.
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!(path = %path.display(), "registry lock acquired");
                    return Ok(Self { path });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        warn!(path = %path.display(), "removing stale registry lock");
                        match fs::remove_file(&path) {
                            Ok(()) => continue,
                            Err(err) if err.kind() == ErrorKind::NotFound => continue,
                            Err(err) => return Err(err.into()),
                        }
                    }
                    if Instant::now() >= deadline {
                        warn!(path = %path.display(), "timed out waiting for registry lock");
                        return Err(RegistryError::LockTimeout(path));
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age >= STALE_LOCK_AGE)
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to remove registry lock");
        } else {
            debug!(path = %self.path.display(), "registry lock released");
        }
    }
}
