//! Single-instance guard for the poller.
//!
//! Two pollers sharing a seen-slot store would both treat a slot as new and
//! notify twice. `slotwatch run` holds an [`InstanceLock`] next to the store
//! file for its whole lifetime.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, warn};

use crate::error::{ServerError, ServerResult};

/// A PID file created exclusively and removed on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Lock path used for a given store file: `<store>.lock`.
    pub fn path_for(store_path: &Path) -> PathBuf {
        let mut name = store_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquires the lock at `path`.
    ///
    /// A lock left behind by a process that no longer runs is taken over.
    pub fn acquire(path: impl Into<PathBuf>) -> ServerResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        match Self::create_exclusive(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                match read_pid(&path) {
                    Some(pid) if process_alive(pid) => {
                        return Err(ServerError::already_running(path.display().to_string()));
                    }
                    Some(pid) => warn!(path = %path.display(), pid, "taking over stale lock"),
                    None => warn!(path = %path.display(), "taking over unreadable lock"),
                }
                fs::remove_file(&path)?;
                Self::create_exclusive(&path)?;
            }
            Err(e) => return Err(e.into()),
        }

        debug!(path = %path.display(), pid = process::id(), "acquired instance lock");
        Ok(Self { path })
    }

    fn create_exclusive(path: &Path) -> std::io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(file, "{}", process::id())?;
        file.sync_all()
    }

    /// Returns the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove instance lock");
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 only checks for existence.
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_path_is_next_to_store() {
        assert_eq!(
            InstanceLock::path_for(Path::new("/var/lib/slotwatch/seen_slots.db")),
            PathBuf::from("/var/lib/slotwatch/seen_slots.db.lock")
        );
    }

    #[test]
    fn acquire_and_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen_slots.db.lock");
        {
            let lock = InstanceLock::acquire(&path).unwrap();
            assert_eq!(read_pid(lock.path()), Some(process::id()));
        }
        assert!(!path.exists());
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen_slots.db.lock");
        let _held = InstanceLock::acquire(&path).unwrap();
        let err = InstanceLock::acquire(&path).unwrap_err();
        assert!(matches!(err, ServerError::AlreadyRunning { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn stale_and_garbage_locks_are_taken_over() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seen_slots.db.lock");

        fs::write(&path, "999999999\n").unwrap();
        drop(InstanceLock::acquire(&path).unwrap());

        fs::write(&path, "not-a-pid\n").unwrap();
        let lock = InstanceLock::acquire(&path).unwrap();
        assert_eq!(read_pid(lock.path()), Some(process::id()));
    }
}
