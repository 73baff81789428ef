use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Advisory lock serializing writes to a note file.
///
/// Uses flock on a `.lock` sibling of the note so the TUI and CLI never
/// interleave writes.
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not acquire lock on {path}: another tasknote process may be writing")]
    Timeout { path: PathBuf },
}

/// The lock file guarding `target`
pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}

impl FileLock {
    /// Lock `target`, waiting up to `timeout`.
    pub fn acquire(target: &Path, timeout: Duration) -> Result<Self, LockError> {
        let lock_path = lock_path(target);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LockError::CreateError {
                path: lock_path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    return Ok(FileLock {
                        _file: file,
                        path: lock_path,
                    });
                }
                Err(_) if start.elapsed() < timeout => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => {
                    log::warn!("event=lock status=timeout path={}", lock_path.display());
                    return Err(LockError::Timeout { path: lock_path });
                }
            }
        }
    }

    /// Acquire with the default timeout (5 seconds)
    pub fn acquire_default(target: &Path) -> Result<Self, LockError> {
        Self::acquire(target, Duration::from_secs(5))
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // flock is released with the file
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_is_sibling() {
        assert_eq!(
            lock_path(Path::new("/tmp/notes/note.json")),
            PathBuf::from("/tmp/notes/note.json.lock")
        );
    }

    #[test]
    fn test_acquire_and_release_lock() {
        let tmp = TempDir::new().unwrap();
        let note = tmp.path().join("note.json");

        let lock = FileLock::acquire_default(&note);
        assert!(lock.is_ok());
        drop(lock);
        assert!(!lock_path(&note).exists());

        let lock2 = FileLock::acquire_default(&note);
        assert!(lock2.is_ok());
    }

    #[test]
    fn test_lock_contention() {
        let tmp = TempDir::new().unwrap();
        let note = tmp.path().join("note.json");

        let _lock1 = FileLock::acquire_default(&note).unwrap();
        let lock2 = FileLock::acquire(&note, Duration::from_millis(50));
        assert!(matches!(lock2, Err(LockError::Timeout { .. })));
    }
}
