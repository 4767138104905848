//! Advisory file lock guarding directive store writes.
//!
//! Every mutation of the store document runs under this lock so that the
//! uniqueness check and the write are one transaction, even across
//! processes sharing the same store directory. The lock has a timeout and
//! logs contention; it is released on drop.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::store::StoreError;

/// Exclusive lock on a store directory.
pub struct StoreLock {
    lock_path: PathBuf,
    #[allow(dead_code)]
    lock_file: File,
}

impl StoreLock {
    const LOCK_FILENAME: &'static str = ".merges.lock";

    /// Acquire the lock for `store_dir`, waiting up to `timeout`.
    ///
    /// Creates the directory and lock file if they don't exist.
    pub fn acquire(store_dir: &Path, timeout: Duration) -> Result<Self, StoreError> {
        fs::create_dir_all(store_dir)?;

        let lock_path = store_dir.join(Self::LOCK_FILENAME);
        let start = Instant::now();
        let poll_interval = Duration::from_millis(20);
        let mut warned = false;

        loop {
            match Self::try_acquire_exclusive(&lock_path) {
                Ok(file) => {
                    if warned {
                        tracing::info!(
                            path = %lock_path.display(),
                            waited_ms = start.elapsed().as_millis() as u64,
                            "store lock acquired after contention"
                        );
                    }
                    return Ok(Self {
                        lock_path,
                        lock_file: file,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if !warned && start.elapsed() > Duration::from_millis(250) {
                        tracing::warn!(path = %lock_path.display(), "store lock contention, waiting");
                        warned = true;
                    }
                }
                Err(e) => return Err(StoreError::Io(e)),
            }

            if start.elapsed() >= timeout {
                return Err(StoreError::LockTimeout(timeout));
            }

            std::thread::sleep(poll_interval);
        }
    }

    #[cfg(unix)]
    fn try_acquire_exclusive(lock_path: &Path) -> io::Result<File> {
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(lock_path)?;

        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };

        if result == 0 {
            Ok(file)
        } else {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "lock held"))
            } else {
                Err(err)
            }
        }
    }

    #[cfg(not(unix))]
    fn try_acquire_exclusive(lock_path: &Path) -> io::Result<File> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "lock held"))
            }
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe {
                libc::flock(self.lock_file.as_raw_fd(), libc::LOCK_UN);
            }
        }
        // create_new locking needs the file gone for the next holder
        #[cfg(not(unix))]
        {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}
