//! Advisory locking of the base directory.
//!
//! The daemon takes the lock on startup and holds it for its lifetime; CLI
//! commands take it for the duration of one invocation. Uses flock(), so the
//! lock is released by the kernel if the process dies.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Lock file name placed in the base directory
const LOCK_FILE_NAME: &str = "clouddrive.lock";

/// A held library lock that releases on drop
pub struct LibraryLock {
    #[allow(dead_code)]
    file: File,
}

impl LibraryLock {
    /// Take the lock without waiting. Fails with `WouldBlock` when another
    /// process holds it.
    pub fn try_acquire(base_path: &Path) -> io::Result<Self> {
        let lock_path = base_path.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        Self::try_lock_exclusive(&file)?;

        Ok(LibraryLock { file })
    }

    #[cfg(unix)]
    fn try_lock_exclusive(file: &File) -> io::Result<()> {
        let fd = file.as_raw_fd();
        let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if result != 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock
                || err.raw_os_error() == Some(libc::EWOULDBLOCK)
                || err.raw_os_error() == Some(libc::EAGAIN)
            {
                return Err(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    "library is in use by another process (daemon or CLI)",
                ));
            }
            return Err(err);
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn try_lock_exclusive(_file: &File) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for LibraryLock {
    fn drop(&mut self) {
        let fd = self.file.as_raw_fd();
        unsafe { libc::flock(fd, libc::LOCK_UN) };
    }
}
