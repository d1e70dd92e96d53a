//! Single-instance lock
//!
//! Only one daemon should watch the downloads directory per user; a second
//! `iub run` must notice the first and exit cleanly instead of double
//! unblocking. An flock-held file with the holder's PID inside covers both
//! live detection and stale-lock cleanup after a crash.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another instance is already running (pid {pid})")]
    AlreadyRunning { pid: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Exclusive per-user lock, released on drop
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

#[derive(Serialize, Deserialize)]
struct LockHolder {
    pid: u32,
    started_at_ms: u64,
}

impl InstanceLock {
    /// Acquire the lock at `path`, removing a stale lock left by a dead process
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        if !try_flock_exclusive(&file)? {
            match read_holder(&mut file) {
                Some(holder) if is_process_alive(holder.pid) => {
                    return Err(LockError::AlreadyRunning { pid: holder.pid });
                }
                _ => {
                    // Dead holder or unreadable content: clear it and retry
                    warn!("removing stale instance lock at {}", path.display());
                    drop(file);
                    std::fs::remove_file(path)?;
                    return Self::acquire(path);
                }
            }
        }

        write_holder(&mut file)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn read_holder(file: &mut File) -> Option<LockHolder> {
    file.seek(SeekFrom::Start(0)).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    serde_json::from_str(&contents).ok()
}

fn write_holder(file: &mut File) -> std::io::Result<()> {
    let holder = LockHolder {
        pid: std::process::id(),
        started_at_ms: std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0),
    };

    let serialized = serde_json::to_string(&holder)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()
}

/// Try to acquire an exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> std::io::Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(errno) => Err(errno.into()),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> std::io::Result<bool> {
    // No advisory locking here; the PID check below is the only guard
    Ok(true)
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Signal 0: existence check without delivering anything
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        // Permission denied or other: assume alive
        Err(_) => true,
    }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}
