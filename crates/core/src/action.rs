//! Per-file unblock action
//!
//! "Unblocking" means removing the mark-of-the-web metadata a browser attaches
//! to a downloaded file. The operation is idempotent and must succeed quietly
//! when the file has already vanished, since the sweep may run well after the
//! user moved or deleted the download.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

/// Executes the platform unblock operation for one file
pub trait UnblockAction: Send + Sync {
    /// Must be a no-op (not an error) when `path` no longer exists
    fn unblock(&self, path: &Path) -> Result<()>;
}

/// Removes download-quarantine metadata from a file
///
/// Windows: deletes the `Zone.Identifier` alternate data stream.
/// macOS: strips the `com.apple.quarantine` extended attribute.
/// Other platforms have no download-quarantine convention.
pub struct MarkOfTheWebRemover;

impl UnblockAction for MarkOfTheWebRemover {
    fn unblock(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            debug!("{} no longer exists, nothing to unblock", path.display());
            return Ok(());
        }

        remove_mark(path)
    }
}

#[cfg(windows)]
fn remove_mark(path: &Path) -> Result<()> {
    use anyhow::Context;

    // The mark of the web lives in an alternate data stream next to the file
    // content; deleting the stream leaves the file itself untouched.
    let mut stream = path.as_os_str().to_os_string();
    stream.push(":Zone.Identifier");

    match std::fs::remove_file(&stream) {
        Ok(()) => Ok(()),
        // Already unmarked
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| {
            format!("failed to remove Zone.Identifier from {}", path.display())
        }),
    }
}

#[cfg(target_os = "macos")]
fn remove_mark(path: &Path) -> Result<()> {
    use anyhow::Context;
    use std::process::{Command, Stdio};

    let status = Command::new("xattr")
        .arg("-d")
        .arg("com.apple.quarantine")
        .arg(path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("failed to run xattr")?;

    // xattr exits nonzero when the attribute is absent; already unmarked then
    if !status.success() {
        debug!("{} carried no quarantine attribute", path.display());
    }

    Ok(())
}

#[cfg(not(any(windows, target_os = "macos")))]
fn remove_mark(path: &Path) -> Result<()> {
    debug!(
        "no download-quarantine convention on this platform, skipping {}",
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_a_no_op() {
        let temp_dir = TempDir::new().unwrap();
        let gone = temp_dir.path().join("already-deleted.zip");

        let action = MarkOfTheWebRemover;
        assert!(action.unblock(&gone).is_ok());
    }

    #[test]
    fn existing_unmarked_file_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("download.bin");
        fs::write(&file, b"payload").unwrap();

        let action = MarkOfTheWebRemover;
        assert!(action.unblock(&file).is_ok());

        // File content is untouched
        assert_eq!(fs::read(&file).unwrap(), b"payload");
    }
}
