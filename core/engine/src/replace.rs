//! Staged writes with a failure-safe swap.
//!
//! The swap protocol keeps the target in one of two observable states:
//! fully the original, or fully the replacement. Output goes to a
//! staging sibling first; `commit` then removes the original and
//! renames the staging entry over its name. Transports without staging
//! support degrade to the explicit [`ReplaceMode::Overwrite`], which
//! still destroys the plaintext but gives up the atomicity guarantee.

use std::io::Write;

use tracing::{debug, warn};

use cryptoshred_common::{Error, Result};
use cryptoshred_storage::{Staging, Target};

/// How the replacement reached the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceMode {
    /// Output staged next to the original and swapped in on commit.
    Staged,
    /// Output written directly over the original (truncate-and-overwrite).
    Overwrite,
}

/// Scoped handle for one replace operation.
///
/// If `commit` is never called, dropping the handle removes the staging
/// artifact. In overwrite mode there is nothing to roll back: the
/// original is consumed as it is rewritten.
pub struct StagedWrite<'a> {
    target: &'a dyn Target,
    staging: Option<Box<dyn Staging>>,
    committed: bool,
}

impl<'a> StagedWrite<'a> {
    /// Begin a replace operation against `target`.
    pub fn begin(target: &'a dyn Target) -> Result<StagedWrite<'a>> {
        let staging = target.begin_staging()?;
        if staging.is_none() {
            debug!(
                target = %target.display_name(),
                "Transport offers no staging; replace degrades to overwrite"
            );
        }
        Ok(Self {
            target,
            staging,
            committed: false,
        })
    }

    /// The mode this operation runs in.
    pub fn mode(&self) -> ReplaceMode {
        if self.staging.is_some() {
            ReplaceMode::Staged
        } else {
            ReplaceMode::Overwrite
        }
    }

    /// Open the output stream for the replacement bytes.
    pub fn open_write(&self) -> Result<Box<dyn Write + Send>> {
        match &self.staging {
            Some(staging) => staging
                .open_write()
                .map_err(|e| Error::WriteFailed(format!("opening staging: {}", e))),
            None => self
                .target
                .open_write(true)
                .map_err(|e| Error::WriteFailed(format!("opening target: {}", e))),
        }
    }

    /// Swap the staged output into place.
    ///
    /// # Preconditions
    /// - All writers from [`StagedWrite::open_write`] are flushed and dropped.
    ///
    /// # Errors
    /// - `Error::CommitFailed` if the original could not be removed; the
    ///   staging artifact is cleaned up and the original is untouched.
    /// - `Error::CommitIndeterminate` if the original was removed but
    ///   the rename failed. The staging artifact is left for inspection
    ///   and nothing further may assume the target's name is valid.
    pub fn commit(mut self) -> Result<ReplaceMode> {
        let mode = self.mode();
        self.committed = true;

        if let Some(staging) = &self.staging {
            if let Err(e) = self.target.delete() {
                if let Err(remove_err) = staging.remove() {
                    warn!(error = %remove_err, "Failed to remove staging artifact after aborted commit");
                }
                return Err(Error::CommitFailed(format!(
                    "could not remove original '{}': {}",
                    self.target.display_name(),
                    e
                )));
            }

            if let Err(e) = staging.rename_into_place() {
                return Err(Error::CommitIndeterminate(format!(
                    "staged output for '{}' not renamed: {}",
                    self.target.display_name(),
                    e
                )));
            }
        }

        Ok(mode)
    }
}

impl Drop for StagedWrite<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Some(staging) = &self.staging {
            if let Err(e) = staging.remove() {
                warn!(error = %e, "Failed to remove staging artifact");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptoshred_storage::{MemoryTarget, PathTarget};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_commit_swaps_staged_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.bin");
        fs::write(&path, b"plaintext").unwrap();

        let target = PathTarget::new(&path);
        let staged = StagedWrite::begin(&target).unwrap();
        assert_eq!(staged.mode(), ReplaceMode::Staged);

        let mut writer = staged.open_write().unwrap();
        writer.write_all(b"replacement").unwrap();
        drop(writer);

        assert_eq!(staged.commit().unwrap(), ReplaceMode::Staged);
        assert_eq!(fs::read(&path).unwrap(), b"replacement");
        assert!(!temp.path().join("a.bin.enc").exists());
    }

    #[test]
    fn test_drop_without_commit_cleans_staging() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.bin");
        fs::write(&path, b"plaintext").unwrap();

        let target = PathTarget::new(&path);
        {
            let staged = StagedWrite::begin(&target).unwrap();
            let mut writer = staged.open_write().unwrap();
            writer.write_all(b"partial").unwrap();
            drop(writer);
            // dropped without commit
        }

        assert_eq!(fs::read(&path).unwrap(), b"plaintext");
        assert!(!temp.path().join("a.bin.enc").exists());
    }

    #[test]
    fn test_overwrite_mode_for_non_staging_transport() {
        let target = MemoryTarget::new("mem", b"plaintext".to_vec());
        let staged = StagedWrite::begin(&target).unwrap();
        assert_eq!(staged.mode(), ReplaceMode::Overwrite);

        let mut writer = staged.open_write().unwrap();
        writer.write_all(b"overwritten").unwrap();
        writer.flush().unwrap();
        drop(writer);

        assert_eq!(staged.commit().unwrap(), ReplaceMode::Overwrite);
        assert_eq!(target.content().unwrap(), b"overwritten");
    }
}
