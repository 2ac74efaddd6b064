//! Direct filesystem path transport.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::target::{Staging, Target};
use cryptoshred_common::{Error, Result};

/// Suffix for staging siblings created next to the original.
const STAGING_SUFFIX: &str = "enc";

/// A target backed by a directly accessible filesystem path.
///
/// The default constructor is staging-capable: output is written to a
/// suffixed sibling and renamed over the original. [`PathTarget::in_place`]
/// models transports that only hand out read/write streams for an
/// already-open entry (opaque content handles); those targets report no
/// staging capability and are rewritten by truncate-and-overwrite.
pub struct PathTarget {
    path: PathBuf,
    staging_capable: bool,
}

impl PathTarget {
    /// Create a staging-capable target for a filesystem path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            staging_capable: true,
        }
    }

    /// Create a target that only supports in-place overwrite.
    pub fn in_place(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            staging_capable: false,
        }
    }

    /// The underlying filesystem path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(STAGING_SUFFIX);
        self.path.with_file_name(name)
    }
}

impl Target for PathTarget {
    fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn size(&self) -> Result<u64> {
        if !self.path.exists() {
            return Err(Error::NotFound(format!(
                "target not found: {}",
                self.path.display()
            )));
        }
        Ok(fs::metadata(&self.path)?.len())
    }

    fn open_read(&self) -> Result<Box<dyn Read + Send>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(file))
    }

    fn open_write(&self, truncate: bool) -> Result<Box<dyn Write + Send>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(&self.path)?;
        Ok(Box::new(file))
    }

    fn delete(&self) -> Result<()> {
        fs::remove_file(&self.path)?;
        Ok(())
    }

    fn begin_staging(&self) -> Result<Option<Box<dyn Staging>>> {
        if !self.staging_capable {
            return Ok(None);
        }
        let staging = self.staging_path();
        debug!(staging = %staging.display(), "Opening staging sibling");
        Ok(Some(Box::new(PathStaging {
            staging,
            original: self.path.clone(),
        })))
    }
}

/// Staging sibling for [`PathTarget`].
struct PathStaging {
    staging: PathBuf,
    original: PathBuf,
}

impl Staging for PathStaging {
    fn open_write(&self) -> Result<Box<dyn Write + Send>> {
        let file = File::create(&self.staging)?;
        Ok(Box::new(file))
    }

    fn rename_into_place(&self) -> Result<()> {
        fs::rename(&self.staging, &self.original)?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.staging) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Free space available in the filesystem holding `dir`, in bytes.
pub fn available_space(dir: &Path) -> Result<u64> {
    Ok(fs2::available_space(dir)?)
}

/// Total size of the filesystem holding `dir`, in bytes.
pub fn total_space(dir: &Path) -> Result<u64> {
    Ok(fs2::total_space(dir)?)
}
