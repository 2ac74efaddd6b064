//! Target transport trait definitions.

use std::io::{Read, Write};

use cryptoshred_common::Result;

/// Byte-stream access to a single named target.
///
/// The engine is agnostic to how the streams were obtained: a direct
/// filesystem path, an opaque platform handle, or an in-memory buffer
/// all implement the same surface. The one capability difference that
/// matters, whether the transport can stage output next to the target
/// and atomically rename it into place, is reported through
/// [`Target::begin_staging`].
pub trait Target: Send + Sync {
    /// Human-readable name for logs and reports.
    fn display_name(&self) -> String;

    /// Current size of the target in bytes.
    fn size(&self) -> Result<u64>;

    /// Open the target for reading from the start.
    fn open_read(&self) -> Result<Box<dyn Read + Send>>;

    /// Open the target for writing.
    ///
    /// With `truncate` the existing content is discarded; this is the
    /// write path of the in-place (non-staging) replace mode.
    fn open_write(&self, truncate: bool) -> Result<Box<dyn Write + Send>>;

    /// Remove the target's directory entry.
    fn delete(&self) -> Result<()>;

    /// Begin a staged write next to this target.
    ///
    /// Returns `None` when the transport cannot offer staging plus
    /// rename semantics; the caller must then fall back to in-place
    /// overwrite and loses the atomic-replace guarantee.
    fn begin_staging(&self) -> Result<Option<Box<dyn Staging>>>;
}

/// A transient staging sibling produced by [`Target::begin_staging`].
///
/// The staging entry exists only for the duration of one replace
/// operation: it is either renamed over the original or removed.
pub trait Staging: Send {
    /// Open the staging entry for writing from the start.
    fn open_write(&self) -> Result<Box<dyn Write + Send>>;

    /// Rename the staged bytes over the original target's name.
    ///
    /// # Preconditions
    /// - The original's directory entry has already been removed.
    /// - All writers obtained from [`Staging::open_write`] are dropped.
    fn rename_into_place(&self) -> Result<()>;

    /// Remove the staging entry.
    ///
    /// Removing an already-removed entry is not an error.
    fn remove(&self) -> Result<()>;
}
