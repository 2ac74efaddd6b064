//! Free-space overwrite.
//!
//! A wipe pass fills the target directory's filesystem with filler
//! artifacts full of random data until the volume reports out of space,
//! then removes every artifact. Out-of-space is the expected,
//! successful termination signal for a pass; any other write error
//! aborts the pass. Cleanup runs exactly once per pass, on success,
//! failure, and cancellation alike.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::RngCore;
use serde::Serialize;
use tracing::{debug, info, warn};

use cryptoshred_common::{Error, Result};
use cryptoshred_storage::available_space;

/// Chunk size for filler writes (1 MiB of fresh random data per chunk).
pub const WIPE_CHUNK_SIZE: usize = 1024 * 1024;

/// Size cap per filler artifact, to bound single-file metadata overhead.
pub const ARTIFACT_SIZE_CAP: u64 = 100 * 1024 * 1024;

/// Name of the transient filler sub-directory.
const FILLER_DIR: &str = ".wipe_tmp";

/// Options for a wipe invocation.
#[derive(Debug, Clone)]
pub struct WipeOptions {
    /// Number of independent passes; each re-fills whatever the
    /// previous pass's cleanup freed.
    pub passes: u32,
    /// Bytes of random data per write.
    pub chunk_size: usize,
    /// Cap on a single filler artifact's size.
    pub artifact_cap: u64,
    /// Optional upper bound on bytes written per pass. Reaching it ends
    /// the pass the same way out-of-space does.
    pub max_bytes_per_pass: Option<u64>,
}

impl Default for WipeOptions {
    fn default() -> Self {
        Self {
            passes: 1,
            chunk_size: WIPE_CHUNK_SIZE,
            artifact_cap: ARTIFACT_SIZE_CAP,
            max_bytes_per_pass: None,
        }
    }
}

/// Cooperative cancellation signal, polled between chunk writes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The in-flight pass still cleans up its
    /// artifacts before returning.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Receiver for wipe progress.
///
/// Percent is derived from bytes written over the free-space estimate
/// taken at pass start, clamped to 100, and never decreases within a
/// pass.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, bytes_written: u64);
}

/// Sink that discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8, _bytes_written: u64) {}
}

impl<F> ProgressSink for F
where
    F: Fn(u8, u64) + Send + Sync,
{
    fn report(&self, percent: u8, bytes_written: u64) {
        self(percent, bytes_written)
    }
}

/// Result of a single wipe pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    /// Zero-based pass index.
    pub pass: u32,
    /// Free space reported for the volume at pass start.
    pub free_space_estimate: u64,
    /// Bytes of random data written (full chunks only, so never more
    /// than physically reached the volume).
    pub bytes_written: u64,
    /// Filler artifacts created during the pass.
    pub artifacts_created: u32,
    /// Filler artifacts successfully removed during cleanup.
    pub artifacts_removed: u32,
    /// Whether the pass ended on the expected out-of-space signal.
    pub out_of_space: bool,
}

/// Aggregate result of a wipe invocation.
#[derive(Debug, Clone, Serialize)]
pub struct WipeReport {
    pub passes: Vec<PassReport>,
    pub total_bytes_written: u64,
    /// Filler entries that could not be removed. The space they occupy
    /// stays unavailable until reclaimed manually.
    pub residual: Vec<PathBuf>,
    pub cancelled: bool,
}

/// Overwrite all free space reachable through `dir`, then reclaim it.
///
/// Cancellation is a normal outcome: the report carries
/// `cancelled: true` and cleanup has already run.
///
/// # Errors
/// - `Error::InvalidInput` if `dir` is not a directory
/// - `Error::Wipe` for any filler write error other than out-of-space
///   (the failing pass has cleaned up its artifacts)
pub fn wipe(
    dir: &Path,
    options: &WipeOptions,
    progress: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<WipeReport> {
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut report = WipeReport {
        passes: Vec::new(),
        total_bytes_written: 0,
        residual: Vec::new(),
        cancelled: false,
    };

    for pass in 0..options.passes.max(1) {
        let (pass_report, cancelled) =
            run_pass(dir, options, progress, cancel, pass, &mut report.residual)?;
        report.total_bytes_written += pass_report.bytes_written;
        report.passes.push(pass_report);
        if cancelled {
            report.cancelled = true;
            break;
        }
    }

    Ok(report)
}

/// One fill-then-reclaim cycle.
fn run_pass(
    dir: &Path,
    options: &WipeOptions,
    progress: &dyn ProgressSink,
    cancel: &CancelToken,
    pass: u32,
    residual: &mut Vec<PathBuf>,
) -> Result<(PassReport, bool)> {
    let free_space_estimate = available_space(dir)?;
    debug!(pass, free = free_space_estimate, "Starting wipe pass");

    let filler_dir = dir.join(FILLER_DIR);
    fs::create_dir_all(&filler_dir)?;

    let mut artifacts: Vec<PathBuf> = Vec::new();
    let mut bytes_written: u64 = 0;
    let mut out_of_space = false;
    let mut cancelled = false;
    let mut failure: Option<Error> = None;
    let mut chunk = vec![0u8; options.chunk_size];
    let mut rng = rand::rng();

    'fill: for index in 0u32.. {
        let path = filler_dir.join(format!("filler_{:04}.bin", index));
        let mut file = match File::create(&path) {
            Ok(file) => file,
            Err(e) if is_out_of_space(&e) => {
                out_of_space = true;
                break 'fill;
            }
            Err(e) => {
                failure = Some(Error::Wipe(format!("creating filler artifact: {}", e)));
                break 'fill;
            }
        };
        artifacts.push(path);

        let mut artifact_len: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'fill;
            }

            rng.fill_bytes(&mut chunk);
            match file.write_all(&chunk) {
                Ok(()) => {}
                Err(e) if is_out_of_space(&e) => {
                    out_of_space = true;
                    break 'fill;
                }
                Err(e) => {
                    failure = Some(Error::Wipe(format!("writing filler data: {}", e)));
                    break 'fill;
                }
            }
            bytes_written += chunk.len() as u64;
            artifact_len += chunk.len() as u64;

            let percent = (bytes_written.saturating_mul(100) / free_space_estimate.max(1))
                .min(100) as u8;
            progress.report(percent, bytes_written);

            if let Some(max) = options.max_bytes_per_pass {
                if bytes_written >= max {
                    break 'fill;
                }
            }
            if artifact_len >= options.artifact_cap {
                break;
            }
        }
    }

    // Cleanup runs exactly once, whatever ended the fill loop.
    let artifacts_created = artifacts.len() as u32;
    let mut artifacts_removed = 0u32;
    for path in &artifacts {
        match fs::remove_file(path) {
            Ok(()) => artifacts_removed += 1,
            Err(e) => {
                warn!(artifact = %path.display(), error = %e, "Filler artifact not removed");
                residual.push(path.clone());
            }
        }
    }
    if let Err(e) = fs::remove_dir(&filler_dir) {
        warn!(dir = %filler_dir.display(), error = %e, "Filler directory not removed");
        residual.push(filler_dir);
    }

    if let Some(e) = failure {
        return Err(e);
    }

    info!(
        pass,
        bytes = bytes_written,
        artifacts = artifacts_created,
        out_of_space,
        cancelled,
        "Wipe pass finished"
    );

    Ok((
        PassReport {
            pass,
            free_space_estimate,
            bytes_written,
            artifacts_created,
            artifacts_removed,
            out_of_space,
        },
        cancelled,
    ))
}

/// Whether an I/O error is the volume-full condition that legitimately
/// ends a pass.
fn is_out_of_space(e: &std::io::Error) -> bool {
    const ENOSPC: i32 = 28;
    e.kind() == std::io::ErrorKind::StorageFull || e.raw_os_error() == Some(ENOSPC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn bounded_options(max: u64) -> WipeOptions {
        WipeOptions {
            passes: 1,
            chunk_size: 4096,
            artifact_cap: 16 * 1024,
            max_bytes_per_pass: Some(max),
        }
    }

    #[test]
    fn test_bounded_wipe_fills_and_reclaims() {
        let temp = TempDir::new().unwrap();
        let options = bounded_options(64 * 1024);

        let report = wipe(temp.path(), &options, &NoProgress, &CancelToken::new()).unwrap();

        assert_eq!(report.total_bytes_written, 64 * 1024);
        assert!(!report.cancelled);
        assert!(report.residual.is_empty());

        let pass = &report.passes[0];
        assert_eq!(pass.artifacts_created, 4);
        assert_eq!(pass.artifacts_removed, 4);
        assert!(!pass.out_of_space);
        assert!(pass.bytes_written <= pass.free_space_estimate);

        // No filler artifacts left behind.
        assert!(!temp.path().join(FILLER_DIR).exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_multiple_passes_are_independent() {
        let temp = TempDir::new().unwrap();
        let options = WipeOptions {
            passes: 2,
            ..bounded_options(8 * 1024)
        };

        let report = wipe(temp.path(), &options, &NoProgress, &CancelToken::new()).unwrap();

        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.total_bytes_written, 2 * 8 * 1024);
        assert!(!temp.path().join(FILLER_DIR).exists());
    }

    #[test]
    fn test_cancelled_pass_still_cleans_up() {
        let temp = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = wipe(temp.path(), &bounded_options(1 << 30), &NoProgress, &cancel).unwrap();

        assert!(report.cancelled);
        assert_eq!(report.total_bytes_written, 0);
        assert_eq!(report.passes.len(), 1);
        assert!(!temp.path().join(FILLER_DIR).exists());
    }

    #[test]
    fn test_progress_is_monotone_and_clamped() {
        let temp = TempDir::new().unwrap();
        let seen: Arc<Mutex<Vec<(u8, u64)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |percent: u8, bytes: u64| {
                seen.lock().unwrap().push((percent, bytes));
            }
        };

        wipe(
            temp.path(),
            &bounded_options(32 * 1024),
            &sink,
            &CancelToken::new(),
        )
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 8);
        for window in seen.windows(2) {
            assert!(window[1].0 >= window[0].0);
            assert!(window[1].1 > window[0].1);
        }
        assert!(seen.iter().all(|(p, _)| *p <= 100));
    }

    #[test]
    fn test_wipe_rejects_non_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, b"x").unwrap();

        let result = wipe(&file, &WipeOptions::default(), &NoProgress, &CancelToken::new());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_zero_passes_clamps_to_one() {
        let temp = TempDir::new().unwrap();
        let options = WipeOptions {
            passes: 0,
            ..bounded_options(4096)
        };

        let report = wipe(temp.path(), &options, &NoProgress, &CancelToken::new()).unwrap();
        assert_eq!(report.passes.len(), 1);
    }
}
