//! CryptoShred CLI - Command line interface for crypto-shredding.
//!
//! This tool plays the caller role for the engine: it prompts for the
//! password, runs each operation on a blocking worker, wires Ctrl-C to
//! the wiper's cancellation token, and reports outcomes.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use cryptoshred_common::Error;
use cryptoshred_crypto::{decrypt_stream, CipherMode, Secret, DEFAULT_MODE_THRESHOLD};
use cryptoshred_engine::{
    shred, CancelToken, OperationConfig, PasswordProvider, ProgressSink, ShredOutcome,
    WipeOptions,
};
use cryptoshred_storage::{available_space, total_space, PathTarget};

#[derive(Parser)]
#[command(name = "cryptoshred")]
#[command(about = "CryptoShred - render file content unrecoverable")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt files in place with an ephemeral key and remove them.
    Shred {
        /// Files to shred.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Leave the encrypted record in place instead of deleting it.
        #[arg(long)]
        keep_file: bool,

        /// Plaintext size threshold (bytes) for switching from the
        /// authenticated cipher to the tagless stream cipher.
        #[arg(long, default_value_t = DEFAULT_MODE_THRESHOLD)]
        threshold: u64,

        /// Overwrite in place instead of staging and renaming. Loses
        /// the atomic-replace guarantee; matches transports that cannot
        /// rename.
        #[arg(long)]
        in_place: bool,
    },

    /// Overwrite all free space under a directory with random data.
    Wipe {
        /// Directory on the volume to wipe.
        dir: PathBuf,

        /// Number of passes.
        #[arg(short, long, default_value_t = 1)]
        passes: u32,

        /// Stop each pass after writing this many bytes instead of
        /// running to out-of-space.
        #[arg(long)]
        max_bytes: Option<u64>,

        /// Print the wipe report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Decrypt a record produced by shred (debug aid).
    Recover {
        /// Encrypted record.
        file: PathBuf,

        /// Where to write the recovered plaintext.
        #[arg(short, long)]
        out: PathBuf,

        /// Force the tagless stream mode instead of inferring it.
        #[arg(long)]
        stream_only: bool,
    },

    /// Show total and free space for a directory's volume.
    Space {
        /// Directory to inspect.
        dir: PathBuf,
    },
}

/// Provider handing the engine a fresh copy of the prompted password.
struct PromptedPassword {
    bytes: Zeroizing<Vec<u8>>,
}

impl PasswordProvider for PromptedPassword {
    fn obtain(&self) -> cryptoshred_common::Result<Option<Secret>> {
        Ok(Some(Secret::from_slice(&self.bytes)))
    }
}

/// Progress printer that logs every five percentage points.
struct StepProgress {
    last: AtomicU8,
}

impl ProgressSink for StepProgress {
    fn report(&self, percent: u8, bytes_written: u64) {
        let last = self.last.load(Ordering::Relaxed);
        if percent >= last.saturating_add(5) || (percent == 100 && last != 100) {
            self.last.store(percent, Ordering::Relaxed);
            info!(percent, bytes = bytes_written, "Wiping free space");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Shred {
            files,
            keep_file,
            threshold,
            in_place,
        } => shred_files(files, keep_file, threshold, in_place).await,
        Commands::Wipe {
            dir,
            passes,
            max_bytes,
            json,
        } => wipe_dir(dir, passes, max_bytes, json).await,
        Commands::Recover {
            file,
            out,
            stream_only,
        } => recover_file(file, out, stream_only).await,
        Commands::Space { dir } => show_space(dir),
    }
}

/// Prompt for a password twice and return it, or `None` if the user
/// declined by entering nothing.
fn prompt_password_confirmed() -> Result<Option<Zeroizing<Vec<u8>>>> {
    let first = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if first.is_empty() {
        return Ok(None);
    }
    let second = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);
    if *first != *second {
        bail!("passwords do not match");
    }
    Ok(Some(Zeroizing::new(first.as_bytes().to_vec())))
}

async fn shred_files(
    files: Vec<PathBuf>,
    keep_file: bool,
    threshold: u64,
    in_place: bool,
) -> Result<()> {
    let Some(password) = prompt_password_confirmed()? else {
        info!("No password entered, shred cancelled");
        return Ok(());
    };

    let provider = Arc::new(PromptedPassword { bytes: password });
    let config = OperationConfig {
        delete_after_encrypt: !keep_file,
        mode_threshold: threshold,
        ..OperationConfig::default()
    };

    let total = files.len();
    let mut completed = 0usize;
    let mut failed = 0usize;
    let mut indeterminate: Vec<String> = Vec::new();

    for (i, path) in files.into_iter().enumerate() {
        let name = path.display().to_string();
        info!(file = %name, "Shredding ({}/{})", i + 1, total);

        let provider = Arc::clone(&provider);
        let config = config.clone();
        let result = tokio::task::spawn_blocking(move || {
            let target = if in_place {
                PathTarget::in_place(&path)
            } else {
                PathTarget::new(&path)
            };
            shred(&target, provider.as_ref(), &config)
        })
        .await
        .context("shred worker panicked")?;

        match result {
            Ok(ShredOutcome::Completed(summary)) => {
                completed += 1;
                info!(
                    file = %name,
                    mode = ?summary.mode,
                    bytes = summary.plaintext_len,
                    deleted = ?summary.deleted,
                    "Shredded"
                );
                if summary.deleted == Some(false) {
                    failed += 1;
                    warn!(file = %name, "Encrypted record left behind, entry removal failed");
                }
            }
            Ok(ShredOutcome::Cancelled) => {
                info!(file = %name, "Cancelled");
            }
            Err(Error::CommitIndeterminate(reason)) => {
                failed += 1;
                indeterminate.push(name.clone());
                warn!(file = %name, %reason, "TARGET STATE INDETERMINATE");
            }
            Err(e) => {
                failed += 1;
                warn!(file = %name, error = %e, "Shred failed");
            }
        }
    }

    info!(completed, failed, "Shred finished");

    if !indeterminate.is_empty() {
        bail!(
            "operation outcome indeterminate for {}: the original entry was removed but the \
             replacement may not be under the expected name; verify target state manually",
            indeterminate.join(", ")
        );
    }
    if failed > 0 {
        bail!("{} of {} files not fully shredded", failed, total);
    }
    Ok(())
}

async fn wipe_dir(
    dir: PathBuf,
    passes: u32,
    max_bytes: Option<u64>,
    json: bool,
) -> Result<()> {
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Cancellation requested, cleaning up filler artifacts");
                cancel.cancel();
            }
        });
    }

    let options = WipeOptions {
        passes,
        max_bytes_per_pass: max_bytes,
        ..WipeOptions::default()
    };

    let report = {
        let dir = dir.clone();
        tokio::task::spawn_blocking(move || {
            let progress = StepProgress {
                last: AtomicU8::new(0),
            };
            cryptoshred_engine::wipe(&dir, &options, &progress, &cancel)
        })
        .await
        .context("wipe worker panicked")??
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        info!(
            dir = %dir.display(),
            bytes = report.total_bytes_written,
            passes = report.passes.len(),
            cancelled = report.cancelled,
            "Wipe finished"
        );
        for leak in &report.residual {
            warn!(artifact = %leak.display(), "Residual filler artifact not reclaimed");
        }
    }

    if !report.residual.is_empty() {
        bail!(
            "{} filler artifacts could not be removed and still occupy space",
            report.residual.len()
        );
    }
    Ok(())
}

async fn recover_file(file: PathBuf, out: PathBuf, stream_only: bool) -> Result<()> {
    let password = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if password.is_empty() {
        info!("No password entered, recover cancelled");
        return Ok(());
    }

    let record_len = fs::metadata(&file)
        .with_context(|| format!("cannot read {}", file.display()))?
        .len();
    let mode = if stream_only {
        CipherMode::StreamOnly
    } else {
        CipherMode::infer_from_record_len(record_len, DEFAULT_MODE_THRESHOLD)
    };
    info!(file = %file.display(), ?mode, "Recovering");

    let secret = Secret::from_slice(password.as_bytes());
    let out_path = out.clone();
    let result = tokio::task::spawn_blocking(move || -> cryptoshred_common::Result<u64> {
        use std::io::Write;
        let reader = std::io::BufReader::new(fs::File::open(&file)?);
        let mut writer = std::io::BufWriter::new(fs::File::create(&out_path)?);
        let bytes = decrypt_stream(reader, &mut writer, &secret, mode)?;
        writer.flush()?;
        Ok(bytes)
    })
    .await
    .context("recover worker panicked")?;

    match result {
        Ok(bytes) => {
            info!(out = %out.display(), bytes, "Recovered");
            Ok(())
        }
        Err(e) => {
            // Leave no partial plaintext behind.
            let _ = fs::remove_file(&out);
            Err(e).context("recovery failed")
        }
    }
}

fn show_space(dir: PathBuf) -> Result<()> {
    let free = available_space(&dir)?;
    let total = total_space(&dir)?;
    println!(
        "{}: {} bytes free of {} total",
        dir.display(),
        free,
        total
    );
    Ok(())
}
