//! The encrypt-in-place shredding workflow.
//!
//! One call takes a target and a secret through mode selection, key
//! derivation, the staged record write, the swap, and directory-entry
//! removal. Secret and key material live in zeroize-on-drop wrappers,
//! so destruction happens on every exit path without per-branch
//! cleanup.

use std::io::{BufWriter, Write};

use tracing::{info, warn};

use crate::config::OperationConfig;
use crate::replace::{ReplaceMode, StagedWrite};
use cryptoshred_common::{Error, Result};
use cryptoshred_crypto::{
    derive_key, encrypt_stream, generate_salt, CipherMode, DerivedKey, Secret,
};
use cryptoshred_storage::Target;

/// Capability for obtaining the user's secret before a keyed operation.
///
/// Implementations may block a thread, poll a channel, or return a
/// canned value; the engine does not care. `Ok(None)` means the user
/// declined, which is a normal cancellation rather than an error.
pub trait PasswordProvider: Send + Sync {
    fn obtain(&self) -> Result<Option<Secret>>;
}

/// Provider returning a fixed secret, for tests and non-interactive callers.
pub struct FixedPassword {
    bytes: Option<Vec<u8>>,
}

impl FixedPassword {
    /// Always supply the given passphrase.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    /// Always decline, as a user cancelling the prompt would.
    pub fn declined() -> Self {
        Self { bytes: None }
    }
}

impl PasswordProvider for FixedPassword {
    fn obtain(&self) -> Result<Option<Secret>> {
        Ok(self.bytes.as_deref().map(Secret::from_slice))
    }
}

/// What one completed shred did.
pub struct ShredSummary {
    /// Cipher mode selected from the input size.
    pub mode: CipherMode,
    /// Whether the swap was staged or an in-place overwrite.
    pub replace_mode: ReplaceMode,
    /// Plaintext bytes consumed.
    pub plaintext_len: u64,
    /// Total record bytes produced.
    pub record_len: u64,
    /// Directory-entry removal result; `None` when not requested.
    pub deleted: Option<bool>,
    /// The derived key, present only when the caller asked to keep it
    /// (`destroy_key_material: false`). Zeroizes when dropped.
    pub key: Option<DerivedKey>,
}

/// Outcome of a [`shred`] call.
pub enum ShredOutcome {
    Completed(ShredSummary),
    /// No secret was provided; nothing was touched.
    Cancelled,
}

/// Run the full shred workflow against one target.
///
/// Obtains a secret, encrypts the target in place, and removes the
/// directory entry if the config asks for it. Entry removal is skipped
/// when the swap reported an indeterminate state, since the visible name may
/// no longer be the file that was just written.
pub fn shred(
    target: &dyn Target,
    provider: &dyn PasswordProvider,
    config: &OperationConfig,
) -> Result<ShredOutcome> {
    let secret = match provider.obtain()? {
        Some(secret) => secret,
        None => {
            info!(target = %target.display_name(), "No secret provided, shred cancelled");
            return Ok(ShredOutcome::Cancelled);
        }
    };

    let mut summary = encrypt_in_place(target, secret, config)?;

    if config.delete_after_encrypt {
        match target.delete() {
            Ok(()) => summary.deleted = Some(true),
            Err(e) => {
                warn!(
                    target = %target.display_name(),
                    error = %e,
                    "Record in place but directory entry could not be removed"
                );
                summary.deleted = Some(false);
            }
        }
    }

    Ok(ShredOutcome::Completed(summary))
}

/// Encrypt a target in place with an ephemeral password-derived key.
///
/// Consumes the secret; both it and the derived key are zeroized before
/// this returns, on success and on every failure branch alike (unless
/// the config explicitly keeps the key, in which case it rides out in
/// the summary and the caller owns it).
///
/// # Errors
/// - `Error::Unreadable`: the source could not be opened or read; nothing written
/// - `Error::WriteFailed`: staging write failed; original untouched, staging removed
/// - `Error::CommitFailed`: swap aborted; original preserved
/// - `Error::CommitIndeterminate`: swap half-done; must be surfaced to the operator
pub fn encrypt_in_place(
    target: &dyn Target,
    secret: Secret,
    config: &OperationConfig,
) -> Result<ShredSummary> {
    let plaintext_len = target
        .size()
        .map_err(|e| Error::Unreadable(format!("{}", e)))?;
    let mode = CipherMode::for_plaintext_len(plaintext_len, config.mode_threshold);

    let salt = generate_salt();
    let key = derive_key(&secret, &salt);
    // The working copy of the secret is spent once the key exists.
    drop(secret);

    let reader = target
        .open_read()
        .map_err(|e| Error::Unreadable(format!("{}", e)))?;

    let staged = StagedWrite::begin(target)?;
    let replace_mode = staged.mode();
    let mut writer = BufWriter::new(staged.open_write()?);

    let written = encrypt_stream(reader, &mut writer, &key, &salt, mode)?;
    writer
        .flush()
        .map_err(|e| Error::WriteFailed(format!("flushing record: {}", e)))?;
    // Close the output handle before the swap renames it.
    drop(writer);

    let replace_mode_used = staged.commit()?;
    debug_assert_eq!(replace_mode, replace_mode_used);

    info!(
        target = %target.display_name(),
        mode = ?mode,
        bytes = written,
        "Target encrypted in place"
    );

    Ok(ShredSummary {
        mode,
        replace_mode,
        plaintext_len: written,
        record_len: mode.record_len(written),
        deleted: None,
        key: if config.destroy_key_material {
            None
        } else {
            Some(key)
        },
    })
}
