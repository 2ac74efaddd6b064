//! Common error types for CryptoShred.

use thiserror::Error;

/// Top-level error type for CryptoShred operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Key derivation could not run in this environment.
    #[error("Key derivation failed: {0}")]
    Kdf(String),

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Authentication tag did not verify (wrong password or tampered data).
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Source target could not be opened or read.
    #[error("Source unreadable: {0}")]
    Unreadable(String),

    /// Writing the staged output failed. The original target is untouched
    /// and the staging artifact has been removed.
    #[error("Staging write failed: {0}")]
    WriteFailed(String),

    /// The replace swap was aborted before the original was removed.
    /// The original target is still present, still plaintext.
    #[error("Commit failed, original preserved: {0}")]
    CommitFailed(String),

    /// The original was removed but the staged output could not take its
    /// name. Target state is indeterminate and must be verified manually
    /// before anything else touches that name.
    #[error("Commit incomplete, original removed but replacement not in place; verify target state manually: {0}")]
    CommitIndeterminate(String),

    /// A wipe pass hit a write error that is not the expected
    /// out-of-space termination signal.
    #[error("Free-space wipe failed: {0}")]
    Wipe(String),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
