//! Shredding engine for CryptoShred.
//!
//! Ties the cryptographic core to the target transports:
//! - [`replace`]: staged writes with a failure-safe swap protocol
//! - [`shred`]: the encrypt-in-place workflow, key lifecycle included
//! - [`wipe`]: bounded, cancelable free-space overwrite
//!
//! All operations here are synchronous and single-threaded; callers run
//! them on background workers and marshal progress back themselves. Two
//! operations must never share a target, and a wipe must not run
//! concurrently with encryption in the same directory; both are
//! caller-level invariants.

pub mod config;
pub mod replace;
pub mod shred;
pub mod wipe;

pub use config::OperationConfig;
pub use replace::{ReplaceMode, StagedWrite};
pub use shred::{
    encrypt_in_place, shred, FixedPassword, PasswordProvider, ShredOutcome, ShredSummary,
};
pub use wipe::{
    wipe, CancelToken, NoProgress, PassReport, ProgressSink, WipeOptions, WipeReport,
};
