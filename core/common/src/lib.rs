//! Common error type shared across CryptoShred modules.
//!
//! Every crate in the workspace reports failures through the [`Error`]
//! enum defined here, so callers see one consistent taxonomy regardless
//! of which layer failed.

pub mod error;

pub use error::{Error, Result};
