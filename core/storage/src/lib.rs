//! Target transports for CryptoShred.
//!
//! The engine only needs a readable and writable byte stream over a
//! named target; this crate defines that capability and two transports:
//! a direct filesystem path (staging-and-rename capable) and an
//! in-memory target (in-place only, used to exercise the degraded
//! replace mode in tests).

pub mod local;
pub mod memory;
pub mod target;

pub use local::{available_space, total_space, PathTarget};
pub use memory::MemoryTarget;
pub use target::{Staging, Target};
