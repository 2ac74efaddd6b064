//! Cryptographic core for CryptoShred.
//!
//! This module provides:
//! - Password-based key derivation using PBKDF2-HMAC-SHA256
//! - Size-gated cipher selection: AES-256-GCM for small inputs,
//!   AES-256-CTR keystream for large ones
//! - Secure secret and key wrappers with automatic zeroization
//! - Streaming record transforms over `std::io` readers and writers
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Salts and IVs are generated fresh per operation and never reused

pub mod cipher;
pub mod kdf;
pub mod secret;

pub use cipher::{
    decrypt_stream, digest_stream, encrypt_stream, CipherMode, CHUNK_SIZE, CTR_IV_LEN,
    DEFAULT_MODE_THRESHOLD, GCM_IV_LEN, TAG_LEN,
};
pub use kdf::{derive_key, generate_salt, ITERATIONS, SALT_LEN};
pub use secret::{DerivedKey, Secret, KEY_LENGTH};
