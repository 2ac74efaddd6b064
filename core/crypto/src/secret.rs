//! Secret and key types with secure memory handling.
//!
//! Both types zeroize their memory on drop, so key hygiene holds on
//! every exit path without per-branch cleanup code.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of derived encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// A user-supplied passphrase or other sensitive byte buffer.
///
/// The buffer has a single owner, is never cloned, never appears in
/// `Debug` output, and is overwritten with zeros when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    data: Vec<u8>,
}

impl Secret {
    /// Create a new Secret, taking ownership of the byte vector.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Create a new Secret by copying a byte slice.
    pub fn from_slice(slice: &[u8]) -> Self {
        Self {
            data: slice.to_vec(),
        }
    }

    /// Length of the secret in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Access the secret through a closure.
    ///
    /// This is the only way to read the bytes; the exposure is scoped
    /// to the closure so copies do not escape.
    pub fn expose<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(&self.data)
    }

    /// Explicitly zeroize the secret ahead of drop.
    pub fn zeroize_now(&mut self) {
        self.data.zeroize();
    }
}

// No Clone: accidental copies would leave stray plaintext in memory.

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

/// Symmetric key derived from a password and salt.
///
/// Owned by a single operation; zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LENGTH],
}

impl DerivedKey {
    /// Create a derived key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Explicitly zeroize the key ahead of drop.
    pub fn zeroize_now(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_creation_and_access() {
        let secret = Secret::new(vec![1, 2, 3, 4]);
        assert_eq!(secret.len(), 4);

        let sum = secret.expose(|data| data.iter().sum::<u8>());
        assert_eq!(sum, 10);
    }

    #[test]
    fn test_secret_zeroize_clears_buffer() {
        let mut secret = Secret::new(vec![42, 43, 44]);
        secret.zeroize_now();
        // Vec zeroization clears length; the backing memory was zeroed first.
        assert!(secret.is_empty());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new(vec![1, 2, 3]);
        let debug_str = format!("{:?}", secret);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains('1'));
    }

    #[test]
    fn test_derived_key_zeroize() {
        let mut key = DerivedKey::from_bytes([7u8; KEY_LENGTH]);
        key.zeroize_now();
        assert_eq!(key.as_bytes(), &[0u8; KEY_LENGTH]);
    }

    #[test]
    fn test_derived_key_debug_redacted() {
        let key = DerivedKey::from_bytes([9u8; KEY_LENGTH]);
        assert_eq!(format!("{:?}", key), "DerivedKey([REDACTED])");
    }
}
