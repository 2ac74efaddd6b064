//! Key derivation using PBKDF2-HMAC-SHA256.
//!
//! The iteration count and key length are fixed constants rather than
//! caller-tunable parameters: every record produced by this engine must
//! carry the same derivation cost, and the record format has no field
//! for variable parameters.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::secret::{DerivedKey, Secret, KEY_LENGTH};

/// Length of the per-operation random salt in bytes.
pub const SALT_LEN: usize = 16;

/// PBKDF2 iteration count.
pub const ITERATIONS: u32 = 100_000;

/// Generate a fresh random salt.
///
/// Salts are never reused across operations; callers must generate a
/// new one per encryption.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Derive a 256-bit symmetric key from a secret and salt.
///
/// # Postconditions
/// - The derivation is deterministic: the same (secret, salt) pair
///   always yields the same key, which the decrypt/compare path relies on.
/// - The returned key zeroizes itself on drop.
///
/// PBKDF2-HMAC-SHA256 accepts any secret/salt pair, so this cannot fail.
pub fn derive_key(secret: &Secret, salt: &[u8; SALT_LEN]) -> DerivedKey {
    let mut key = [0u8; KEY_LENGTH];
    secret.expose(|password| {
        pbkdf2_hmac::<Sha256>(password, salt, ITERATIONS, &mut key);
    });
    DerivedKey::from_bytes(key)
}
