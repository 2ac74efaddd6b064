//! Record transforms over byte streams.
//!
//! Encryption is size-gated: inputs at or below the mode threshold use
//! AES-256-GCM and carry a trailing authentication tag; larger inputs
//! use an AES-256-CTR keystream with no tag. Authenticated encryption
//! needs the whole input buffered to place the tag, which is cheap for
//! small files; above the threshold the stream cipher keeps memory flat
//! at the cost of tamper evidence. The produced record is about to be
//! deleted anyway, so the guarantee that actually matters (plaintext is
//! unrecoverable without the key) holds equally in both modes.
//!
//! Record layout:
//!
//! ```text
//! Authenticated: [salt:16][iv:12][ciphertext][tag:16]
//! StreamOnly:    [salt:16][iv:16][ciphertext]
//! ```

use std::io::{Read, Write};

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes256;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use ctr::Ctr128BE;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::kdf::{derive_key, SALT_LEN};
use crate::secret::{DerivedKey, Secret};
use cryptoshred_common::{Error, Result};

type Aes256Ctr = Ctr128BE<Aes256>;

/// IV length for the authenticated (GCM) mode.
pub const GCM_IV_LEN: usize = 12;

/// IV length for the stream-only (CTR) mode.
pub const CTR_IV_LEN: usize = 16;

/// Authentication tag length (GCM).
pub const TAG_LEN: usize = 16;

/// Chunk size for streaming transforms (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Default plaintext size threshold for switching cipher modes (20 MiB).
pub const DEFAULT_MODE_THRESHOLD: u64 = 20 * 1024 * 1024;

/// Cipher selection for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    /// AES-256-GCM with a trailing tag; tamper-evident.
    Authenticated,
    /// AES-256-CTR keystream; same length as the plaintext, no tag.
    StreamOnly,
}

impl CipherMode {
    /// Select the mode for a plaintext of the given size.
    ///
    /// Inputs at or below the threshold get the authenticated mode.
    pub fn for_plaintext_len(len: u64, threshold: u64) -> Self {
        if len <= threshold {
            CipherMode::Authenticated
        } else {
            CipherMode::StreamOnly
        }
    }

    /// Best-effort mode inference from a record's total length.
    ///
    /// Records up to `threshold + 44` bytes are classified as
    /// authenticated. Stream-only records whose plaintext was within a
    /// dozen bytes of the threshold fall inside that window and would be
    /// misclassified, so callers that know the mode should pass it
    /// explicitly instead.
    pub fn infer_from_record_len(record_len: u64, threshold: u64) -> Self {
        let max_authenticated =
            threshold + (SALT_LEN + GCM_IV_LEN + TAG_LEN) as u64;
        if record_len <= max_authenticated {
            CipherMode::Authenticated
        } else {
            CipherMode::StreamOnly
        }
    }

    /// IV length for this mode.
    pub fn iv_len(&self) -> usize {
        match self {
            CipherMode::Authenticated => GCM_IV_LEN,
            CipherMode::StreamOnly => CTR_IV_LEN,
        }
    }

    /// Total record length for a plaintext of the given size.
    pub fn record_len(&self, plaintext_len: u64) -> u64 {
        let tag = match self {
            CipherMode::Authenticated => TAG_LEN,
            CipherMode::StreamOnly => 0,
        };
        (SALT_LEN + self.iv_len() + tag) as u64 + plaintext_len
    }
}

/// Generate a fresh random IV of the given length (12 or 16 bytes).
fn generate_iv(len: usize) -> Vec<u8> {
    let mut iv = vec![0u8; len];
    rand::rng().fill_bytes(&mut iv);
    iv
}

/// Encrypt a byte stream into a record.
///
/// Writes `salt || iv || ciphertext (|| tag)` to `writer` and returns
/// the number of plaintext bytes consumed.
///
/// # Preconditions
/// - `mode` was chosen for the actual input size: the authenticated
///   path buffers the whole input and must only see inputs at or below
///   the mode threshold. The stream-only path never buffers more than
///   one chunk.
/// - `salt` is fresh for this operation; the IV is generated here and
///   is never reused.
///
/// # Errors
/// - `Error::Unreadable` if the input stream fails mid-read
/// - `Error::WriteFailed` if the output stream rejects a write
pub fn encrypt_stream<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    key: &DerivedKey,
    salt: &[u8; SALT_LEN],
    mode: CipherMode,
) -> Result<u64> {
    let iv = generate_iv(mode.iv_len());

    writer
        .write_all(salt)
        .map_err(|e| Error::WriteFailed(format!("writing salt: {}", e)))?;
    writer
        .write_all(&iv)
        .map_err(|e| Error::WriteFailed(format!("writing iv: {}", e)))?;

    match mode {
        CipherMode::Authenticated => {
            // Bounded by the mode threshold; see preconditions.
            let mut plaintext = Vec::new();
            let mut buffer = vec![0u8; CHUNK_SIZE];
            loop {
                let n = reader
                    .read(&mut buffer)
                    .map_err(|e| Error::Unreadable(format!("reading source: {}", e)))?;
                if n == 0 {
                    break;
                }
                plaintext.extend_from_slice(&buffer[..n]);
            }

            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| Error::Crypto(format!("invalid key: {}", e)))?;
            let ciphertext = cipher
                .encrypt(Nonce::from_slice(&iv), plaintext.as_slice())
                .map_err(|e| Error::Crypto(format!("encryption failed: {}", e)))?;

            writer
                .write_all(&ciphertext)
                .map_err(|e| Error::WriteFailed(format!("writing ciphertext: {}", e)))?;

            Ok(plaintext.len() as u64)
        }
        CipherMode::StreamOnly => {
            let iv_block: [u8; CTR_IV_LEN] = iv
                .as_slice()
                .try_into()
                .expect("iv length fixed by mode");
            let mut cipher = Aes256Ctr::new(&(*key.as_bytes()).into(), &iv_block.into());

            let mut buffer = vec![0u8; CHUNK_SIZE];
            let mut total = 0u64;
            loop {
                let n = reader
                    .read(&mut buffer)
                    .map_err(|e| Error::Unreadable(format!("reading source: {}", e)))?;
                if n == 0 {
                    break;
                }
                cipher.apply_keystream(&mut buffer[..n]);
                writer
                    .write_all(&buffer[..n])
                    .map_err(|e| Error::WriteFailed(format!("writing ciphertext: {}", e)))?;
                total += n as u64;
            }

            Ok(total)
        }
    }
}

/// Decrypt a record back into plaintext.
///
/// This is the inverse transform for the debug decrypt/compare path and
/// for tests; the shredding workflow itself never decrypts. The key is
/// re-derived from the secret and the salt read off the record, which
/// works because derivation is deterministic.
///
/// In authenticated mode a wrong secret or tampered record fails with
/// `Error::Auth` and nothing is written to `writer`. The stream-only
/// mode carries no tag: a wrong secret silently produces garbage.
pub fn decrypt_stream<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    secret: &Secret,
    mode: CipherMode,
) -> Result<u64> {
    let mut salt = [0u8; SALT_LEN];
    reader
        .read_exact(&mut salt)
        .map_err(|e| Error::Unreadable(format!("reading salt: {}", e)))?;

    let mut iv = vec![0u8; mode.iv_len()];
    reader
        .read_exact(&mut iv)
        .map_err(|e| Error::Unreadable(format!("reading iv: {}", e)))?;

    let key = derive_key(secret, &salt);

    match mode {
        CipherMode::Authenticated => {
            let mut ciphertext = Vec::new();
            reader
                .read_to_end(&mut ciphertext)
                .map_err(|e| Error::Unreadable(format!("reading ciphertext: {}", e)))?;

            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| Error::Crypto(format!("invalid key: {}", e)))?;
            let plaintext = cipher
                .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
                .map_err(|_| {
                    Error::Auth("invalid password or corrupted record".to_string())
                })?;

            writer.write_all(&plaintext)?;
            Ok(plaintext.len() as u64)
        }
        CipherMode::StreamOnly => {
            let iv_block: [u8; CTR_IV_LEN] = iv
                .as_slice()
                .try_into()
                .expect("iv length fixed by mode");
            let mut cipher = Aes256Ctr::new(&(*key.as_bytes()).into(), &iv_block.into());

            let mut buffer = vec![0u8; CHUNK_SIZE];
            let mut total = 0u64;
            loop {
                let n = reader
                    .read(&mut buffer)
                    .map_err(|e| Error::Unreadable(format!("reading ciphertext: {}", e)))?;
                if n == 0 {
                    break;
                }
                cipher.apply_keystream(&mut buffer[..n]);
                writer.write_all(&buffer[..n])?;
                total += n as u64;
            }
            Ok(total)
        }
    }
}

/// Compute the SHA-256 digest of a byte stream.
///
/// Used by the decrypt/compare path to check recovered plaintext
/// against the original without holding either in memory.
pub fn digest_stream<R: Read>(mut reader: R) -> Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::generate_salt;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn test_secret() -> Secret {
        Secret::from_slice(b"correct")
    }

    fn encrypt_to_vec(plaintext: &[u8], secret: &Secret, mode: CipherMode) -> Vec<u8> {
        let salt = generate_salt();
        let key = derive_key(secret, &salt);
        let mut record = Vec::new();
        encrypt_stream(Cursor::new(plaintext), &mut record, &key, &salt, mode).unwrap();
        record
    }

    #[test]
    fn test_mode_selection_threshold_boundary() {
        let threshold = DEFAULT_MODE_THRESHOLD;
        assert_eq!(
            CipherMode::for_plaintext_len(threshold, threshold),
            CipherMode::Authenticated
        );
        assert_eq!(
            CipherMode::for_plaintext_len(threshold + 1, threshold),
            CipherMode::StreamOnly
        );
        assert_eq!(
            CipherMode::for_plaintext_len(0, threshold),
            CipherMode::Authenticated
        );
    }

    #[test]
    fn test_record_len_formula() {
        assert_eq!(CipherMode::Authenticated.record_len(1000), 1000 + 16 + 12 + 16);
        assert_eq!(CipherMode::StreamOnly.record_len(1000), 1000 + 16 + 16);
    }

    #[test]
    fn test_authenticated_record_size() {
        let plaintext = vec![0xA5u8; 10 * 1024];
        let record = encrypt_to_vec(&plaintext, &test_secret(), CipherMode::Authenticated);
        assert_eq!(
            record.len() as u64,
            CipherMode::Authenticated.record_len(plaintext.len() as u64)
        );
    }

    #[test]
    fn test_stream_only_record_size() {
        // Forced mode lets the no-tag layout be checked without a >20 MiB fixture.
        let plaintext = vec![0x5Au8; 3 * CHUNK_SIZE + 17];
        let record = encrypt_to_vec(&plaintext, &test_secret(), CipherMode::StreamOnly);
        assert_eq!(
            record.len() as u64,
            CipherMode::StreamOnly.record_len(plaintext.len() as u64)
        );
    }

    #[test]
    fn test_record_starts_with_salt_and_fresh_iv() {
        let secret = test_secret();
        let salt = generate_salt();
        let key = derive_key(&secret, &salt);

        let mut record1 = Vec::new();
        let mut record2 = Vec::new();
        encrypt_stream(Cursor::new(b"data"), &mut record1, &key, &salt, CipherMode::Authenticated)
            .unwrap();
        encrypt_stream(Cursor::new(b"data"), &mut record2, &key, &salt, CipherMode::Authenticated)
            .unwrap();

        assert_eq!(record1[..SALT_LEN], salt);
        // Same key and salt, fresh IV each call.
        assert_ne!(
            &record1[SALT_LEN..SALT_LEN + GCM_IV_LEN],
            &record2[SALT_LEN..SALT_LEN + GCM_IV_LEN]
        );
    }

    #[test]
    fn test_roundtrip_authenticated() {
        let plaintext = b"the quick brown fox".to_vec();
        let secret = test_secret();
        let record = encrypt_to_vec(&plaintext, &secret, CipherMode::Authenticated);

        let mut recovered = Vec::new();
        decrypt_stream(Cursor::new(&record), &mut recovered, &secret, CipherMode::Authenticated)
            .unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn test_roundtrip_stream_only() {
        let plaintext = vec![7u8; 2 * CHUNK_SIZE + 5];
        let secret = test_secret();
        let record = encrypt_to_vec(&plaintext, &secret, CipherMode::StreamOnly);

        let mut recovered = Vec::new();
        decrypt_stream(Cursor::new(&record), &mut recovered, &secret, CipherMode::StreamOnly)
            .unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn test_wrong_password_fails_with_no_output() {
        let record = encrypt_to_vec(b"secret data", &test_secret(), CipherMode::Authenticated);

        let mut recovered = Vec::new();
        let result = decrypt_stream(
            Cursor::new(&record),
            &mut recovered,
            &Secret::from_slice(b"wrong"),
            CipherMode::Authenticated,
        );

        assert!(matches!(result, Err(Error::Auth(_))));
        assert!(recovered.is_empty());
    }

    #[test]
    fn test_tampered_record_fails() {
        let mut record = encrypt_to_vec(b"important", &test_secret(), CipherMode::Authenticated);
        let last = record.len() - 1;
        record[last] ^= 0xFF;

        let mut recovered = Vec::new();
        let result = decrypt_stream(
            Cursor::new(&record),
            &mut recovered,
            &test_secret(),
            CipherMode::Authenticated,
        );

        assert!(matches!(result, Err(Error::Auth(_))));
        assert!(recovered.is_empty());
    }

    #[test]
    fn test_empty_plaintext() {
        let secret = test_secret();
        let record = encrypt_to_vec(b"", &secret, CipherMode::Authenticated);
        assert_eq!(record.len(), SALT_LEN + GCM_IV_LEN + TAG_LEN);

        let mut recovered = Vec::new();
        decrypt_stream(Cursor::new(&record), &mut recovered, &secret, CipherMode::Authenticated)
            .unwrap();
        assert!(recovered.is_empty());
    }

    #[test]
    fn test_infer_mode_from_record_len() {
        let threshold = 1024;
        assert_eq!(
            CipherMode::infer_from_record_len(100, threshold),
            CipherMode::Authenticated
        );
        assert_eq!(
            CipherMode::infer_from_record_len(threshold + 45, threshold),
            CipherMode::StreamOnly
        );
    }

    #[test]
    fn test_digest_stream_matches_and_differs() {
        let d1 = digest_stream(Cursor::new(b"same bytes")).unwrap();
        let d2 = digest_stream(Cursor::new(b"same bytes")).unwrap();
        let d3 = digest_stream(Cursor::new(b"other bytes")).unwrap();
        assert_eq!(d1, d2);
        assert_ne!(d1, d3);
    }

    proptest! {
        // Key derivation is deliberately slow; keep the case count modest.
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_roundtrip_both_modes(plaintext in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let secret = Secret::from_slice(b"prop-secret");
            for mode in [CipherMode::Authenticated, CipherMode::StreamOnly] {
                let record = encrypt_to_vec(&plaintext, &secret, mode);
                prop_assert_eq!(record.len() as u64, mode.record_len(plaintext.len() as u64));

                let mut recovered = Vec::new();
                decrypt_stream(Cursor::new(&record), &mut recovered, &secret, mode).unwrap();
                prop_assert_eq!(&recovered, &plaintext);
            }
        }
    }
}
