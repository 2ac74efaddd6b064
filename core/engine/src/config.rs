//! Per-operation configuration.

use cryptoshred_crypto::DEFAULT_MODE_THRESHOLD;

/// Configuration for a single shred operation.
///
/// Always passed explicitly into each call. Key destruction and
/// deletion behavior are security-critical and must never depend on
/// ambient process state.
#[derive(Debug, Clone)]
pub struct OperationConfig {
    /// Destroy the derived key inside the operation. When false (debug
    /// decrypt/compare workflows only) the key is handed back to the
    /// caller, who then owns its destruction.
    pub destroy_key_material: bool,

    /// Remove the target's directory entry after the encrypted record
    /// is in place.
    pub delete_after_encrypt: bool,

    /// Plaintext size above which the cipher switches from the
    /// authenticated mode to the tagless stream mode. Raising this
    /// buys tamper evidence for larger files at a memory cost; the
    /// tradeoff only affects corruption detection, not recoverability.
    pub mode_threshold: u64,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            destroy_key_material: true,
            delete_after_encrypt: true,
            mode_threshold: DEFAULT_MODE_THRESHOLD,
        }
    }
}
