//! # Signer Recovery (secp256k1)
//!
//! Recovers the address that produced an Ethereum `personal_sign` signature
//! over a message.
//!
//! ## Security Notes
//!
//! - Signature length is checked before any curve operation
//! - High-S signatures are normalized to their low-S twin before recovery,
//!   so both encodings recover the same key
//! - Uses k256 crate for cryptographic operations

use super::entities::Address;
use super::errors::SubmissionError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

/// 32-byte digest.
pub type Hash = [u8; 32];

/// `r(32) || s(32) || v(1)`
pub const SIGNATURE_LENGTH: usize = 65;

/// Prefix applied by `personal_sign` before hashing.
const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

// =============================================================================
// RECOVERY
// =============================================================================

/// Recover the signer address of `message` from a hex signature.
///
/// The signature may carry a `0x` prefix and must decode to exactly 65 bytes.
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<Address, SubmissionError> {
    let signature = decode_signature(signature_hex)?;
    let digest = personal_message_hash(message.as_bytes());
    recover_from_prehash(&digest, &signature)
}

/// Decode a hex signature into its 65 raw bytes.
pub fn decode_signature(signature_hex: &str) -> Result<[u8; SIGNATURE_LENGTH], SubmissionError> {
    let digits = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    let bytes =
        hex::decode(digits).map_err(|e| SubmissionError::InvalidSignatureEncoding(e.to_string()))?;

    <[u8; SIGNATURE_LENGTH]>::try_from(bytes.as_slice()).map_err(|_| {
        SubmissionError::InvalidSignatureLength {
            actual: bytes.len(),
        }
    })
}

/// Recover the signer address from a 32-byte digest and a raw signature.
pub fn recover_from_prehash(
    digest: &Hash,
    signature: &[u8; SIGNATURE_LENGTH],
) -> Result<Address, SubmissionError> {
    let mut recovery_id = parse_recovery_id(signature[64])?;

    let mut sig = Signature::from_slice(&signature[..64])
        .map_err(|e| SubmissionError::RecoveryFailure(format!("invalid scalars: {e}")))?;

    // k256 only verifies low-S; the mirrored point has the opposite y parity
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| SubmissionError::RecoveryFailure(e.to_string()))?;

    Ok(address_from_pubkey(&key))
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Keccak256 hash function.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest signed by `personal_sign`:
/// `keccak256("\x19Ethereum Signed Message:\n" + len(message) + message)`.
pub fn personal_message_hash(message: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Derive Ethereum address from public key.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> Address {
    let encoded = public_key.to_encoded_point(false);

    // Skip 0x04 prefix
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address(address)
}

/// Parse recovery ID from v value.
///
/// Valid v values: 0, 1, 27, 28
fn parse_recovery_id(v: u8) -> Result<RecoveryId, SubmissionError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => {
            return Err(SubmissionError::RecoveryFailure(format!(
                "invalid recovery id: {v}"
            )))
        }
    };

    RecoveryId::from_byte(id)
        .ok_or_else(|| SubmissionError::RecoveryFailure(format!("invalid recovery id: {v}")))
}

// =============================================================================
// TEST HELPERS
// =============================================================================


// =============================================================================
// UNIT TESTS
// =============================================================================
