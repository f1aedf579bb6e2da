//! Per-chunk authenticated encryption with XChaCha20-Poly1305.
//!
//! Each chunk is sealed under a nonce built from the per-file base nonce
//! and the chunk's index, so a (key, nonce) pair is never reused and a
//! chunk cannot be silently moved to another position. The associated
//! data binds the container version and a final-chunk flag, which makes
//! truncating the record stream detectable.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use zeroize::Zeroizing;

use super::{BASE_NONCE_LEN, KEY_LEN, NONCE_LEN};
use crate::error::{CryptoError, Result};

/// Build the 24-byte chunk nonce: base nonce followed by the
/// little-endian chunk index.
fn chunk_nonce(base: &[u8; BASE_NONCE_LEN], index: u64) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[..BASE_NONCE_LEN].copy_from_slice(base);
    nonce[BASE_NONCE_LEN..].copy_from_slice(&index.to_le_bytes());
    nonce
}

/// Associated data authenticated alongside each chunk.
fn chunk_aad(version: u8, is_last: bool) -> [u8; 2] {
    [version, is_last as u8]
}

/// Encrypt one plaintext chunk, returning ciphertext with the Poly1305
/// tag appended.
pub fn seal_chunk(
    key: &[u8; KEY_LEN],
    base_nonce: &[u8; BASE_NONCE_LEN],
    index: u64,
    version: u8,
    is_last: bool,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = chunk_nonce(base_nonce, index);
    let aad = chunk_aad(version, is_last);

    cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| CryptoError::InvalidParameter("chunk too large to seal"))
}

/// Decrypt and authenticate one chunk.
///
/// Any mismatch — wrong key, flipped bit, wrong index, wrong final-chunk
/// flag — yields [`AuthenticationFailed`](CryptoError::AuthenticationFailed)
/// with no plaintext surfaced.
pub fn open_chunk(
    key: &[u8; KEY_LEN],
    base_nonce: &[u8; BASE_NONCE_LEN],
    index: u64,
    version: u8,
    is_last: bool,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = chunk_nonce(base_nonce, index);
    let aad = chunk_aad(version, is_last);

    let plaintext = cipher
        .decrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailed)?;
    Ok(Zeroizing::new(plaintext))
}
