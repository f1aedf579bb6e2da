//! OS-backed cryptographic random source.
//!
//! All salts and nonces come from here. There is no fallback: if the OS
//! generator cannot be reached the operation aborts with
//! [`RandomSourceUnavailable`](CryptoError::RandomSourceUnavailable).

use getrandom::fill;

use super::{BASE_NONCE_LEN, SALT_LEN};
use crate::error::{CryptoError, Result};

/// Fill buffer with cryptographically secure random bytes.
pub fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| CryptoError::RandomSourceUnavailable)
}

/// Generate a fresh per-file salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate a fresh per-file base nonce.
pub fn generate_base_nonce() -> Result<[u8; BASE_NONCE_LEN]> {
    let mut nonce = [0u8; BASE_NONCE_LEN];
    secure_random(&mut nonce)?;
    Ok(nonce)
}
