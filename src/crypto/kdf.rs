//! PBKDF2-HMAC-SHA256 key derivation.

use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;

use super::SALT_LEN;
use crate::error::{CryptoError, Result};

/// Default iteration count, sized so one derivation takes on the order of
/// 100 ms on commodity hardware. Stored in the container header, so files
/// written with an older default remain readable if this is raised.
pub const DEFAULT_ITERATIONS: u32 = 310_000;

/// Minimum accepted salt length in bytes.
pub const MIN_SALT_LEN: usize = SALT_LEN;

#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl KdfParams {
    pub fn new(iterations: u32) -> Result<Self> {
        let params = Self { iterations };
        params.validate()?;
        Ok(params)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations < 1 {
            return Err(CryptoError::InvalidParameter(
                "PBKDF2 iterations must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Derive `out.len()` key bytes from `password` and `salt`.
///
/// Deterministic: identical inputs always produce identical output. Output
/// lengths beyond one SHA-256 block are handled by the PBKDF2 block
/// counter inside the `pbkdf2` crate.
///
/// # Errors
///
/// `InvalidParameter` when `iterations == 0`, the salt is shorter than
/// [`MIN_SALT_LEN`], or `out` is empty.
pub fn derive_key(password: &[u8], salt: &[u8], iterations: u32, out: &mut [u8]) -> Result<()> {
    if iterations < 1 {
        return Err(CryptoError::InvalidParameter(
            "PBKDF2 iterations must be >= 1",
        ));
    }
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::InvalidParameter("salt must be >= 16 bytes"));
    }
    if out.is_empty() {
        return Err(CryptoError::InvalidParameter(
            "derived key length must be >= 1",
        ));
    }

    pbkdf2::<Hmac<Sha256>>(password, salt, iterations, out)
        .map_err(|_| CryptoError::InvalidParameter("derived key length out of range"))?;
    Ok(())
}
