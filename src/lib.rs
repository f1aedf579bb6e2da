//! Password-based file encryption engine for the SafeFolder application.
//!
//! Files are encrypted into a chunked container: a fixed header carrying
//! the PBKDF2 salt, iteration count, and per-file base nonce, followed by
//! 64 KiB XChaCha20-Poly1305 records. Every chunk is individually
//! authenticated and bound to its position, so bit flips, reordering, and
//! truncation all fail decryption rather than yielding garbage.
//!
//! Two surfaces are provided on top of the same engine:
//!
//! - the Rust API below ([`encrypt_file`], [`decrypt_file`],
//!   [`derive_key`], and the `_with_key` variants), used by the `sfcrypt`
//!   binary;
//! - the C ABI in [`ffi`], preserving the exported entry points the
//!   managed application calls through P/Invoke.

mod crypto;
mod engine;
mod error;
pub mod ffi;
mod format;
mod storage;

pub use crate::crypto::{CHUNK_LEN, KEY_LEN, SALT_LEN};
pub use crate::crypto::kdf::{DEFAULT_ITERATIONS, KdfParams, MIN_SALT_LEN};
pub use crate::engine::{
    decrypt_file, decrypt_file_with_key, encrypt_file, encrypt_file_with_key,
};
pub use crate::error::{CryptoError, ErrorCode, Result};

/// Derives key bytes from a password with PBKDF2-HMAC-SHA256.
///
/// Exposed for callers that need the key directly, e.g. to verify a
/// password without decrypting a file. Rejects zero iterations, salts
/// shorter than [`MIN_SALT_LEN`], and empty output buffers with
/// [`CryptoError::InvalidParameter`].
pub fn derive_key(password: &[u8], salt: &[u8], iterations: u32, out: &mut [u8]) -> Result<()> {
    crypto::derive_key(password, salt, iterations, out)
}
