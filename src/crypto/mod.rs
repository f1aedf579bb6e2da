//! Cryptographic primitives for the file-encryption engine.
//!
//! Provides key derivation, per-chunk authenticated encryption, and the
//! OS-backed random source.

pub mod aead;
pub mod kdf;
pub mod rng;

pub use aead::{open_chunk, seal_chunk};
pub use kdf::{KdfParams, derive_key};
pub use rng::{generate_base_nonce, generate_salt, secure_random};

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the per-file base nonce (16 bytes).
pub const BASE_NONCE_LEN: usize = 16;
/// Length of the full per-chunk nonce (24 bytes for XChaCha20-Poly1305):
/// base nonce followed by the little-endian chunk index.
pub const NONCE_LEN: usize = 24;
/// Length of the Poly1305 authentication tag (16 bytes).
pub const TAG_LEN: usize = 16;
/// Plaintext chunk size (64 KiB). The final chunk may be shorter.
pub const CHUNK_LEN: usize = 64 * 1024;
