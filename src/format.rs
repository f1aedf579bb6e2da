//! On-disk container format.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic "SFCR" (4) | version (1) | salt len (1) | salt (16)
//! | iterations (4) | base nonce (16)
//! | repeated: ciphertext len (4) | ciphertext + tag
//! ```
//!
//! A header with `iterations == 0` marks a container sealed with an
//! externally supplied key rather than a password-derived one; the salt
//! field is all zeros in that case.

use std::io::{self, Read, Write};

use crate::crypto::{BASE_NONCE_LEN, CHUNK_LEN, SALT_LEN, TAG_LEN};
use crate::error::{CryptoError, Result};

/// Magic bytes identifying a SafeFolder container ("SFCR").
pub const MAGIC: &[u8; MAGIC_LEN] = b"SFCR";
/// Length of the magic bytes.
pub const MAGIC_LEN: usize = 4;
/// Length of the version field.
pub const VER_LEN: usize = 1;
/// Length of the salt-length field.
pub const SALT_LEN_FIELD: usize = 1;
/// Length of the iteration-count field.
pub const ITER_LEN: usize = 4;
/// Length of a chunk record's length prefix.
pub const RECORD_LEN_FIELD: usize = 4;

/// Current container version.
pub const VERSION_V1: u8 = 1;

/// Largest valid chunk record: a full plaintext chunk plus its tag.
pub const MAX_RECORD_LEN: usize = CHUNK_LEN + TAG_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    version: u8,
    salt: [u8; SALT_LEN],
    iterations: u32,
    base_nonce: [u8; BASE_NONCE_LEN],
}

impl Header {
    pub const LEN: usize =
        MAGIC_LEN + VER_LEN + SALT_LEN_FIELD + SALT_LEN + ITER_LEN + BASE_NONCE_LEN;

    /// Header for a password-derived key.
    pub fn new(salt: [u8; SALT_LEN], iterations: u32, base_nonce: [u8; BASE_NONCE_LEN]) -> Self {
        Self {
            version: VERSION_V1,
            salt,
            iterations,
            base_nonce,
        }
    }

    /// Header for an externally supplied key (interop path).
    pub fn external_key(base_nonce: [u8; BASE_NONCE_LEN]) -> Self {
        Self {
            version: VERSION_V1,
            salt: [0u8; SALT_LEN],
            iterations: 0,
            base_nonce,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn base_nonce(&self) -> &[u8; BASE_NONCE_LEN] {
        &self.base_nonce
    }

    /// `true` when the key was supplied by the caller rather than derived
    /// from a password.
    pub fn is_external_key(&self) -> bool {
        self.iterations == 0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);

        buf.extend_from_slice(MAGIC);
        buf.push(self.version);
        buf.push(SALT_LEN as u8);
        buf.extend_from_slice(&self.salt);
        buf.extend_from_slice(&self.iterations.to_le_bytes());
        buf.extend_from_slice(&self.base_nonce);

        buf
    }

    /// Parses a header from the start of `reader`.
    ///
    /// The version byte is checked before any later field is touched, so
    /// a future-format file fails with `UnsupportedVersion` rather than a
    /// misleading parse error.
    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        let mut prefix = [0u8; MAGIC_LEN + VER_LEN];
        read_exact_or_format(reader, &mut prefix, "container shorter than magic")?;

        if &prefix[..MAGIC_LEN] != MAGIC {
            return Err(CryptoError::Format("not a SafeFolder container".into()));
        }

        let version = prefix[MAGIC_LEN];
        if version != VERSION_V1 {
            return Err(CryptoError::UnsupportedVersion(version));
        }

        let mut salt_len = [0u8; SALT_LEN_FIELD];
        read_exact_or_format(reader, &mut salt_len, "truncated header")?;
        if salt_len[0] as usize != SALT_LEN {
            return Err(CryptoError::Format(format!(
                "unexpected salt length {}",
                salt_len[0]
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        read_exact_or_format(reader, &mut salt, "truncated header")?;

        let mut iter_bytes = [0u8; ITER_LEN];
        read_exact_or_format(reader, &mut iter_bytes, "truncated header")?;
        let iterations = u32::from_le_bytes(iter_bytes);

        let mut base_nonce = [0u8; BASE_NONCE_LEN];
        read_exact_or_format(reader, &mut base_nonce, "truncated header")?;

        Ok(Self {
            version,
            salt,
            iterations,
            base_nonce,
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = data;
        Self::read_from(&mut cursor)
    }
}

/// Appends one chunk record (length prefix + sealed bytes) to `writer`.
pub fn write_record(writer: &mut impl Write, sealed: &[u8]) -> Result<()> {
    debug_assert!(sealed.len() <= MAX_RECORD_LEN);
    writer.write_all(&(sealed.len() as u32).to_le_bytes())?;
    writer.write_all(sealed)?;
    Ok(())
}

/// Reads the next chunk record, or `None` at a clean end of stream.
///
/// A record length below the tag size or above [`MAX_RECORD_LEN`] cannot
/// have been produced by this engine and fails with `Format`, as does a
/// stream that ends mid-record.
pub fn read_record(reader: &mut impl Read) -> Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; RECORD_LEN_FIELD];
    match read_fully(reader, &mut len_bytes)? {
        0 => return Ok(None),
        n if n < RECORD_LEN_FIELD => {
            return Err(CryptoError::Format(
                "container truncated inside record length".into(),
            ));
        }
        _ => {}
    }

    let len = u32::from_le_bytes(len_bytes) as usize;
    if !(TAG_LEN..=MAX_RECORD_LEN).contains(&len) {
        return Err(CryptoError::Format(format!("invalid record length {len}")));
    }

    let mut sealed = vec![0u8; len];
    read_exact_or_format(reader, &mut sealed, "container truncated inside record")?;
    Ok(Some(sealed))
}

fn read_exact_or_format(reader: &mut impl Read, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CryptoError::Format(what.into())
        } else {
            CryptoError::Io(e)
        }
    })
}

/// Reads as many bytes as possible into `buf`, returning how many were
/// read. Distinguishes clean EOF (0) from a short read mid-buffer.
fn read_fully(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CryptoError::Io(e)),
        }
    }
    Ok(filled)
}
