//! Streaming encryption and decryption.
//!
//! Plaintext is processed in [`CHUNK_LEN`] pieces with one record per
//! chunk. Both directions read one chunk ahead so the final chunk can be
//! sealed with the final-chunk flag set, which is what makes removing
//! trailing records detectable. Decryption fails closed: the first bad
//! tag aborts the operation and the temporary output is discarded, so a
//! caller never sees partial or unauthenticated plaintext.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use zeroize::Zeroizing;

use crate::crypto::{self, CHUNK_LEN, KEY_LEN, KdfParams};
use crate::error::{CryptoError, Result};
use crate::format::{self, Header};
use crate::storage::AtomicOutput;

/// Encrypts `input` to `output` with a key derived from `password`.
///
/// A fresh salt and base nonce are generated; salt, iteration count, and
/// base nonce are recorded in the container header so decryption can
/// re-derive the same key. The output is written atomically: on any
/// failure the destination is left untouched.
pub fn encrypt_file(input: &Path, output: &Path, password: &[u8], kdf: KdfParams) -> Result<()> {
    kdf.validate()?;

    let salt = crypto::generate_salt()?;
    let base_nonce = crypto::generate_base_nonce()?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    crypto::derive_key(password, &salt, kdf.iterations(), key.as_mut())?;

    let header = Header::new(salt, kdf.iterations(), base_nonce);
    encrypt_to_path(input, output, &key, &header)
}

/// Decrypts a password-based container back to plaintext.
///
/// The key is re-derived from the stored salt and iteration count. Wrong
/// password and tampering are indistinguishable: both fail with
/// [`AuthenticationFailed`](CryptoError::AuthenticationFailed).
pub fn decrypt_file(input: &Path, output: &Path, password: &[u8]) -> Result<()> {
    let mut reader = BufReader::new(open_input(input)?);
    let header = Header::read_from(&mut reader)?;

    if header.is_external_key() {
        return Err(CryptoError::Format(
            "container was sealed with an external key, not a password".into(),
        ));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    crypto::derive_key(password, header.salt(), header.iterations(), key.as_mut())?;

    decrypt_to_path(&mut reader, output, &key, &header)
}

/// Encrypts `input` to `output` with a caller-supplied 32-byte key.
///
/// This is the interop path: the calling application derives the key
/// itself (see [`crypto::derive_key`]) and keeps the salt on its side.
/// The header records an iteration count of zero to mark the key as
/// external.
pub fn encrypt_file_with_key(input: &Path, output: &Path, key: &[u8; KEY_LEN]) -> Result<()> {
    let base_nonce = crypto::generate_base_nonce()?;
    let header = Header::external_key(base_nonce);
    encrypt_to_path(input, output, key, &header)
}

/// Decrypts a container with a caller-supplied 32-byte key.
///
/// Accepts both external-key containers and password-based ones (for
/// callers that derived the key out of band with the header's salt).
pub fn decrypt_file_with_key(input: &Path, output: &Path, key: &[u8; KEY_LEN]) -> Result<()> {
    let mut reader = BufReader::new(open_input(input)?);
    let header = Header::read_from(&mut reader)?;
    decrypt_to_path(&mut reader, output, key, &header)
}

fn encrypt_to_path(input: &Path, output: &Path, key: &[u8; KEY_LEN], header: &Header) -> Result<()> {
    let mut reader = BufReader::new(open_input(input)?);
    let mut out = AtomicOutput::create(output)?;

    out.write_all(&header.to_bytes())?;
    encrypt_stream(&mut reader, &mut out, key, header)?;

    out.commit()
}

fn decrypt_to_path(
    reader: &mut impl Read,
    output: &Path,
    key: &[u8; KEY_LEN],
    header: &Header,
) -> Result<()> {
    let mut out = AtomicOutput::create(output)?;
    decrypt_stream(reader, &mut out, key, header)?;
    out.commit()
}

/// Chunks `reader` and appends sealed records to `writer`. The header
/// itself must already have been written.
pub fn encrypt_stream(
    reader: &mut impl Read,
    writer: &mut impl Write,
    key: &[u8; KEY_LEN],
    header: &Header,
) -> Result<()> {
    let mut index: u64 = 0;
    let mut current = read_chunk(reader)?;

    loop {
        // One chunk of lookahead tells us whether `current` is final.
        let next = read_chunk(reader)?;
        let is_last = next.is_empty();

        let sealed = crypto::seal_chunk(
            key,
            header.base_nonce(),
            index,
            header.version(),
            is_last,
            &current,
        )?;
        format::write_record(writer, &sealed)?;

        if is_last {
            return Ok(());
        }
        index += 1;
        current = next;
    }
}

/// Reads, authenticates, and writes out every record in order.
pub fn decrypt_stream(
    reader: &mut impl Read,
    writer: &mut impl Write,
    key: &[u8; KEY_LEN],
    header: &Header,
) -> Result<()> {
    let mut current = format::read_record(reader)?
        .ok_or_else(|| CryptoError::Format("container has no chunk records".into()))?;

    let mut index: u64 = 0;
    loop {
        let next = format::read_record(reader)?;
        let is_last = next.is_none();

        let plaintext = crypto::open_chunk(
            key,
            header.base_nonce(),
            index,
            header.version(),
            is_last,
            &current,
        )?;
        writer.write_all(&plaintext)?;

        match next {
            None => return Ok(()),
            Some(record) => {
                index += 1;
                current = record;
            }
        }
    }
}

/// Reads up to one full chunk, looping over short reads. Returns an
/// empty buffer only at end of input.
fn read_chunk(reader: &mut impl Read) -> Result<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(vec![0u8; CHUNK_LEN]);
    let mut filled = 0;

    while filled < CHUNK_LEN {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CryptoError::Io(e)),
        }
    }

    buf.truncate(filled);
    Ok(buf)
}

fn open_input(path: &Path) -> Result<File> {
    if path.as_os_str().is_empty() {
        return Err(CryptoError::InvalidParameter("input path is empty"));
    }

    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CryptoError::FileNotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => CryptoError::AccessDenied(path.to_path_buf()),
        _ => CryptoError::Io(e),
    })
}
