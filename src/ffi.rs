//! C ABI for the SafeFolder managed application.
//!
//! The exported signatures mirror the original native module: the caller
//! derives a file key with [`DeriveKeyPBKDF2`] (keeping salt and
//! iteration count on its side) and passes the raw key to
//! [`EncryptFile`]/[`DecryptFile`]. Paths are NUL-terminated UTF-16, the
//! password is a NUL-terminated byte string.
//!
//! The boolean returns keep the original ABI shape; the actual failure
//! cause is retrievable per thread through [`LastErrorCode`] and
//! [`LastErrorMessage`]. Every pointer/length pair is validated before
//! use, and nothing secret is ever logged or stored.

use std::cell::RefCell;
use std::ffi::{CStr, c_char, c_int};
use std::path::PathBuf;
use std::slice;

use crate::crypto::{self, KEY_LEN};
use crate::engine;
use crate::error::{CryptoError, ErrorCode, Result};

thread_local! {
    static LAST_ERROR: RefCell<Option<CryptoError>> = const { RefCell::new(None) };
}

fn finish(result: Result<()>) -> bool {
    match result {
        Ok(()) => {
            LAST_ERROR.with(|e| *e.borrow_mut() = None);
            true
        }
        Err(err) => {
            LAST_ERROR.with(|e| *e.borrow_mut() = Some(err));
            false
        }
    }
}

/// Reads a NUL-terminated UTF-16 string (wchar_t* on Windows).
///
/// # Safety
///
/// `ptr` must either be null or point to a NUL-terminated u16 sequence.
unsafe fn utf16_path(ptr: *const u16) -> Result<PathBuf> {
    if ptr.is_null() {
        return Err(CryptoError::InvalidParameter("path pointer is null"));
    }

    let mut len = 0usize;
    // SAFETY: caller guarantees NUL termination.
    while unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    if len == 0 {
        return Err(CryptoError::InvalidParameter("path is empty"));
    }

    // SAFETY: len u16s before the terminator, per the scan above.
    let units = unsafe { slice::from_raw_parts(ptr, len) };
    let s = String::from_utf16(units)
        .map_err(|_| CryptoError::InvalidParameter("path is not valid UTF-16"))?;
    Ok(PathBuf::from(s))
}

/// # Safety
///
/// `key` must point to `key_len` readable bytes.
unsafe fn key_from_raw(key: *const u8, key_len: c_int) -> Result<[u8; KEY_LEN]> {
    if key.is_null() {
        return Err(CryptoError::InvalidParameter("key pointer is null"));
    }
    if key_len != KEY_LEN as c_int {
        return Err(CryptoError::InvalidParameter("key must be 32 bytes"));
    }

    // SAFETY: non-null and exactly KEY_LEN bytes, checked above.
    let bytes = unsafe { slice::from_raw_parts(key, KEY_LEN) };
    let mut out = [0u8; KEY_LEN];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// Encrypts `input_path` to `output_path` with a caller-derived 32-byte key.
///
/// Returns `true` on success. On failure the output path is left
/// untouched and the cause is available via [`LastErrorCode`].
///
/// # Safety
///
/// `input_path` and `output_path` must be NUL-terminated UTF-16 strings;
/// `key` must point to `key_len` readable bytes. All pointers must stay
/// valid for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn EncryptFile(
    input_path: *const u16,
    output_path: *const u16,
    key: *const u8,
    key_len: c_int,
) -> bool {
    finish((|| {
        // SAFETY: forwarded caller contract.
        let input = unsafe { utf16_path(input_path) }?;
        let output = unsafe { utf16_path(output_path) }?;
        let key = unsafe { key_from_raw(key, key_len) }?;
        engine::encrypt_file_with_key(&input, &output, &key)
    })())
}

/// Decrypts a container produced by [`EncryptFile`] with the same key.
///
/// # Safety
///
/// Same contract as [`EncryptFile`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn DecryptFile(
    input_path: *const u16,
    output_path: *const u16,
    key: *const u8,
    key_len: c_int,
) -> bool {
    finish((|| {
        // SAFETY: forwarded caller contract.
        let input = unsafe { utf16_path(input_path) }?;
        let output = unsafe { utf16_path(output_path) }?;
        let key = unsafe { key_from_raw(key, key_len) }?;
        engine::decrypt_file_with_key(&input, &output, &key)
    })())
}

/// Derives `output_key_len` bytes from `password` and `salt` with
/// PBKDF2-HMAC-SHA256.
///
/// Deterministic; the caller is responsible for persisting salt and
/// iteration count for later re-derivation.
///
/// # Safety
///
/// `password` must be a NUL-terminated byte string; `salt` must point to
/// `salt_len` readable bytes; `output_key` must point to
/// `output_key_len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn DeriveKeyPBKDF2(
    password: *const c_char,
    salt: *const u8,
    salt_len: c_int,
    iterations: c_int,
    output_key: *mut u8,
    output_key_len: c_int,
) -> bool {
    finish((|| {
        if password.is_null() {
            return Err(CryptoError::InvalidParameter("password pointer is null"));
        }
        if salt.is_null() || salt_len < 0 {
            return Err(CryptoError::InvalidParameter("salt buffer is invalid"));
        }
        if iterations < 1 {
            return Err(CryptoError::InvalidParameter(
                "PBKDF2 iterations must be >= 1",
            ));
        }
        if output_key.is_null() || output_key_len < 1 {
            return Err(CryptoError::InvalidParameter("output buffer is invalid"));
        }

        // SAFETY: pointers checked non-null; lengths are the caller's
        // declared buffer sizes.
        let password = unsafe { CStr::from_ptr(password) }.to_bytes();
        let salt = unsafe { slice::from_raw_parts(salt, salt_len as usize) };
        let out = unsafe { slice::from_raw_parts_mut(output_key, output_key_len as usize) };

        crypto::derive_key(password, salt, iterations as u32, out)
    })())
}

/// Returns the error code of the most recent failed call on this thread,
/// or `0` if the last call succeeded.
#[unsafe(no_mangle)]
pub extern "C" fn LastErrorCode() -> i32 {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map_or(ErrorCode::Ok as i32, |err| err.code() as i32)
    })
}

/// Copies the most recent error message into `buf` as NUL-terminated
/// UTF-8, truncating if needed.
///
/// Returns the full message length in bytes (excluding the NUL), so a
/// caller can size a buffer by passing a null `buf`. Returns `0` when
/// the last call succeeded.
///
/// # Safety
///
/// `buf` must either be null or point to `buf_len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LastErrorMessage(buf: *mut c_char, buf_len: c_int) -> c_int {
    LAST_ERROR.with(|e| {
        let borrowed = e.borrow();
        let Some(err) = borrowed.as_ref() else {
            return 0;
        };
        let msg = err.to_string();

        if !buf.is_null() && buf_len > 0 {
            let capacity = (buf_len - 1) as usize;
            let n = msg.len().min(capacity);
            // SAFETY: buf has buf_len writable bytes per the caller.
            unsafe {
                std::ptr::copy_nonoverlapping(msg.as_ptr(), buf.cast::<u8>(), n);
                *buf.add(n) = 0;
            }
        }

        msg.len() as c_int
    })
}
