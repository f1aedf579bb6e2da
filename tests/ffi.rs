//! Exercises the C ABI the way the managed application calls it.

use std::ffi::{c_char, c_int};
use std::fs;
use std::path::Path;

use safefolder_crypto::ffi::{
    DecryptFile, DeriveKeyPBKDF2, EncryptFile, LastErrorCode, LastErrorMessage,
};
use tempfile::tempdir;

/// NUL-terminated UTF-16, as the wchar_t* marshalling produces.
fn wide(path: &Path) -> Vec<u16> {
    path.to_string_lossy()
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect()
}

fn derive(password: &[u8], salt: &[u8], iterations: i32, out: &mut [u8]) -> bool {
    let mut pw: Vec<u8> = password.to_vec();
    pw.push(0);
    unsafe {
        DeriveKeyPBKDF2(
            pw.as_ptr().cast::<c_char>(),
            salt.as_ptr(),
            salt.len() as c_int,
            iterations,
            out.as_mut_ptr(),
            out.len() as c_int,
        )
    }
}

#[test]
fn derive_key_is_deterministic() {
    let salt = [9u8; 16];
    let mut k1 = [0u8; 32];
    let mut k2 = [0u8; 32];

    assert!(derive(b"master", &salt, 1000, &mut k1));
    assert_eq!(LastErrorCode(), 0);
    assert!(derive(b"master", &salt, 1000, &mut k2));

    assert_eq!(k1, k2);
    assert_ne!(k1, [0u8; 32]);
}

#[test]
fn derive_key_rejects_bad_parameters() {
    let mut key = [0u8; 32];

    // Zero iterations.
    assert!(!derive(b"pw", &[0u8; 16], 0, &mut key));
    assert_eq!(LastErrorCode(), 1);

    // Negative iterations.
    assert!(!derive(b"pw", &[0u8; 16], -5, &mut key));
    assert_eq!(LastErrorCode(), 1);

    // Undersized salt.
    assert!(!derive(b"pw", &[0u8; 8], 1000, &mut key));
    assert_eq!(LastErrorCode(), 1);

    // Null password.
    let refused = unsafe {
        DeriveKeyPBKDF2(
            std::ptr::null(),
            [0u8; 16].as_ptr(),
            16,
            1000,
            key.as_mut_ptr(),
            32,
        )
    };
    assert!(!refused);
    assert_eq!(LastErrorCode(), 1);

    // Null output buffer.
    let refused = unsafe {
        DeriveKeyPBKDF2(
            c"pw".as_ptr(),
            [0u8; 16].as_ptr(),
            16,
            1000,
            std::ptr::null_mut(),
            32,
        )
    };
    assert!(!refused);
    assert_eq!(LastErrorCode(), 1);
}

#[test]
fn encrypt_decrypt_roundtrip_via_abi() {
    let dir = tempdir().unwrap();
    let plain = dir.path().join("report.txt");
    let sealed = dir.path().join("report.sfc");
    let restored = dir.path().join("report.out");

    fs::write(&plain, b"quarterly numbers").unwrap();

    let mut key = [0u8; 32];
    assert!(derive(b"master password", &[3u8; 16], 1000, &mut key));

    let in_w = wide(&plain);
    let sealed_w = wide(&sealed);
    let ok = unsafe { EncryptFile(in_w.as_ptr(), sealed_w.as_ptr(), key.as_ptr(), 32) };
    assert!(ok);
    assert_eq!(LastErrorCode(), 0);

    let out_w = wide(&restored);
    let ok = unsafe { DecryptFile(sealed_w.as_ptr(), out_w.as_ptr(), key.as_ptr(), 32) };
    assert!(ok);

    assert_eq!(fs::read(&restored).unwrap(), b"quarterly numbers");
}

#[test]
fn wrong_key_reports_authentication_failure() {
    let dir = tempdir().unwrap();
    let plain = dir.path().join("a.txt");
    let sealed = dir.path().join("a.sfc");

    fs::write(&plain, b"data").unwrap();

    let key = [1u8; 32];
    let in_w = wide(&plain);
    let sealed_w = wide(&sealed);
    assert!(unsafe { EncryptFile(in_w.as_ptr(), sealed_w.as_ptr(), key.as_ptr(), 32) });

    let wrong = [2u8; 32];
    let out = dir.path().join("a.out");
    let out_w = wide(&out);
    let ok = unsafe { DecryptFile(sealed_w.as_ptr(), out_w.as_ptr(), wrong.as_ptr(), 32) };

    assert!(!ok);
    assert_eq!(LastErrorCode(), 6);
    assert!(!out.exists());
}

#[test]
fn bad_key_length_is_invalid_parameter() {
    let dir = tempdir().unwrap();
    let plain = dir.path().join("a.txt");
    fs::write(&plain, b"x").unwrap();

    let in_w = wide(&plain);
    let out_w = wide(&dir.path().join("a.sfc"));
    let key = [0u8; 16];

    let ok = unsafe { EncryptFile(in_w.as_ptr(), out_w.as_ptr(), key.as_ptr(), 16) };
    assert!(!ok);
    assert_eq!(LastErrorCode(), 1);

    let ok = unsafe { EncryptFile(in_w.as_ptr(), out_w.as_ptr(), std::ptr::null(), 32) };
    assert!(!ok);
    assert_eq!(LastErrorCode(), 1);
}

#[test]
fn null_and_empty_paths_are_invalid_parameters() {
    let key = [0u8; 32];
    let empty: [u16; 1] = [0];
    let out_w = wide(Path::new("out.sfc"));

    assert!(!unsafe { EncryptFile(std::ptr::null(), out_w.as_ptr(), key.as_ptr(), 32) });
    assert_eq!(LastErrorCode(), 1);

    assert!(!unsafe { EncryptFile(empty.as_ptr(), out_w.as_ptr(), key.as_ptr(), 32) });
    assert_eq!(LastErrorCode(), 1);
}

#[test]
fn missing_input_reports_file_not_found() {
    let dir = tempdir().unwrap();
    let in_w = wide(&dir.path().join("nope.bin"));
    let out_w = wide(&dir.path().join("out.sfc"));
    let key = [0u8; 32];

    assert!(!unsafe { EncryptFile(in_w.as_ptr(), out_w.as_ptr(), key.as_ptr(), 32) });
    assert_eq!(LastErrorCode(), 2);
}

#[test]
fn last_error_message_is_retrievable_and_truncates() {
    let dir = tempdir().unwrap();
    let in_w = wide(&dir.path().join("nope.bin"));
    let out_w = wide(&dir.path().join("out.sfc"));
    let key = [0u8; 32];

    assert!(!unsafe { EncryptFile(in_w.as_ptr(), out_w.as_ptr(), key.as_ptr(), 32) });

    // Sizing call with a null buffer.
    let needed = unsafe { LastErrorMessage(std::ptr::null_mut(), 0) };
    assert!(needed > 0);

    let mut buf = vec![0i8; needed as usize + 1];
    let written = unsafe { LastErrorMessage(buf.as_mut_ptr().cast::<c_char>(), buf.len() as c_int) };
    assert_eq!(written, needed);

    let msg: Vec<u8> = buf[..needed as usize].iter().map(|&b| b as u8).collect();
    let msg = String::from_utf8(msg).unwrap();
    assert!(msg.contains("file not found"), "{msg}");

    // Truncated copy still NUL-terminates.
    let mut small = [1i8; 8];
    unsafe { LastErrorMessage(small.as_mut_ptr().cast::<c_char>(), small.len() as c_int) };
    assert_eq!(small[7], 0);
}

#[test]
fn success_clears_previous_error() {
    let dir = tempdir().unwrap();
    let plain = dir.path().join("a.txt");
    fs::write(&plain, b"x").unwrap();

    let key = [0u8; 32];
    let in_w = wide(&plain);
    let out_w = wide(&dir.path().join("a.sfc"));

    assert!(!unsafe { EncryptFile(in_w.as_ptr(), out_w.as_ptr(), key.as_ptr(), 0) });
    assert_ne!(LastErrorCode(), 0);

    assert!(unsafe { EncryptFile(in_w.as_ptr(), out_w.as_ptr(), key.as_ptr(), 32) });
    assert_eq!(LastErrorCode(), 0);
    assert_eq!(unsafe { LastErrorMessage(std::ptr::null_mut(), 0) }, 0);
}
