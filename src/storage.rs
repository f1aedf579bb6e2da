//! Atomic output files.
//!
//! Containers are written to a randomly named temporary file next to the
//! destination, synced, and atomically moved into place on commit. If a
//! crash or error interrupts the operation, the destination keeps its old
//! contents and the temporary file is removed; a partially written
//! container never becomes visible under the destination name.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::crypto::secure_random;
use crate::error::Result;

pub struct AtomicOutput {
    final_path: PathBuf,
    tmp_path: PathBuf,
    writer: Option<BufWriter<File>>,
    committed: bool,
}

impl AtomicOutput {
    /// Creates the temporary file. Parent directories of the destination
    /// are created if missing.
    pub fn create(final_path: &Path) -> Result<Self> {
        if let Some(parent) = final_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = random_tmp_path(final_path)?;

        // create_new so a colliding name fails instead of clobbering
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        Ok(Self {
            final_path: final_path.to_path_buf(),
            tmp_path,
            writer: Some(BufWriter::new(file)),
            committed: false,
        })
    }

    /// Flushes, fsyncs, and atomically replaces the destination.
    ///
    /// Also fsyncs the parent directory so the rename itself is durable.
    pub fn commit(mut self) -> Result<()> {
        let mut writer = self.writer.take().expect("writer present until commit");
        writer.flush()?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        atomic_replace(&self.tmp_path, &self.final_path)?;
        self.committed = true;

        if let Some(parent) = self.final_path.parent() {
            if !parent.as_os_str().is_empty() {
                let dir = File::open(parent)?;
                dir.sync_all()?;
            }
        }

        Ok(())
    }
}

impl Write for AtomicOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer
            .as_mut()
            .expect("writer present until commit")
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer
            .as_mut()
            .expect("writer present until commit")
            .flush()
    }
}

impl Drop for AtomicOutput {
    fn drop(&mut self) {
        if !self.committed {
            // Close the handle before unlinking; required on Windows.
            drop(self.writer.take());
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Generates a unique temporary path in the destination's directory.
///
/// Uses cryptographically secure random bytes to avoid name collisions.
/// Format: `filename.tmp.<randomhex>`
fn random_tmp_path(final_path: &Path) -> Result<PathBuf> {
    let mut buf = [0u8; 8]; // 64 bit entropy
    secure_random(&mut buf)?;

    let rand_string = buf.iter().map(|b| format!("{:02x}", b)).collect::<String>();

    let file_name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());

    let tmp_name = format!("{}.tmp.{}", file_name, rand_string);

    Ok(final_path.with_file_name(tmp_name))
}

/// Atomically replaces `target` with `tmp`.
///
/// Uses the Windows `ReplaceFileW` API with `REPLACEFILE_WRITE_THROUGH`
/// when the target already exists, falling back to a plain rename for a
/// fresh target (ReplaceFileW requires an existing replaced file).
#[cfg(target_os = "windows")]
fn atomic_replace(tmp: &Path, target: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

    if !target.exists() {
        fs::rename(tmp, target)?;
        return Ok(());
    }

    fn to_wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let target_w = to_wide(target.as_os_str());
    let tmp_w = to_wide(tmp.as_os_str());

    // SAFETY:
    // - Strings are valid UTF-16 and null-terminated
    // - Pointers remain valid during the call
    // - Windows does not retain the pointers after return
    let result = unsafe {
        ReplaceFileW(
            target_w.as_ptr(),
            tmp_w.as_ptr(),
            std::ptr::null(),
            REPLACEFILE_WRITE_THROUGH,
            std::ptr::null(),
            std::ptr::null(),
        )
    };

    if result == 0 {
        return Err(io::Error::last_os_error().into());
    }

    Ok(())
}

/// Atomically replaces `target` with `tmp`.
///
/// On Unix, `rename()` is atomic when both paths are on the same filesystem.
#[cfg(not(target_os = "windows"))]
fn atomic_replace(tmp: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp, target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn commit_makes_data_visible() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut out = AtomicOutput::create(&path).unwrap();
        out.write_all(b"hello world").unwrap();
        out.commit().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn drop_without_commit_leaves_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        {
            let mut out = AtomicOutput::create(&path).unwrap();
            out.write_all(b"partial").unwrap();
            // dropped uncommitted
        }

        assert!(!path.exists());
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn existing_destination_survives_abort() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, b"old contents").unwrap();

        {
            let mut out = AtomicOutput::create(&path).unwrap();
            out.write_all(b"new partial").unwrap();
        }

        assert_eq!(fs::read(&path).unwrap(), b"old contents");
    }

    #[test]
    fn commit_replaces_existing_destination() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, b"old").unwrap();

        let mut out = AtomicOutput::create(&path).unwrap();
        out.write_all(b"new").unwrap();
        out.commit().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn tmp_file_removed_after_commit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut out = AtomicOutput::create(&path).unwrap();
        out.write_all(b"data").unwrap();
        out.commit().unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], "out.bin");
    }

    #[test]
    fn tmp_names_are_unique() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let a = random_tmp_path(&path).unwrap();
        let b = random_tmp_path(&path).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
    }

    #[test]
    fn parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("out.bin");

        let mut out = AtomicOutput::create(&nested).unwrap();
        out.write_all(b"data").unwrap();
        out.commit().unwrap();

        assert!(nested.exists());
    }
}
