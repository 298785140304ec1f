//! Whole-file reads and crash-safe writes for plaintext and container files.

use getrandom::fill;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{GcxError, Result};

/// A single file on disk that gcx reads from or writes to.
#[derive(Clone, Debug)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the entire file into memory.
    ///
    /// # Errors
    ///
    /// Returns [`GcxError::IoRead`] if the file cannot be read.
    pub fn load(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|source| GcxError::IoRead {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes data to the file, replacing any previous content.
    ///
    /// The data goes to a randomly named temporary file in the same
    /// directory, is synced, then renamed over the target. A crash leaves
    /// either the old file or the new one, never a partial write.
    ///
    /// # Errors
    ///
    /// Returns [`GcxError::IoWrite`] if the file cannot be written.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        self.write_atomic(data, true)
            .map(|_| ())
            .map_err(|source| self.write_error(source))
    }

    /// Writes data to the file only if nothing exists there yet.
    ///
    /// Returns `Ok(false)` and leaves the existing file untouched otherwise.
    /// The existence check and the placement are one step, so concurrent
    /// writers to the same path cannot overwrite each other.
    ///
    /// # Errors
    ///
    /// Returns [`GcxError::IoWrite`] if the file cannot be written.
    pub fn save_new(&self, data: &[u8]) -> Result<bool> {
        self.write_atomic(data, false)
            .map_err(|source| self.write_error(source))
    }

    fn write_error(&self, source: io::Error) -> GcxError {
        GcxError::IoWrite {
            path: self.path.clone(),
            source,
        }
    }

    fn write_atomic(&self, data: &[u8], replace: bool) -> io::Result<bool> {
        let tmp_path = self.write_tmp(data)?;

        let placed = if replace {
            self.atomic_replace(&tmp_path).map(|()| true)
        } else {
            // hard_link never replaces an existing target
            match fs::hard_link(&tmp_path, &self.path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(e),
            }
        };
        if !replace || placed.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        if !placed? {
            debug!(path = %self.path.display(), "target exists, left in place");
            return Ok(false);
        }
        debug!(path = %self.path.display(), bytes = data.len(), "file written");

        // fsync directory
        #[cfg(unix)]
        {
            if let Some(parent) = self.parent() {
                fs::File::open(parent)?.sync_all()?;
            }
        }

        Ok(true)
    }

    fn write_tmp(&self, data: &[u8]) -> io::Result<PathBuf> {
        let tmp_path = self.random_tmp_path()?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let mut tmp_file = options.open(&tmp_path)?;

        let written = tmp_file.write_all(data).and_then(|()| tmp_file.sync_all());
        drop(tmp_file);

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        Ok(tmp_path)
    }

    #[cfg(unix)]
    fn parent(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Format: `.filename.tmp.<randomhex>` next to the target.
    fn random_tmp_path(&self) -> io::Result<PathBuf> {
        let mut buf = [0u8; 8];
        fill(&mut buf).map_err(|e| io::Error::other(e.to_string()))?;

        let rand_string = buf.iter().map(|b| format!("{:02x}", b)).collect::<String>();

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
            .to_string_lossy();

        let tmp_name = format!(".{}.tmp.{}", file_name, rand_string);

        Ok(self.path.with_file_name(tmp_name))
    }

    /// Atomically replaces the target file with the temporary file.
    ///
    /// Uses Windows `ReplaceFileW` with `REPLACEFILE_WRITE_THROUGH` when the
    /// target already exists; a plain rename otherwise, since `ReplaceFileW`
    /// requires an existing target.
    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> io::Result<()> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

        if !self.path.exists() {
            return fs::rename(tmp_path, &self.path);
        }

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let target_w = to_wide(self.path.as_os_str());
        let tmp_w = to_wide(tmp_path.as_os_str());

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
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// On Unix, `rename()` is atomic when both paths are on the same filesystem.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> io::Result<()> {
        fs::rename(tmp_path, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    // --------------------------------------------------
    // LOAD TESTS
    // --------------------------------------------------

    #[test]
    fn load_returns_written_data() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("out.bin"));

        storage.save(b"hello world").unwrap();

        assert_eq!(storage.load().unwrap(), b"hello world");
    }

    #[test]
    fn load_fails_if_file_does_not_exist() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("missing.bin"));

        assert!(matches!(storage.load(), Err(GcxError::IoRead { .. })));
    }

    // --------------------------------------------------
    // SAVE TESTS
    // --------------------------------------------------

    #[test]
    fn save_new_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        assert!(Storage::new(path.clone()).save_new(b"data").unwrap());
        assert_eq!(fs::read(path).unwrap(), b"data");
    }

    #[test]
    fn save_new_leaves_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, b"first").unwrap();

        assert!(!Storage::new(path.clone()).save_new(b"second").unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"first");

        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1, "temp file left behind");
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let storage = Storage::new(path.clone());

        storage.save(b"first").unwrap();
        storage.save(b"second").unwrap();

        assert_eq!(fs::read(path).unwrap(), b"second");
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("out.bin"));
        storage.save(b"data").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], "out.bin");
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("nope").join("out.bin"));

        assert!(matches!(storage.save(b"data"), Err(GcxError::IoWrite { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_rw_and_not_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        Storage::new(path.clone()).save(b"data").unwrap();

        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o600, 0o600);
        assert_eq!(mode & 0o111, 0);
    }

    // --------------------------------------------------
    // RANDOM TMP PATH TESTS
    // --------------------------------------------------

    #[test]
    fn random_tmp_path_has_same_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let storage = Storage::new(path.clone());

        let tmp = storage.random_tmp_path().unwrap();

        assert_eq!(tmp.parent(), path.parent());
        assert_ne!(tmp, path);
    }

    #[test]
    fn tmp_names_are_unique() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("out.bin"));

        let a = storage.random_tmp_path().unwrap();
        let b = storage.random_tmp_path().unwrap();

        assert_ne!(a, b);
    }
}
