//! Directory-wide encryption and decryption.
//!
//! Eligible files are collected up front, then processed on a bounded rayon
//! pool. A failing file is recorded and the rest of the batch carries on.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{GcxError, InputError, Result};
use crate::{HeaderBinding, Request, decrypt, encrypt, naming};

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Worker threads; `0` lets rayon pick.
    pub jobs: usize,
    pub overwrite: bool,
    pub binding: HeaderBinding,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 0,
            overwrite: false,
            binding: HeaderBinding::default(),
        }
    }
}

/// Per-file outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    succeeded: Vec<(PathBuf, PathBuf)>,
    failed: Vec<(PathBuf, GcxError)>,
}

impl BatchReport {
    /// `(input, output)` pairs that completed.
    pub fn succeeded(&self) -> &[(PathBuf, PathBuf)] {
        &self.succeeded
    }

    pub fn failed(&self) -> &[(PathBuf, GcxError)] {
        &self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encrypts every regular file under `dir` that is not already a container.
pub fn encrypt_dir(password: &str, dir: &Path, options: BatchOptions) -> Result<BatchReport> {
    let files = collect_files(dir, |p| !naming::is_container(p))?;
    run(files, options, |path| {
        encrypt(&Request::new(password, path).binding(options.binding))
    })
}

/// Decrypts every `.gcx` file under `dir`.
pub fn decrypt_dir(password: &str, dir: &Path, options: BatchOptions) -> Result<BatchReport> {
    let files = collect_files(dir, naming::is_container)?;
    run(files, options, |path| {
        decrypt(
            &Request::new(password, path)
                .overwrite(options.overwrite)
                .binding(options.binding),
        )
    })
}

fn run<F>(files: Vec<PathBuf>, options: BatchOptions, op: F) -> Result<BatchReport>
where
    F: Fn(&Path) -> Result<PathBuf> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs)
        .build()?;

    let outcomes: Vec<(PathBuf, Result<PathBuf>)> = pool.install(|| {
        files
            .into_par_iter()
            .map(|path| {
                let outcome = op(&path);
                (path, outcome)
            })
            .collect()
    });

    let mut report = BatchReport::default();
    for (input, outcome) in outcomes {
        match outcome {
            Ok(output) => report.succeeded.push((input, output)),
            Err(e) => {
                warn!(file = %input.display(), error = %e, "skipping file");
                report.failed.push((input, e));
            }
        }
    }
    info!(
        ok = report.succeeded.len(),
        failed = report.failed.len(),
        "batch finished"
    );

    Ok(report)
}

/// Recursively lists regular files under `dir` accepted by `filter`.
///
/// Symlinks are not followed. Unreadable subdirectories are skipped.
fn collect_files(dir: &Path, filter: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(InputError::NotADirectory(dir.to_path_buf()).into()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(InputError::NotFound(dir.to_path_buf()).into());
        }
        Err(source) => {
            return Err(GcxError::IoRead {
                path: dir.to_path_buf(),
                source,
            });
        }
    }

    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(source) if current == dir => {
                return Err(GcxError::IoRead {
                    path: current,
                    source,
                });
            }
            Err(e) => {
                warn!(dir = %current.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => pending.push(path),
                Ok(ft) if ft.is_file() && filter(&path) => files.push(path),
                _ => {}
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tree(root: &Path) {
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("a.txt"), b"alpha").unwrap();
        fs::write(root.join("sub/b.csv"), b"beta").unwrap();
        fs::write(root.join("sub/deeper/c"), b"gamma").unwrap();
    }

    #[test]
    fn collect_filters_and_recurses() {
        let dir = tempdir().unwrap();
        tree(dir.path());
        fs::write(dir.path().join("sub/old.txt.gcx"), b"x").unwrap();

        let plain = collect_files(dir.path(), |p| !naming::is_container(p)).unwrap();
        assert_eq!(plain.len(), 3);

        let containers = collect_files(dir.path(), naming::is_container).unwrap();
        assert_eq!(containers, vec![dir.path().join("sub/old.txt.gcx")]);
    }

    #[test]
    fn file_given_where_directory_expected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"x").unwrap();

        assert!(matches!(
            encrypt_dir("pw", &file, BatchOptions::default()),
            Err(GcxError::Input(InputError::NotADirectory(_)))
        ));
    }

    #[test]
    fn directory_roundtrip() {
        let dir = tempdir().unwrap();
        tree(dir.path());
        let options = BatchOptions {
            jobs: 2,
            ..BatchOptions::default()
        };

        let report = encrypt_dir("pw", dir.path(), options).unwrap();
        assert!(report.is_success());
        assert_eq!(report.len(), 3);
        assert!(dir.path().join("sub/deeper/c.gcx").exists());

        fs::remove_file(dir.path().join("a.txt")).unwrap();
        fs::remove_file(dir.path().join("sub/b.csv")).unwrap();
        fs::remove_file(dir.path().join("sub/deeper/c")).unwrap();

        let report = decrypt_dir("pw", dir.path(), options).unwrap();
        assert!(report.is_success());
        assert_eq!(report.len(), 3);
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(dir.path().join("sub/b.csv")).unwrap(), b"beta");
        assert_eq!(fs::read(dir.path().join("sub/deeper/c")).unwrap(), b"gamma");
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("good.txt"), b"fine").unwrap();
        fs::write(dir.path().join("bad.waytoolongext"), b"nope").unwrap();

        let report = encrypt_dir("pw", dir.path(), BatchOptions::default()).unwrap();
        assert_eq!(report.succeeded().len(), 1);
        assert_eq!(report.failed().len(), 1);
        assert!(matches!(
            report.failed()[0].1,
            GcxError::Input(InputError::ExtensionTooLong { .. })
        ));
        assert!(dir.path().join("good.txt.gcx").exists());
    }

    #[test]
    fn decrypt_batch_reports_wrong_password_per_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("one.txt"), b"1").unwrap();
        encrypt_dir("right", dir.path(), BatchOptions::default()).unwrap();

        let report = decrypt_dir("wrong", dir.path(), BatchOptions::default()).unwrap();
        assert_eq!(report.failed().len(), 1);
        assert!(matches!(
            report.failed()[0].1,
            GcxError::AuthenticationFailed
        ));
    }

    #[test]
    fn containers_sharing_a_target_both_survive() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("a.txt");

        fs::write(&plain, b"first").unwrap();
        let container = crate::encrypt_file("pw", &plain).unwrap();
        fs::rename(&container, dir.path().join("a.gcx")).unwrap();

        fs::write(&plain, b"second").unwrap();
        crate::encrypt_file("pw", &plain).unwrap();
        fs::remove_file(&plain).unwrap();

        let options = BatchOptions {
            jobs: 2,
            ..BatchOptions::default()
        };
        let report = decrypt_dir("pw", dir.path(), options).unwrap();
        assert!(report.is_success());
        assert_eq!(report.len(), 2);

        let mut restored = vec![
            fs::read(&plain).unwrap(),
            fs::read(dir.path().join("a-decrypt.txt")).unwrap(),
        ];
        restored.sort();
        assert_eq!(restored, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn empty_directory_is_empty_report() {
        let dir = tempdir().unwrap();
        let report = decrypt_dir("pw", dir.path(), BatchOptions::default()).unwrap();
        assert!(report.is_empty());
        assert!(report.is_success());
    }
}
