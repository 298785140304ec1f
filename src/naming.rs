//! Output path derivation for both directions.
//!
//! Encrypting `name.ext` yields `name.ext.gcx`. Decrypting `name.ext.gcx`
//! yields `name.ext`, or `name-decrypt.ext` when that name is taken and
//! overwriting was not requested.

use std::path::{Path, PathBuf};

use crate::error::{InputError, Result};
use crate::format::SUFFIX;

/// Marker inserted before the extension on a decrypt collision.
pub const COLLISION_MARKER: &str = "-decrypt";

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| InputError::InvalidPath(path.to_path_buf()).into())
}

/// Splits a path into its stem path and its last extension, dot included.
///
/// A path without an extension yields an empty string.
pub fn split_extension(path: &Path) -> Result<(PathBuf, String)> {
    let name = file_name(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => {
            let stem = &name[..name.len() - ext.len() - 1];
            Ok((path.with_file_name(stem), format!(".{ext}")))
        }
        _ => Ok((path.to_path_buf(), String::new())),
    }
}

/// `report.pdf` -> `report.pdf.gcx`.
pub fn encrypted_path(path: &Path) -> Result<PathBuf> {
    let (stem, ext) = split_extension(path)?;
    let name = file_name(&stem)?;
    Ok(stem.with_file_name(format!("{name}{ext}{SUFFIX}")))
}

pub fn is_container(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.len() > SUFFIX.len() && n.ends_with(SUFFIX))
}

/// Primary plaintext target for a container holding `extension`.
///
/// Strips `.gcx`, then the stored extension if the name still carries it,
/// then appends the stored extension again.
pub fn decrypted_path(path: &Path, extension: &str) -> Result<PathBuf> {
    let name = file_name(path)?;
    let without_suffix = name
        .strip_suffix(SUFFIX)
        .ok_or_else(|| InputError::MissingSuffix(path.to_path_buf()))?;
    let stem = without_suffix
        .strip_suffix(extension)
        .unwrap_or(without_suffix);

    target(path, format!("{stem}{extension}"))
}

/// `report.pdf` -> `report-decrypt.pdf`.
pub fn collision_path(primary: &Path, extension: &str) -> Result<PathBuf> {
    let name = file_name(primary)?;
    let stem = name.strip_suffix(extension).unwrap_or(name);

    target(primary, format!("{stem}{COLLISION_MARKER}{extension}"))
}

fn target(sibling: &Path, name: String) -> Result<PathBuf> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(InputError::InvalidPath(sibling.to_path_buf()).into());
    }
    Ok(sibling.with_file_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_uses_last_extension() {
        let (stem, ext) = split_extension(Path::new("dir/archive.tar.gz")).unwrap();
        assert_eq!(stem, Path::new("dir/archive.tar"));
        assert_eq!(ext, ".gz");
    }

    #[test]
    fn split_without_extension() {
        let (stem, ext) = split_extension(Path::new("dir/README")).unwrap();
        assert_eq!(stem, Path::new("dir/README"));
        assert_eq!(ext, "");

        let (stem, ext) = split_extension(Path::new(".bashrc")).unwrap();
        assert_eq!(stem, Path::new(".bashrc"));
        assert_eq!(ext, "");
    }

    #[test]
    fn encrypted_path_appends_suffix() {
        assert_eq!(
            encrypted_path(Path::new("a/report.pdf")).unwrap(),
            Path::new("a/report.pdf.gcx")
        );
        assert_eq!(
            encrypted_path(Path::new("README")).unwrap(),
            Path::new("README.gcx")
        );
    }

    #[test]
    fn decrypted_path_restores_name() {
        assert_eq!(
            decrypted_path(Path::new("a/report.pdf.gcx"), ".pdf").unwrap(),
            Path::new("a/report.pdf")
        );
        assert_eq!(
            decrypted_path(Path::new("README.gcx"), "").unwrap(),
            Path::new("README")
        );
    }

    #[test]
    fn decrypted_path_uses_stored_extension_after_rename() {
        assert_eq!(
            decrypted_path(Path::new("backup.gcx"), ".pdf").unwrap(),
            Path::new("backup.pdf")
        );
    }

    #[test]
    fn decrypted_path_requires_suffix() {
        assert!(decrypted_path(Path::new("report.pdf"), ".pdf").is_err());
    }

    #[test]
    fn decrypted_path_rejects_dot_names() {
        assert!(decrypted_path(Path::new("x/..gcx"), "").is_err());
    }

    #[test]
    fn collision_inserts_marker_before_extension() {
        assert_eq!(
            collision_path(Path::new("a/report.pdf"), ".pdf").unwrap(),
            Path::new("a/report-decrypt.pdf")
        );
        assert_eq!(
            collision_path(Path::new("README"), "").unwrap(),
            Path::new("README-decrypt")
        );
    }

    #[test]
    fn naming_roundtrips() {
        for input in ["x/hello.txt", "x/archive.tar.gz", "x/Makefile", "x/.bashrc"] {
            let input = Path::new(input);
            let (_, ext) = split_extension(input).unwrap();
            let enc = encrypted_path(input).unwrap();
            assert_eq!(decrypted_path(&enc, &ext).unwrap(), input);
        }
    }

    #[test]
    fn container_detection() {
        assert!(is_container(Path::new("a/b.txt.gcx")));
        assert!(!is_container(Path::new("a/b.txt")));
        assert!(!is_container(Path::new(".gcx")));
    }
}
