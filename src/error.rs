//! Error types returned by every core operation.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for all gcx operations.
#[derive(Error, Debug)]
pub enum GcxError {
    /// The caller supplied an unusable path or file.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The OS random generator could not supply salt or nonce bytes.
    #[error("OS random generator unavailable")]
    RandomSource,

    /// scrypt rejected its parameters.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// AES-GCM refused to seal the plaintext.
    #[error("encryption failed")]
    Encryption,

    /// Wrong password, or the container was corrupted or tampered with.
    /// The two cases are deliberately indistinguishable.
    #[error("Invalid password or corrupted data")]
    AuthenticationFailed,

    #[error("container too short: {len} bytes, expected at least {min}")]
    TruncatedEnvelope { len: usize, min: usize },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to read {}: {source}", path.display())]
    IoRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    IoWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("input file '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("'{}' is a directory, not a file", .0.display())]
    NotAFile(PathBuf),

    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("file extension '{extension}' is {len} bytes, at most 10 are allowed")]
    ExtensionTooLong { extension: String, len: usize },

    #[error("'{}' does not end in .gcx", .0.display())]
    MissingSuffix(PathBuf),

    #[error("'{}' has no usable UTF-8 file name", .0.display())]
    InvalidPath(PathBuf),

    #[error("container holds an invalid file extension")]
    InvalidExtension,
}

pub type Result<T, E = GcxError> = std::result::Result<T, E>;
