//! Password-based file encryption into self-describing `.gcx` containers.
//!
//! A container carries everything needed to reverse the transform except the
//! password: the nonce, the scrypt salt and the original file extension,
//! followed by the AES-256-GCM ciphertext and tag.

pub mod batch;
pub mod crypto;
mod error;
pub mod format;
mod info;
pub mod naming;
mod storage;

pub use crate::batch::{BatchOptions, BatchReport, decrypt_dir, encrypt_dir};
pub use crate::crypto::{GCX_KDF, KdfParams};
pub use crate::error::{GcxError, InputError, Result};
pub use crate::info::{ContainerInfo, inspect};
pub use crate::storage::Storage;

use crate::format::{ExtensionField, Metadata};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Whether the 54-byte header is authenticated along with the ciphertext.
///
/// The container has no field recording this choice, so a file must be
/// decrypted with the binding it was encrypted with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderBinding {
    /// Header is a plain prefix; compatible with every existing `.gcx` file.
    #[default]
    Prefix,
    /// Header is passed to AES-GCM as associated data.
    Authenticated,
}

impl HeaderBinding {
    fn aad(self, header: &[u8]) -> &[u8] {
        match self {
            HeaderBinding::Prefix => &[],
            HeaderBinding::Authenticated => header,
        }
    }
}

/// One encrypt or decrypt invocation.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub password: &'a str,
    pub path: &'a Path,
    /// Decrypt only: replace an existing plaintext instead of writing `-decrypt`.
    pub overwrite: bool,
    pub binding: HeaderBinding,
}

impl<'a> Request<'a> {
    pub fn new(password: &'a str, path: &'a Path) -> Self {
        Self {
            password,
            path,
            overwrite: false,
            binding: HeaderBinding::default(),
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn binding(mut self, binding: HeaderBinding) -> Self {
        self.binding = binding;
        self
    }
}

/// Plaintext recovered from a container.
pub struct Opened {
    extension: String,
    plaintext: Zeroizing<Vec<u8>>,
}

impl Opened {
    /// Original extension including the dot, or empty.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn plaintext(&self) -> &[u8] {
        &self.plaintext
    }
}

/// Seals `plaintext` into container bytes under a fresh salt and nonce.
pub fn seal(
    password: &str,
    plaintext: &[u8],
    extension: &str,
    binding: HeaderBinding,
) -> Result<Vec<u8>> {
    seal_with(password, plaintext, ExtensionField::new(extension)?, binding)
}

fn seal_with(
    password: &str,
    plaintext: &[u8],
    ext: ExtensionField,
    binding: HeaderBinding,
) -> Result<Vec<u8>> {
    let salt = crypto::generate_salt()?;
    let nonce = crypto::generate_nonce()?;
    let key = crypto::derive_key(password, &salt, GCX_KDF)?;

    let metadata = Metadata::new(nonce, salt, ext);
    let header = metadata.to_bytes();
    let payload = crypto::encrypt(&key, &nonce, plaintext, binding.aad(&header))?;

    Ok(format::serialize(&metadata, &payload))
}

/// Authenticates and decrypts container bytes.
pub fn open(password: &str, data: &[u8], binding: HeaderBinding) -> Result<Opened> {
    let envelope = format::parse(data)?;
    let metadata = envelope.metadata();

    let key = crypto::derive_key(password, metadata.salt(), GCX_KDF)?;
    let plaintext = crypto::decrypt(
        &key,
        metadata.nonce(),
        envelope.payload(),
        binding.aad(envelope.raw_metadata()),
    )?;

    let extension = metadata.extension().extension()?.to_string();

    Ok(Opened {
        extension,
        plaintext,
    })
}

/// Encrypts `request.path` into `<name>.gcx` beside it and returns the output path.
pub fn encrypt(request: &Request<'_>) -> Result<PathBuf> {
    let input = request.path;
    require_file(input)?;

    let (_, extension) = naming::split_extension(input)?;
    let ext = ExtensionField::new(&extension)?;
    let output = naming::encrypted_path(input)?;
    debug!(input = %input.display(), output = %output.display(), "encrypting");

    let plaintext = Zeroizing::new(Storage::new(input).load()?);
    let container = seal_with(request.password, &plaintext, ext, request.binding)?;

    Storage::new(&output).save(&container)?;
    info!(output = %output.display(), bytes = container.len(), "encrypted");

    Ok(output)
}

/// Decrypts a `.gcx` container and returns the path the plaintext went to.
pub fn decrypt(request: &Request<'_>) -> Result<PathBuf> {
    let input = request.path;
    if !naming::is_container(input) {
        return Err(InputError::MissingSuffix(input.to_path_buf()).into());
    }
    require_file(input)?;

    let data = Storage::new(input).load()?;
    let opened = open(request.password, &data, request.binding)?;

    let primary = naming::decrypted_path(input, opened.extension())?;
    // A container storing `.gcx` can name itself as the primary target.
    let placed = if primary == input {
        false
    } else if request.overwrite {
        Storage::new(&primary).save(opened.plaintext())?;
        true
    } else {
        Storage::new(&primary).save_new(opened.plaintext())?
    };

    let target = if placed {
        primary
    } else {
        let alternate = naming::collision_path(&primary, opened.extension())?;
        debug!(existing = %primary.display(), alternate = %alternate.display(), "target exists");
        Storage::new(&alternate).save(opened.plaintext())?;
        alternate
    };

    info!(output = %target.display(), bytes = opened.plaintext().len(), "decrypted");

    Ok(target)
}

/// Encrypts a file with the default header binding.
pub fn encrypt_file(password: &str, input: &Path) -> Result<PathBuf> {
    encrypt(&Request::new(password, input))
}

/// Decrypts a container with the default header binding.
pub fn decrypt_file(password: &str, encrypted: &Path, overwrite: bool) -> Result<PathBuf> {
    decrypt(&Request::new(password, encrypted).overwrite(overwrite))
}

fn require_file(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(InputError::NotAFile(path.to_path_buf()).into()),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(InputError::NotFound(path.to_path_buf()).into())
        }
        Err(source) => Err(GcxError::IoRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}
