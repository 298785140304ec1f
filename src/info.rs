//! Password-free view of a container's header.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::crypto::TAG_LEN;
use crate::error::Result;
use crate::format;
use crate::storage::Storage;

#[derive(Debug, Serialize)]
pub struct ContainerInfo {
    file: PathBuf,
    nonce: String,
    salt: String,
    /// `None` when the stored slot does not hold a usable extension.
    extension: Option<String>,
    ciphertext_len: usize,
    container_len: usize,
}

impl ContainerInfo {
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext_len
    }

    pub fn container_len(&self) -> usize {
        self.container_len
    }
}

impl fmt::Display for ContainerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File:        {}", self.file.display())?;
        writeln!(f, "Nonce:       {}", self.nonce)?;
        writeln!(f, "Salt:        {}", self.salt)?;
        writeln!(
            f,
            "Extension:   {}",
            self.extension.as_deref().unwrap_or("<invalid>")
        )?;
        writeln!(f, "Ciphertext:  {} bytes", self.ciphertext_len)?;
        write!(f, "Container:   {} bytes", self.container_len)
    }
}

/// Reads the unauthenticated header of a container.
pub fn inspect(path: &Path) -> Result<ContainerInfo> {
    let data = Storage::new(path).load()?;
    let envelope = format::parse(&data)?;
    let metadata = envelope.metadata();

    Ok(ContainerInfo {
        file: path.to_path_buf(),
        nonce: to_hex(metadata.nonce()),
        salt: to_hex(metadata.salt()),
        extension: metadata.extension().extension().ok().map(str::to_string),
        ciphertext_len: envelope.payload().len() - TAG_LEN,
        container_len: data.len(),
    })
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
