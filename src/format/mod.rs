//! The GCX container layout.
//!
//! ```text
//! NONCE (12) | SALT (32) | EXTENSION (10, zero padded) | CIPHERTEXT | TAG (16)
//! ```
//!
//! There is no magic and no version field. The first 54 bytes are the
//! metadata; everything after them is the AES-GCM output.

use crate::crypto::{NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::error::{GcxError, Result};

pub mod extension;

pub use extension::{EXT_LEN, ExtensionField};

/// Length of the metadata prefix.
pub const METADATA_LEN: usize = NONCE_LEN + SALT_LEN + EXT_LEN;
/// Smallest well-formed container: metadata plus a tag over empty plaintext.
pub const MIN_ENVELOPE_LEN: usize = METADATA_LEN + TAG_LEN;
/// Suffix appended to every container file name.
pub const SUFFIX: &str = ".gcx";

/// The 54-byte header carried in front of the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    nonce: [u8; NONCE_LEN],
    salt: [u8; SALT_LEN],
    extension: ExtensionField,
}

impl Metadata {
    pub fn new(nonce: [u8; NONCE_LEN], salt: [u8; SALT_LEN], extension: ExtensionField) -> Self {
        Self {
            nonce,
            salt,
            extension,
        }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn extension(&self) -> &ExtensionField {
        &self.extension
    }

    pub fn to_bytes(&self) -> [u8; METADATA_LEN] {
        let mut buf = [0u8; METADATA_LEN];
        buf[..NONCE_LEN].copy_from_slice(&self.nonce);
        buf[NONCE_LEN..NONCE_LEN + SALT_LEN].copy_from_slice(&self.salt);
        buf[NONCE_LEN + SALT_LEN..].copy_from_slice(self.extension.as_bytes());
        buf
    }

    fn from_bytes(buf: &[u8; METADATA_LEN]) -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        let mut salt = [0u8; SALT_LEN];
        let mut ext = [0u8; EXT_LEN];

        nonce.copy_from_slice(&buf[..NONCE_LEN]);
        salt.copy_from_slice(&buf[NONCE_LEN..NONCE_LEN + SALT_LEN]);
        ext.copy_from_slice(&buf[NONCE_LEN + SALT_LEN..]);

        Self::new(nonce, salt, ExtensionField::from_bytes(ext))
    }
}

/// A container split into its header and its sealed payload.
pub struct Envelope<'a> {
    metadata: Metadata,
    raw_metadata: &'a [u8],
    payload: &'a [u8],
}

impl<'a> Envelope<'a> {
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The header exactly as stored, used as associated data when bound.
    pub fn raw_metadata(&self) -> &'a [u8] {
        self.raw_metadata
    }

    /// `ciphertext || tag`.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

/// Splits a container into metadata and payload.
///
/// # Errors
///
/// Returns [`GcxError::TruncatedEnvelope`] if the data cannot hold a header and a tag.
pub fn parse(data: &[u8]) -> Result<Envelope<'_>> {
    if data.len() < MIN_ENVELOPE_LEN {
        return Err(GcxError::TruncatedEnvelope {
            len: data.len(),
            min: MIN_ENVELOPE_LEN,
        });
    }

    let (head, payload) = data.split_at(METADATA_LEN);
    let head_arr: &[u8; METADATA_LEN] = head
        .try_into()
        .map_err(|_| GcxError::TruncatedEnvelope {
            len: data.len(),
            min: MIN_ENVELOPE_LEN,
        })?;

    Ok(Envelope {
        metadata: Metadata::from_bytes(head_arr),
        raw_metadata: head,
        payload,
    })
}

/// Serializes a header and sealed payload into container bytes.
pub fn serialize(metadata: &Metadata, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(METADATA_LEN + payload.len());
    buf.extend_from_slice(&metadata.to_bytes());
    buf.extend_from_slice(payload);
    buf
}
