//! The fixed-width extension slot of the GCX header.

use crate::error::{InputError, Result};

/// Width of the extension slot in bytes.
pub const EXT_LEN: usize = 10;

/// Original file extension, dot included, as stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionField([u8; EXT_LEN]);

impl ExtensionField {
    /// Packs an extension into the zero-padded slot.
    ///
    /// Extensions longer than [`EXT_LEN`] bytes are rejected, never truncated.
    /// Anything [`extension`](Self::extension) would refuse is rejected too.
    pub fn new(extension: &str) -> Result<Self> {
        let bytes = extension.as_bytes();
        if bytes.len() > EXT_LEN {
            return Err(InputError::ExtensionTooLong {
                extension: extension.to_string(),
                len: bytes.len(),
            }
            .into());
        }
        validate(extension)?;

        let mut slot = [0u8; EXT_LEN];
        slot[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(slot))
    }

    pub fn from_bytes(raw: [u8; EXT_LEN]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; EXT_LEN] {
        &self.0
    }

    /// Recovers the extension string with the zero padding trimmed.
    ///
    /// The slot is not authenticated in prefix mode, so anything that could
    /// turn into a path component other than a plain suffix is refused.
    pub fn extension(&self) -> Result<&str> {
        let end = self
            .0
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);

        let ext = std::str::from_utf8(&self.0[..end]).map_err(|_| InputError::InvalidExtension)?;
        validate(ext)?;
        Ok(ext)
    }
}

/// Empty, or a dot followed by characters that cannot leave the directory.
///
/// Only separators of the running platform are refused: `\` is an ordinary
/// file name character on Unix.
fn validate(ext: &str) -> Result<()> {
    if ext.is_empty() {
        return Ok(());
    }
    if !ext.starts_with('.')
        || ext == ".."
        || ext.chars().any(|c| c == '\0' || std::path::is_separator(c))
    {
        return Err(InputError::InvalidExtension.into());
    }
    Ok(())
}
