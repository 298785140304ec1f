use scrypt::Params;
use tracing::debug;
use zeroize::Zeroizing;

use super::KEY_LEN;
use crate::error::{GcxError, Result};

/// Cost parameters baked into the GCX format (N = 32768, r = 8, p = 1).
///
/// Every container ever written uses these. Changing them makes all existing
/// files undecryptable.
pub const GCX_KDF: KdfParams = KdfParams {
    log_n: 15,
    block_size: 8,
    parallelism: 1,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    log_n: u8,
    block_size: u32,
    parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        GCX_KDF
    }
}

impl KdfParams {
    pub fn new(log_n: u8, block_size: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            log_n,
            block_size,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn log_n(&self) -> u8 {
        self.log_n
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        self.to_scrypt().map(|_| ())
    }

    fn to_scrypt(self) -> Result<Params> {
        Params::new(self.log_n, self.block_size, self.parallelism, KEY_LEN)
            .map_err(|e| GcxError::KeyDerivation(format!("invalid scrypt parameters: {e}")))
    }
}

/// Derives the 32-byte AES key from a password and salt.
pub fn derive_key(password: &str, salt: &[u8], kdf: KdfParams) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let params = kdf.to_scrypt()?;
    debug!(log_n = kdf.log_n, r = kdf.block_size, p = kdf.parallelism, "deriving key");

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut key[..])
        .map_err(|e| GcxError::KeyDerivation(e.to_string()))?;

    Ok(key)
}
