//! Cryptographic primitives for GCX containers.
//!
//! scrypt key derivation and AES-256-GCM sealing.

pub mod aead;
pub mod kdf;

pub use aead::{decrypt, encrypt, generate_nonce, generate_salt};
pub use kdf::{GCX_KDF, KdfParams, derive_key};

/// Length of the salt (32 bytes).
pub const SALT_LEN: usize = 32;
/// Length of the nonce (12 bytes for AES-GCM).
pub const NONCE_LEN: usize = 12;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the AES-GCM authentication tag.
pub const TAG_LEN: usize = 16;
