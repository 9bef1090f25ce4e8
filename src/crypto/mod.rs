//! Cryptographic primitives for vaultlock.
//!
//! This module provides:
//! - AES-256-GCM authenticated encryption with associated data (`encryption`)
//! - X25519 identities and recipients (`keys`)
//! - The encrypted file envelope, with its recipient and passphrase
//!   stanzas (`envelope`)
//! - Sealing a payload to a file and opening it again (`sealed_file`)

pub mod encryption;
pub mod envelope;
pub mod keys;
pub mod sealed_file;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, Identity, Recipient, ...};
pub use envelope::{
    decrypt, decrypt_with_passphrase, encrypt, encrypt_with_passphrase, Argon2Params,
};
pub use keys::{Identity, Recipient};
pub use sealed_file::{open, seal_to_file};
