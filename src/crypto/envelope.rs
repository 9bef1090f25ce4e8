//! Encrypted file envelope.
//!
//! Both the locked vault (`<name>.age`) and the identity file use the
//! same envelope:
//!
//! ```text
//! [VLCK: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][nonce | ciphertext + tag]
//! ```
//!
//! - **Magic** (`VLCK`): identifies the file as a vaultlock envelope.
//! - **Header JSON**: a `Stanza` describing how the file key is obtained,
//!   either from an X25519 recipient or from a passphrase.
//! - **Body**: AES-256-GCM output, with the raw header bytes as associated
//!   data so the stanza cannot be swapped.

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::encryption;
use super::keys::{Identity, Recipient, KEY_LEN};
use crate::errors::{Result, VaultError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every envelope.
const MAGIC: &[u8; 4] = b"VLCK";

/// Current envelope format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

/// HKDF context for recipient-wrapped file keys.
const X25519_INFO: &[u8] = b"vaultlock/x25519/file-key";

/// Salt length of a passphrase stanza.
pub const SALT_LEN: usize = 32;

/// Lowest Argon2 memory cost (KiB) written or accepted in a stanza.
pub const MIN_MEMORY_KIB: u32 = 8_192;

// ---------------------------------------------------------------------------
// Passphrase cost
// ---------------------------------------------------------------------------

/// Argon2id cost of a passphrase stanza.  Written into the header, so an
/// identity file always unwraps with the cost it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Headers are untrusted input; refuse a cost too cheap to slow down
    /// passphrase guessing.
    fn check(&self) -> Result<()> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(VaultError::KeyDerivationFailed(format!(
                "passphrase stanza asks for {} KiB of Argon2 memory, minimum is {MIN_MEMORY_KIB}",
                self.memory_kib
            )));
        }
        if self.iterations == 0 || self.parallelism == 0 {
            return Err(VaultError::KeyDerivationFailed(
                "passphrase stanza needs at least one Argon2 iteration and lane".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stanza
// ---------------------------------------------------------------------------

/// How the file key for an envelope is recovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Stanza {
    /// Encrypted to a recipient: the sender's ephemeral public key.
    X25519 {
        #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
        ephemeral: Vec<u8>,
    },
    /// Wrapped under a passphrase with the recorded Argon2id cost.
    Passphrase {
        #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
        salt: Vec<u8>,
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    },
}

/// A parsed envelope borrowing from the input bytes.
struct Parsed<'a> {
    stanza: Stanza,
    header_bytes: &'a [u8],
    body: &'a [u8],
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` to `recipient`.
///
/// A fresh ephemeral X25519 key is generated per call; the file key is
/// HKDF-SHA256 over the shared secret, salted with both public keys.
pub fn encrypt(plaintext: &[u8], recipient: &Recipient) -> Result<Vec<u8>> {
    let ephemeral = Identity::generate();
    let ephemeral_public = ephemeral.recipient();

    let shared = ephemeral.diffie_hellman(recipient.public_key());
    if !shared.was_contributory() {
        return Err(VaultError::EncryptionFailed(
            "recipient is a low-order point".into(),
        ));
    }
    let key = recipient_file_key(shared.as_bytes(), &ephemeral_public, recipient)?;

    let stanza = Stanza::X25519 {
        ephemeral: ephemeral_public.as_bytes().to_vec(),
    };
    frame(&stanza, &key[..], plaintext)
}

/// Decrypt an envelope produced by `encrypt` for `identity`'s recipient.
pub fn decrypt(data: &[u8], identity: &Identity) -> Result<Vec<u8>> {
    let parsed = parse(data)?;
    let ephemeral = match &parsed.stanza {
        Stanza::X25519 { ephemeral } => ephemeral,
        Stanza::Passphrase { .. } => {
            return Err(VaultError::InvalidEnvelope(
                "file is passphrase-encrypted, not encrypted to an identity".into(),
            ))
        }
    };
    let ephemeral: [u8; KEY_LEN] = ephemeral.as_slice().try_into().map_err(|_| {
        VaultError::InvalidEnvelope(format!("ephemeral key must be {KEY_LEN} bytes"))
    })?;
    let ephemeral = Recipient::from(ephemeral);

    let shared = identity.diffie_hellman(ephemeral.public_key());
    if !shared.was_contributory() {
        return Err(VaultError::DecryptionFailed);
    }
    let key = recipient_file_key(shared.as_bytes(), &ephemeral, &identity.recipient())?;

    encryption::open(&key[..], parsed.body, parsed.header_bytes)
}

/// Encrypt `plaintext` under a key derived from `passphrase`.
pub fn encrypt_with_passphrase(
    plaintext: &[u8],
    passphrase: &[u8],
    params: &Argon2Params,
) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    let key = passphrase_file_key(passphrase, &salt, params)?;

    let stanza = Stanza::Passphrase {
        salt: salt.to_vec(),
        memory_kib: params.memory_kib,
        iterations: params.iterations,
        parallelism: params.parallelism,
    };
    frame(&stanza, &key[..], plaintext)
}

/// Decrypt a passphrase envelope with the cost recorded in its header.
///
/// A wrong passphrase surfaces as `DecryptionFailed`, exactly like
/// tampered data.
pub fn decrypt_with_passphrase(data: &[u8], passphrase: &[u8]) -> Result<Vec<u8>> {
    let parsed = parse(data)?;
    let Stanza::Passphrase {
        salt,
        memory_kib,
        iterations,
        parallelism,
    } = &parsed.stanza
    else {
        return Err(VaultError::InvalidEnvelope(
            "file is encrypted to an identity, not a passphrase".into(),
        ));
    };
    let params = Argon2Params {
        memory_kib: *memory_kib,
        iterations: *iterations,
        parallelism: *parallelism,
    };

    let key = passphrase_file_key(passphrase, salt, &params)?;
    encryption::open(&key[..], parsed.body, parsed.header_bytes)
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

fn frame(stanza: &Stanza, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let header_bytes = serde_json::to_vec(stanza)
        .map_err(|e| VaultError::EncryptionFailed(format!("header: {e}")))?;
    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        VaultError::EncryptionFailed(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;

    let body = encryption::seal(key, plaintext, &header_bytes)?;

    let mut buf = Vec::with_capacity(PREFIX_LEN + header_bytes.len() + body.len());
    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(CURRENT_VERSION); // 1 byte
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(&header_bytes); // header JSON
    buf.extend_from_slice(&body); // nonce + ciphertext
    Ok(buf)
}

fn parse(data: &[u8]) -> Result<Parsed<'_>> {
    if data.len() < PREFIX_LEN {
        return Err(VaultError::InvalidEnvelope(
            "file too small to be encrypted by vaultlock".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(VaultError::InvalidEnvelope("missing VLCK magic bytes".into()));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(VaultError::InvalidEnvelope(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| VaultError::InvalidEnvelope("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        VaultError::InvalidEnvelope(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| VaultError::InvalidEnvelope("header length exceeds file size".into()))?;

    let header_bytes = &data[PREFIX_LEN..header_end];
    let stanza: Stanza = serde_json::from_slice(header_bytes)
        .map_err(|e| VaultError::InvalidEnvelope(format!("header JSON: {e}")))?;

    Ok(Parsed {
        stanza,
        header_bytes,
        body: &data[header_end..],
    })
}

fn recipient_file_key(
    shared: &[u8],
    ephemeral: &Recipient,
    recipient: &Recipient,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let mut salt = [0u8; 2 * KEY_LEN];
    salt[..KEY_LEN].copy_from_slice(ephemeral.as_bytes());
    salt[KEY_LEN..].copy_from_slice(recipient.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(X25519_INFO, &mut okm[..])
        .map_err(|e| VaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}

fn passphrase_file_key(
    passphrase: &[u8],
    salt: &[u8],
    params: &Argon2Params,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    params.check()?;
    let cost = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::KeyDerivationFailed(format!("Argon2 cost: {e}")))?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, cost)
        .hash_password_into(passphrase, salt, &mut key[..])
        .map_err(|e| VaultError::KeyDerivationFailed(format!("Argon2id: {e}")))?;
    Ok(key)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
