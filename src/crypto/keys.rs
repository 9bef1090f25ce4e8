//! X25519 identities and recipients.
//!
//! An `Identity` is the private half of a vault keypair; its `Recipient`
//! is the public half that `lock` encrypts to.  Recipients are rendered
//! as unpadded URL-safe base64, which never contains a `.` and can be
//! embedded in a filename.
//!
//! Identities serialize to a single text line:
//!
//! ```text
//! VAULTLOCK-SECRET-KEY-<base64url>
//! ```

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use x25519_dalek::{PublicKey, SharedSecret, StaticSecret};
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// Length of X25519 keys in bytes.
pub const KEY_LEN: usize = 32;

/// Prefix of a serialized secret key line.
pub const SECRET_KEY_PREFIX: &str = "VAULTLOCK-SECRET-KEY-";

/// A private X25519 identity.  The secret scalar is zeroed on drop.
pub struct Identity {
    secret: StaticSecret,
}

impl Identity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        rand::rng().fill_bytes(&mut bytes[..]);
        Self {
            secret: StaticSecret::from(*bytes),
        }
    }

    /// The public recipient matching this identity.
    pub fn recipient(&self) -> Recipient {
        Recipient(PublicKey::from(&self.secret))
    }

    /// Serialize to the `VAULTLOCK-SECRET-KEY-...` text form.
    pub fn to_secret_string(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{SECRET_KEY_PREFIX}{}",
            URL_SAFE_NO_PAD.encode(self.secret.as_bytes())
        ))
    }

    /// Parse every identity found in `text`.
    ///
    /// Blank lines and `#` comments are skipped; any other line must be a
    /// well-formed secret key.
    pub fn parse_all(text: &str) -> Result<Vec<Identity>> {
        let mut identities = Vec::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            identities.push(line.parse()?);
        }
        Ok(identities)
    }

    /// Parse `text`, requiring exactly one identity.
    pub fn parse_single(text: &str) -> Result<Identity> {
        let mut identities = Self::parse_all(text)?;
        if identities.len() != 1 {
            return Err(VaultError::IdentityParse(identities.len()));
        }
        identities.pop().ok_or(VaultError::IdentityParse(0))
    }

    pub(crate) fn diffie_hellman(&self, public: &PublicKey) -> SharedSecret {
        self.secret.diffie_hellman(public)
    }
}

impl FromStr for Identity {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        let encoded = s
            .strip_prefix(SECRET_KEY_PREFIX)
            .ok_or(VaultError::InvalidSecretKey)?;
        let decoded = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(encoded)
                .map_err(|_| VaultError::InvalidSecretKey)?,
        );
        let bytes: [u8; KEY_LEN] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| VaultError::InvalidSecretKey)?;
        let bytes = Zeroizing::new(bytes);
        Ok(Self {
            secret: StaticSecret::from(*bytes),
        })
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("recipient", &self.recipient())
            .finish_non_exhaustive()
    }
}

/// A public X25519 recipient key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Recipient(PublicKey);

impl Recipient {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        self.0.as_bytes()
    }

    pub(crate) fn public_key(&self) -> &PublicKey {
        &self.0
    }
}

impl From<[u8; KEY_LEN]> for Recipient {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self(PublicKey::from(bytes))
    }
}

impl FromStr for Recipient {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        let decoded = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| VaultError::InvalidRecipient(format!("'{s}' is not base64url: {e}")))?;
        let bytes: [u8; KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            VaultError::InvalidRecipient(format!(
                "'{s}' must decode to {KEY_LEN} bytes, got {}",
                decoded.len()
            ))
        })?;
        Ok(Self::from(bytes))
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0.as_bytes()))
    }
}

impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recipient({self})")
    }
}
