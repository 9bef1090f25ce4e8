//! The identity filename as an explicit metadata record.
//!
//! ```text
//! .<recipient>.<vault>.key.age
//! ```
//!
//! The recipient is base64url and never contains `.`, so the first `.`
//! after the leading one separates it from the vault name, which may
//! itself contain dots.

use std::fmt;

use crate::crypto::Recipient;
use crate::errors::{Result, VaultError};

/// Suffix shared by every identity file.
pub const IDENTITY_SUFFIX: &str = ".key.age";

/// Recipient key and vault name carried by an identity filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityName {
    pub recipient: Recipient,
    pub vault: String,
}

impl IdentityName {
    pub fn new(recipient: Recipient, vault: impl Into<String>) -> Self {
        Self {
            recipient,
            vault: vault.into(),
        }
    }

    pub fn to_filename(&self) -> String {
        format!(".{}.{}{IDENTITY_SUFFIX}", self.recipient, self.vault)
    }

    /// Decode a filename, including its recipient key.
    pub fn parse(filename: &str) -> Result<Self> {
        let (recipient, vault) = split(filename)
            .ok_or_else(|| VaultError::InvalidIdentityFile(filename.to_string()))?;
        Ok(Self {
            recipient: recipient.parse()?,
            vault: vault.to_string(),
        })
    }

    /// The vault segment of a filename with the identity layout.  The
    /// recipient segment is not decoded.
    pub fn vault_of(filename: &str) -> Option<&str> {
        split(filename).map(|(_, vault)| vault)
    }
}

/// The only place the layout is taken apart: `(recipient, vault)`.
fn split(filename: &str) -> Option<(&str, &str)> {
    let inner = filename
        .strip_prefix('.')?
        .strip_suffix(IDENTITY_SUFFIX)?;
    let (recipient, vault) = inner.split_once('.')?;
    if recipient.is_empty() || vault.is_empty() {
        return None;
    }
    Some((recipient, vault))
}

impl fmt::Display for IdentityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_filename())
    }
}
