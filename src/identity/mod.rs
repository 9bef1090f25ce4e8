//! Identity store: the passphrase-protected identity file of a vault.
//!
//! The file lives in the working directory and is named after the
//! recipient key and the vault (`name`).  Its contents are the private
//! key, encrypted under a key derived from the user's passphrase.

pub mod name;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::crypto::{self, Argon2Params, Identity, Recipient};
use crate::errors::{Result, Stage, StageExt, VaultError};

pub use name::{IdentityName, IDENTITY_SUFFIX};

/// Reads a secret line from the user without echoing it.
pub trait PassphrasePrompt {
    fn read_passphrase(&self, prompt: &str) -> Result<Zeroizing<String>>;
}

/// Ask for a new passphrase twice.  It must be non-empty and both reads
/// must match.
pub fn read_new_passphrase<P: PassphrasePrompt + ?Sized>(
    prompt: &P,
) -> Result<Zeroizing<String>> {
    let passphrase = prompt.read_passphrase("create identity passphrase")?;
    if passphrase.is_empty() {
        return Err(VaultError::EmptyPassphrase);
    }
    let confirmation = prompt.read_passphrase("confirm identity passphrase")?;
    if !bool::from(passphrase.as_bytes().ct_eq(confirmation.as_bytes())) {
        return Err(VaultError::PassphraseMismatch);
    }
    Ok(passphrase)
}

/// Generate a keypair for `vault` and write its identity file into `dir`.
///
/// Refuses to create a second identity for a vault that already has one.
/// Returns the path of the new file.
pub fn keygen<P: PassphrasePrompt + ?Sized>(
    dir: &Path,
    vault: &str,
    prompt: &P,
    params: &Argon2Params,
) -> Result<PathBuf> {
    if let Some(filename) = find_identity(dir, vault)? {
        return Err(VaultError::IdentityExists {
            vault: vault.to_string(),
            filename,
        });
    }

    let identity = Identity::generate();
    let filename = IdentityName::new(identity.recipient(), vault).to_filename();

    let passphrase = read_new_passphrase(prompt)?;
    let secret = identity.to_secret_string();
    let sealed = crypto::encrypt_with_passphrase(secret.as_bytes(), passphrase.as_bytes(), params)?;

    let path = dir.join(&filename);
    write_private(&path, &sealed).stage(Stage::WriteIdentity)?;
    tracing::debug!(path = %path.display(), "wrote identity file");
    Ok(path)
}

/// Find the identity filename for `vault` among the immediate entries of
/// `dir`.  `Ok(None)` means no identity exists; I/O failures are errors.
///
/// Only the vault segment is compared.  A file with a malformed recipient
/// still counts, so the error surfaces when its key is read.
pub fn find_identity(dir: &Path, vault: &str) -> Result<Option<String>> {
    let mut matches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if IdentityName::vault_of(&filename) == Some(vault) {
            matches.push(filename);
        }
    }

    matches.sort();
    if matches.len() > 1 {
        tracing::warn!(vault, candidates = ?matches, "several identity files match, using the first");
    }
    Ok(matches.into_iter().next())
}

/// Parse the recipient key out of an identity filename (or path).
pub fn recipient_from_filename(filename: &str) -> Result<Recipient> {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| VaultError::InvalidIdentityFile(filename.to_string()))?;
    Ok(IdentityName::parse(base)?.recipient)
}

/// Decrypt the identity file at `path` with `passphrase`.
///
/// A wrong passphrase is `BadPassphrase`; the decrypted text must hold
/// exactly one identity.
pub fn unlock_identity(path: &Path, passphrase: &[u8]) -> Result<Identity> {
    let sealed = fs::read(path).stage(Stage::ReadIdentity)?;
    let plaintext = Zeroizing::new(
        crypto::decrypt_with_passphrase(&sealed, passphrase).map_err(|e| match e {
            VaultError::DecryptionFailed => VaultError::BadPassphrase,
            other => other,
        })?,
    );
    let text = std::str::from_utf8(&plaintext).map_err(|_| VaultError::InvalidSecretKey)?;
    Identity::parse_single(text)
}

/// Write `data` to a new file readable only by the owner.
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}
