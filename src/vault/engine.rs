//! The lifecycle engine.
//!
//! Each transition checks its preconditions before any side effect and
//! only destroys the source representation once the target one is
//! complete:
//!
//! - `lock`: archive → seal to `<name>.age` → shred the directory (3 passes)
//! - `unlock`: passphrase → identity → decrypt → extract → shred
//!   `<name>.age` (1 pass)
//!
//! There is no persisted intermediate state.  A failure leaves whatever
//! the last completed step produced, and is reported, never repaired.

use std::fs::File;
use std::path::PathBuf;

use crate::archive::{self, ArchiveFormat};
use crate::config::Settings;
use crate::crypto::{self, Recipient};
use crate::errors::{Result, Stage, StageExt, VaultError};
use crate::identity::{self, PassphrasePrompt};
use crate::shred;

use super::state::Vault;

/// Outcome of a successful `lock`.
#[derive(Debug)]
pub struct LockReport {
    /// Recipient the vault was encrypted to.
    pub recipient: Recipient,
    pub locked_path: PathBuf,
}

/// Outcome of a successful `unlock`.
#[derive(Debug)]
pub struct UnlockReport {
    /// Container format found inside the encrypted file.
    pub format: ArchiveFormat,
    pub dir: PathBuf,
}

impl UnlockReport {
    /// The payload used the deprecated zip container.
    pub fn is_legacy(&self) -> bool {
        self.format.is_legacy()
    }
}

/// Runs lifecycle transitions with the given settings and prompt.
pub struct Engine<P> {
    settings: Settings,
    prompt: P,
}

impl<P: PassphrasePrompt> Engine<P> {
    pub fn new(settings: Settings, prompt: P) -> Self {
        Self { settings, prompt }
    }

    /// Create the identity file for `vault`.  Returns its path.
    pub fn keygen(&self, vault: &Vault) -> Result<PathBuf> {
        identity::keygen(
            vault.root(),
            vault.trimmed_name(),
            &self.prompt,
            &self.settings.argon2_params(),
        )
    }

    /// Encrypt the vault directory and shred the plaintext.
    pub fn lock(&self, vault: &Vault) -> Result<LockReport> {
        let name = vault.name();

        // 1. Preconditions, in order, before any side effect.
        if vault.has_locked_file() {
            return Err(VaultError::AlreadyLocked(name.to_string()));
        }
        let filename = identity::find_identity(vault.root(), vault.trimmed_name())?
            .ok_or_else(|| VaultError::MissingIdentity(name.to_string()))?;
        let recipient = identity::recipient_from_filename(&filename)?;
        if !vault.has_dir() {
            return Err(VaultError::MissingVault(name.to_string()));
        }

        // 2. Archive the directory in memory.
        let dir = vault.dir();
        let payload = zeroize::Zeroizing::new(
            archive::pack(&dir, ArchiveFormat::Tar).stage(Stage::Archive)?,
        );

        // 3. Seal.  On failure the directory is untouched.
        let locked_path = vault.locked_path();
        crypto::seal_to_file(&payload, &recipient, &locked_path).stage(Stage::Encrypt)?;
        tracing::debug!(vault = name, %recipient, "sealed vault");

        // 4. Shred the plaintext.  From here on the ciphertext exists, so a
        //    failure leaves both representations and must be reported.
        let outcome = shred::shred_dir(&dir, self.settings.lock_shred_passes);
        settle_shred(name, dir, outcome)?;

        Ok(LockReport {
            recipient,
            locked_path,
        })
    }

    /// Decrypt the locked file, extract the vault and shred the ciphertext.
    pub fn unlock(&self, vault: &Vault) -> Result<UnlockReport> {
        let name = vault.name();

        // 1. Preconditions.
        if vault.has_dir() {
            return Err(VaultError::AlreadyUnlocked(name.to_string()));
        }
        let filename = identity::find_identity(vault.root(), vault.trimmed_name())?
            .ok_or_else(|| VaultError::MissingIdentity(name.to_string()))?;
        if !vault.has_locked_file() {
            return Err(VaultError::MissingLockedVault(name.to_string()));
        }

        // 2. Unlock the identity.  A bad passphrase ends the invocation.
        let passphrase = self
            .prompt
            .read_passphrase(&format!("enter passphrase for identity file \"{filename}\""))?;
        if passphrase.is_empty() {
            return Err(VaultError::EmptyPassphrase);
        }
        let identity = identity::unlock_identity(&vault.root().join(&filename), passphrase.as_bytes())?;

        // 3. Decrypt into memory.  Nothing is written if this fails.
        let locked_path = vault.locked_path();
        let file = File::open(&locked_path).stage(Stage::Decrypt)?;
        let payload = crypto::open(file, &identity).stage(Stage::Decrypt)?;

        // 4. Extract next to the locked file.  Entries outside `<name>/`
        //    are refused before anything is written.
        let format = archive::unpack(&payload, vault.root(), name).stage(Stage::Extract)?;
        if format.is_legacy() {
            tracing::warn!(vault = name, "vault payload uses the deprecated zip format");
        }
        let dir = vault.dir();
        if !vault.has_dir() {
            return Err(VaultError::Stage {
                stage: Stage::Extract,
                source: Box::new(VaultError::MissingVault(name.to_string())),
            });
        }

        // 5. Only now is the ciphertext redundant.
        shred::shred_file(&locked_path, self.settings.unlock_shred_passes).stage(Stage::Shred)?;

        Ok(UnlockReport { format, dir })
    }
}

/// Map the outcome of shredding the plaintext after a successful seal.
///
/// The encrypted file already exists at this point, so every failure
/// leaves both representations on disk.
fn settle_shred(name: &str, dir: PathBuf, outcome: Result<shred::ShredReport>) -> Result<()> {
    match outcome {
        Ok(report) if report.is_complete() => Ok(()),
        Ok(report) => Err(VaultError::IncompleteShred {
            path: dir,
            survivors: report.survivors,
        }),
        Err(e) => Err(VaultError::LockedNotShredded {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}
