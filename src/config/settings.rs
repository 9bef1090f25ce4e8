use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{Result, VaultError};

/// Overwrite passes required on the plaintext when locking.
pub const MIN_LOCK_SHRED_PASSES: u32 = 3;

/// Overwrite passes required on the encrypted file when unlocking.
pub const MIN_UNLOCK_SHRED_PASSES: u32 = 1;

/// Optional tuning, loaded from `.vaultlock.toml`.
///
/// Every field has a default so vaultlock works without any config file.
/// The defaults are the values the lock/unlock protocol is defined with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Overwrite passes applied to the plaintext directory after `lock`.
    #[serde(default = "default_lock_shred_passes")]
    pub lock_shred_passes: u32,

    /// Overwrite passes applied to the encrypted file after `unlock`.
    #[serde(default = "default_unlock_shred_passes")]
    pub unlock_shred_passes: u32,

    /// Argon2 memory cost in KiB for the identity passphrase (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_lock_shred_passes() -> u32 {
    MIN_LOCK_SHRED_PASSES
}

fn default_unlock_shred_passes() -> u32 {
    MIN_UNLOCK_SHRED_PASSES
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            lock_shred_passes: default_lock_shred_passes(),
            unlock_shred_passes: default_unlock_shred_passes(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file looked up in the working directory.
    pub const FILE_NAME: &'static str = ".vaultlock.toml";

    /// Load settings from `<dir>/.vaultlock.toml`.
    ///
    /// A missing file yields defaults; an unparsable or invalid one is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;
        settings.validate()?;

        Ok(settings)
    }

    /// Reject settings that would weaken the lock protocol.  Pass counts
    /// may be raised above the defaults, never lowered.
    pub fn validate(&self) -> Result<()> {
        if self.lock_shred_passes < MIN_LOCK_SHRED_PASSES {
            return Err(VaultError::ConfigError(format!(
                "lock_shred_passes must be at least {MIN_LOCK_SHRED_PASSES} (got {})",
                self.lock_shred_passes
            )));
        }
        if self.unlock_shred_passes < MIN_UNLOCK_SHRED_PASSES {
            return Err(VaultError::ConfigError(format!(
                "unlock_shred_passes must be at least {MIN_UNLOCK_SHRED_PASSES} (got {})",
                self.unlock_shred_passes
            )));
        }
        Ok(())
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
