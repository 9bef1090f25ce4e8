//! Vault naming and on-disk state detection.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{Result, VaultError};

/// Extension of a locked vault file.
pub const LOCKED_EXTENSION: &str = "age";

/// Which representations of a vault are present on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// Plaintext directory present, no encrypted file.
    Unlocked,
    /// Encrypted file present, no directory.
    Locked,
    /// Neither present.
    Uninitialized,
    /// Both present, e.g. after a failed post-lock shred.  Never a target
    /// state; it must be resolved by hand.
    Inconsistent,
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unlocked => "unlocked",
            Self::Locked => "locked",
            Self::Uninitialized => "uninitialized",
            Self::Inconsistent => "inconsistent",
        };
        f.write_str(s)
    }
}

/// A vault name resolved against a working directory.
#[derive(Debug, Clone)]
pub struct Vault {
    name: String,
    trimmed: String,
    root: PathBuf,
}

impl Vault {
    /// Resolve `name` under `root`.
    ///
    /// Trailing path separators are dropped (shell completion adds them).
    /// The name must be a single path segment, and must keep at least one
    /// character once leading/trailing dots and spaces are trimmed.
    pub fn new(root: &Path, name: &str) -> Result<Self> {
        let name = name.trim_end_matches(['/', std::path::MAIN_SEPARATOR]);
        let trimmed = name.trim_matches(['.', ' ']);

        if trimmed.is_empty() || name.contains(['/', std::path::MAIN_SEPARATOR]) {
            return Err(VaultError::InvalidVaultName(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            trimmed: trimmed.to_string(),
            root: root.to_path_buf(),
        })
    }

    /// The name as given (minus trailing separators).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name with leading/trailing dots and spaces removed, as used in
    /// identity filenames.
    pub fn trimmed_name(&self) -> &str {
        &self.trimmed
    }

    /// Working directory holding the vault, its locked file and identity.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The plaintext directory.
    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// The encrypted file, `<name>.age`.
    pub fn locked_path(&self) -> PathBuf {
        self.root.join(format!("{}.{LOCKED_EXTENSION}", self.name))
    }

    pub fn has_dir(&self) -> bool {
        self.dir().is_dir()
    }

    /// A directory named `<name>.age` does not count as a locked vault.
    pub fn has_locked_file(&self) -> bool {
        let path = self.locked_path();
        path.exists() && !path.is_dir()
    }

    pub fn state(&self) -> VaultState {
        match (self.has_dir(), self.has_locked_file()) {
            (true, false) => VaultState::Unlocked,
            (false, true) => VaultState::Locked,
            (false, false) => VaultState::Uninitialized,
            (true, true) => VaultState::Inconsistent,
        }
    }
}
