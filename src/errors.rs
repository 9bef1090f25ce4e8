use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage an error was raised in.
///
/// Attached to I/O and codec failures so the single-line message printed
/// by the CLI says which step of `lock`/`unlock` broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Archive,
    Encrypt,
    Decrypt,
    Extract,
    Shred,
    ReadIdentity,
    WriteIdentity,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Archive => "archive",
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::Extract => "extract",
            Self::Shred => "shred",
            Self::ReadIdentity => "read identity file",
            Self::WriteIdentity => "write identity file",
        };
        f.write_str(s)
    }
}

/// All errors that can occur in vaultlock.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Precondition errors ---
    #[error("{0} is already locked")]
    AlreadyLocked(String),

    #[error("{0} is already unlocked")]
    AlreadyUnlocked(String),

    #[error("missing {0}")]
    MissingVault(String),

    #[error("missing encrypted {0}")]
    MissingLockedVault(String),

    #[error("missing identity file for {0}")]
    MissingIdentity(String),

    #[error("an identity file for {vault} already exists: {filename}")]
    IdentityExists { vault: String, filename: String },

    #[error("invalid vault name '{0}'")]
    InvalidVaultName(String),

    #[error("could not parse decrypted identity: expected exactly one identity, found {0}")]
    IdentityParse(usize),

    #[error("malformed secret key in identity file")]
    InvalidSecretKey,

    #[error("invalid identity filename '{0}'")]
    InvalidIdentityFile(String),

    // --- Input errors ---
    #[error("passphrase cannot be empty")]
    EmptyPassphrase,

    #[error("passphrases do not match")]
    PassphraseMismatch,

    #[error("bad passphrase")]
    BadPassphrase,

    #[error("passphrase prompt failed: {0}")]
    PromptFailed(String),

    // --- Security errors ---
    #[error("archive entry escapes the extraction root: {0}")]
    UnsafeEntryPath(String),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong identity or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("could not read recipient: {0}")]
    InvalidRecipient(String),

    #[error("invalid encrypted file: {0}")]
    InvalidEnvelope(String),

    // --- Archive errors ---
    #[error("unrecognised archive format")]
    UnknownArchiveFormat,

    #[error("archive error: {0}")]
    Archive(String),

    // --- Shredding ---
    #[error("{} file(s) in {} were removed without being overwritten", survivors.len(), path.display())]
    IncompleteShred {
        path: PathBuf,
        survivors: Vec<PathBuf>,
    },

    #[error("{name} was encrypted but the plaintext could not be shredded ({reason}); both {name} and its encrypted file now exist, shred {name} manually")]
    LockedNotShredded { name: String, reason: String },

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Stage context ---
    #[error("could not {stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<VaultError>,
    },
}

impl VaultError {
    /// Strip stage wrappers and return the underlying error.
    pub fn root_cause(&self) -> &VaultError {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// True for authentication failures, never for I/O.
    pub fn is_crypto(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::DecryptionFailed | Self::BadPassphrase | Self::EncryptionFailed(_)
        )
    }
}

/// Attach a pipeline stage to an error.
pub trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T>;
}

impl<T, E: Into<VaultError>> StageExt<T> for std::result::Result<T, E> {
    fn stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| VaultError::Stage {
            stage,
            source: Box::new(e.into()),
        })
    }
}

/// Convenience type alias for vaultlock results.
pub type Result<T> = std::result::Result<T, VaultError>;
