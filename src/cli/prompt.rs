//! Terminal passphrase input.

use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};
use crate::identity::PassphrasePrompt;

/// Environment variable answering every passphrase prompt (scripted use).
pub const PASSPHRASE_ENV: &str = "VAULTLOCK_PASSPHRASE";

/// Reads passphrases from the terminal without echo.
///
/// If `VAULTLOCK_PASSPHRASE` is set and non-empty it is used instead of
/// prompting.  Empty input is returned as-is so the caller can reject it.
pub struct TerminalPrompt;

impl PassphrasePrompt for TerminalPrompt {
    fn read_passphrase(&self, prompt: &str) -> Result<Zeroizing<String>> {
        if let Ok(pw) = std::env::var(PASSPHRASE_ENV) {
            if !pw.is_empty() {
                return Ok(Zeroizing::new(pw));
            }
        }

        let pw = dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| VaultError::PromptFailed(e.to_string()))?;
        Ok(Zeroizing::new(pw))
    }
}
