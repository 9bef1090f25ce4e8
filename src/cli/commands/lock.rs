//! `vaultlock <name> lock`: encrypt the vault and shred the plaintext.

use crate::cli::output;
use crate::errors::Result;
use crate::identity::PassphrasePrompt;
use crate::vault::{Engine, Vault};

/// Execute the `lock` action.
pub fn execute<P: PassphrasePrompt>(engine: &Engine<P>, vault: &Vault) -> Result<()> {
    let report = engine.lock(vault)?;
    output::success(&format!("{} SECURED with {}", vault.name(), report.recipient));
    Ok(())
}
