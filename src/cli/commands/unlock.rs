//! `vaultlock <name> unlock`: restore the vault directory.

use crate::cli::output;
use crate::errors::Result;
use crate::identity::PassphrasePrompt;
use crate::vault::{Engine, Vault};

/// Execute the `unlock` action.
pub fn execute<P: PassphrasePrompt>(engine: &Engine<P>, vault: &Vault) -> Result<()> {
    let report = engine.unlock(vault)?;
    if report.is_legacy() {
        output::warning(&format!(
            "{} was stored in the deprecated {} format; it will be archived as tar the next time it is locked",
            vault.name(),
            report.format
        ));
    }
    output::success(&format!("{} DECRYPTED", vault.name()));
    Ok(())
}
