//! `vaultlock <name> keygen`: create the identity file.

use crate::cli::output;
use crate::errors::Result;
use crate::identity::PassphrasePrompt;
use crate::vault::{Engine, Vault};

/// Execute the `keygen` action.
pub fn execute<P: PassphrasePrompt>(engine: &Engine<P>, vault: &Vault) -> Result<()> {
    let path = engine.keygen(vault)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    output::success(&format!("{filename} CREATED (do not change the filename)"));
    Ok(())
}
