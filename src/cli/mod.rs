//! Command-line surface: argument parsing, output helpers, prompts and
//! one module per action.

pub mod commands;
pub mod output;
pub mod prompt;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::errors::Result;
use crate::vault::{Engine, Vault};

use prompt::TerminalPrompt;

/// vaultlock: lock/unlock a directory with a passphrase-protected identity file.
#[derive(Parser)]
#[command(
    name = "vaultlock",
    about = "Lock/unlock a directory with a passphrase-protected identity file",
    override_usage = "vaultlock <VAULT_NAME> <lock|unlock|keygen>",
    version
)]
pub struct Cli {
    /// Name of the vault directory in the current directory
    pub vault_name: String,

    /// What to do with the vault
    #[arg(value_enum)]
    pub action: Action,
}

/// Lifecycle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Encrypt the vault directory and shred the plaintext
    Lock,
    /// Decrypt the vault and shred the encrypted file
    Unlock,
    /// Create the passphrase-protected identity file for the vault
    Keygen,
}

/// Install the stderr diagnostics subscriber (`RUST_LOG`, default `warn`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Resolve the vault in the working directory and run the action.
pub fn run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let vault = Vault::new(&cwd, &cli.vault_name)?;
    let engine = Engine::new(settings, TerminalPrompt);

    match cli.action {
        Action::Keygen => commands::keygen::execute(&engine, &vault),
        Action::Lock => commands::lock::execute(&engine, &vault),
        Action::Unlock => commands::unlock::execute(&engine, &vault),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_action() {
        let cli = Cli::try_parse_from(["vaultlock", "box", "lock"]).unwrap();
        assert_eq!(cli.vault_name, "box");
        assert_eq!(cli.action, Action::Lock);

        let cli = Cli::try_parse_from(["vaultlock", ".secrets", "keygen"]).unwrap();
        assert_eq!(cli.action, Action::Keygen);
    }

    #[test]
    fn rejects_unknown_action_and_bad_arity() {
        assert!(Cli::try_parse_from(["vaultlock", "box", "shred"]).is_err());
        assert!(Cli::try_parse_from(["vaultlock", "box"]).is_err());
        assert!(Cli::try_parse_from(["vaultlock", "box", "lock", "extra"]).is_err());
    }
}
