use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use vaultlock::cli::{output, Cli};

fn main() {
    // Help, version and malformed invocations all exit 0; only operational
    // errors exit 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = e.print();
                }
                _ => {
                    let _ = Cli::command().print_help();
                }
            }
            std::process::exit(0);
        }
    };

    vaultlock::cli::init_logging();

    if let Err(e) = vaultlock::cli::run(&cli) {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
