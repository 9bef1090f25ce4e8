//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so every command
//! prints the same way.  Colors are dropped automatically when the
//! stream is not a terminal.

use console::style;

/// Print a green confirmation line.
pub fn success(msg: &str) {
    println!("{}", style(msg).green().bold());
}

/// Print `error: {msg}` to standard output.
pub fn error(msg: &str) {
    println!("{} {}", style("error:").red().bold(), msg);
}

/// Print `warning: {msg}` to standard error.
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("warning:").yellow().bold(), msg);
}
