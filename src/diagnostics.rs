//! Fatal/warning console output: fatal errors print a red "Error: ..."
//! line and terminate; warnings print a yellow "Warning: ..." line and
//! execution continues.
//!
//! Anything below that severity (chunk sizes, zone counts, per-generator
//! dumps) goes through the `log` facade instead, at `debug`/`trace` level,
//! so it can be silenced in normal operation and enabled with `--verbose`.

use colored::Colorize;
use std::fmt::Display;

/// Print a non-fatal warning in yellow.
pub fn warn(message: impl Display) {
    eprintln!("{} {}", "Warning:".yellow().bold(), message);
}

/// Print a fatal error in red. Does not exit — callers decide whether to
/// `std::process::exit`, which keeps this function usable in tests.
pub fn error(message: impl Display) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}
