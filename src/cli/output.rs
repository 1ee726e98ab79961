//! Colorized CLI output helpers shared by the `status` and `check-config`
//! commands.

use std::fmt::Display;

use owo_colors::OwoColorize;

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    println!("  {:<24} {}", label.dimmed(), value);
}

/// Print a success line.
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error line.
pub fn error(message: &str) {
    eprintln!("{} {}", "×".red(), message);
}

/// Print a section header.
pub fn section(title: &str) {
    println!();
    println!("{}", title.bold());
}

/// Format a non-negative decimal in green, negative in red.
pub fn signed_pnl(value: rust_decimal::Decimal) -> String {
    if value.is_sign_negative() {
        format!("{}", value.to_string().red())
    } else {
        format!("{}", value.to_string().green())
    }
}
