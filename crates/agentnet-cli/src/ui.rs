//! Terminal output helpers.

use colored::Colorize;

/// Print a success message.
pub fn success(msg: &str) {
    println!("  {} {}", "\u{2714}".bright_green(), msg);
}

/// Print an error message to stderr.
pub fn error(msg: &str) {
    eprintln!("  {} {}", "\u{2718}".bright_red(), msg.bright_red());
}

/// Key-value display: "  Label:       value".
pub fn kv(label: &str, value: &str) {
    println!("    {:<12} {}", format!("{label}:").as_str().dimmed(), value);
}

/// Dimmed hint line.
pub fn hint(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Pretty-print a JSON value.
pub fn json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}
