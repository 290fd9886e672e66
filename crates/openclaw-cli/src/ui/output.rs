//! Formatted output utilities.

use console::style;

/// Print a success message with checkmark.
pub fn success(msg: &str) {
    println!("{} {msg}", style("✓").green().bold());
}

/// Print an error message with X.
pub fn error(msg: &str) {
    eprintln!("{} {msg}", style("✗").red().bold());
}

/// Print a warning message.
pub fn warning(msg: &str) {
    println!("{} {msg}", style("⚠").yellow().bold());
}

/// Print an info message.
pub fn info(msg: &str) {
    println!("{} {msg}", style("ℹ").blue().bold());
}

/// Print a section title.
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair.
pub fn kv(key: &str, value: &str) {
    println!("  {}: {value}", style(key).bold());
}

/// Print a table row of fixed-width columns.
pub fn table_row(cols: &[(&str, usize)]) {
    let line: String = cols
        .iter()
        .map(|(text, width)| format!("{text:width$} ", width = *width))
        .collect();
    println!("{}", line.trim_end());
}
