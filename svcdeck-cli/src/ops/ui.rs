//! UI utilities for beautiful command output.

use crossterm::style::Stylize;
use svcdeck_core::ServiceStatus;

/// Calculate display width of a string (accounting for wide chars like emoji).
fn display_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

/// Print a section header with box drawing characters.
pub fn print_header(title: &str) {
    let inner_width: usize = 58;
    let title_width = display_width(title);
    let total_padding = inner_width.saturating_sub(title_width);
    let left_pad = total_padding / 2;
    let right_pad = total_padding - left_pad;

    println!();
    println!("{}", format!("╔{}╗", "═".repeat(inner_width)).dark_cyan());
    println!(
        "{}",
        format!("║{}{}{}║", " ".repeat(left_pad), title, " ".repeat(right_pad)).dark_cyan()
    );
    println!("{}", format!("╚{}╝", "═".repeat(inner_width)).dark_cyan());
    println!();
}

/// Print a small section title.
pub fn print_section(title: &str) {
    println!();
    println!("  {} {}", "▸".dark_cyan(), title.white().bold());
    println!("  {}", "─".repeat(50).dark_grey());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

/// Print a key-value pair with colored value.
pub fn print_kv_colored(key: &str, value: &str, color: KvColor) {
    let styled_value = match color {
        KvColor::Green => value.green().to_string(),
        KvColor::Red => value.red().to_string(),
        KvColor::Yellow => value.yellow().to_string(),
        KvColor::Plain => value.to_string(),
    };
    println!("  {:<14} {}", format!("{}:", key).dark_grey(), styled_value);
}

#[derive(Clone, Copy)]
pub enum KvColor {
    Green,
    Red,
    Yellow,
    Plain,
}

/// Green for yes, red for no.
pub fn flag_color(flag: bool) -> KvColor {
    if flag {
        KvColor::Green
    } else {
        KvColor::Red
    }
}

/// Print a spinner-style progress message (use \r to update).
pub fn print_progress(msg: &str) {
    print!("  {} {}...", "⏳".yellow(), msg);
    use std::io::Write;
    let _ = std::io::stdout().flush();
}

/// Clear the progress line and print success.
pub fn finish_progress_success(msg: &str) {
    println!("\r  {} {}                    ", "✓".green(), msg);
}

/// Clear the progress line and print error.
pub fn finish_progress_error(msg: &str) {
    println!("\r  {} {}                    ", "✗".red(), msg);
}

fn state_label(status: ServiceStatus) -> &'static str {
    match status {
        ServiceStatus::Running => "● Running",
        ServiceStatus::Stopped => "○ Stopped",
        ServiceStatus::Starting => "◐ Starting",
        ServiceStatus::Stopping => "◑ Stopping",
        ServiceStatus::Restarting => "↻ Restarting",
    }
}

/// Format state with color.
pub fn format_state(status: ServiceStatus) -> String {
    let label = state_label(status);
    match status {
        ServiceStatus::Running => label.green().to_string(),
        ServiceStatus::Stopped => label.dark_grey().to_string(),
        _ => label.yellow().to_string(),
    }
}

/// Print a table header.
pub fn print_table_header(columns: &[(&str, usize)]) {
    let header: String = columns
        .iter()
        .map(|(name, width)| format!("{:<width$}", name, width = width))
        .collect::<Vec<_>>()
        .join(" ");
    println!("  {}", header.white().bold());
    let separator: String = columns
        .iter()
        .map(|(_, width)| "─".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    println!("  {}", separator.dark_grey());
}

/// Print an empty state message.
pub fn print_empty(msg: &str) {
    println!();
    println!("  {}", msg.dark_grey().italic());
    println!();
}

/// Print a hint/tip message.
pub fn print_hint(msg: &str) {
    println!("  {} {}", "💡".yellow(), msg.dark_grey());
}

/// 按字符截断，避免多字节字符边界问题
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let keep = max.saturating_sub(3);
        format!("{}...", s.chars().take(keep).collect::<String>())
    } else {
        s.to_string()
    }
}
