//! CLI output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::auth::{SessionPhase, SessionUser};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Format a session phase as a colored string
pub fn format_phase(phase: SessionPhase) -> String {
    match phase {
        SessionPhase::Authenticated => "authenticated".green().to_string(),
        SessionPhase::Anonymous => "anonymous".red().to_string(),
        SessionPhase::Loading => "loading".yellow().to_string(),
        SessionPhase::Uninitialized => "uninitialized".dimmed().to_string(),
    }
}

/// Print the user with one row per role
pub fn print_user_table(user: &SessionUser) {
    println!("{} ({}), phone {}", user.name.bold(), user.id, user.phone);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Role").fg(Color::Cyan),
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Modules").fg(Color::Cyan),
        ]);

    for role in &user.roles {
        table.add_row(vec![
            Cell::new(&role.name),
            Cell::new(&role.role_id),
            Cell::new(role.modules.join(", ")),
        ]);
    }
    if user.roles.is_empty() {
        table.add_row(vec![Cell::new("-"), Cell::new("-"), Cell::new("-")]);
    }

    println!("{table}");
    println!("Accessible modules: {}", format_modules(&user.modules));
}

pub fn format_modules(modules: &[String]) -> String {
    if modules.is_empty() {
        "(none)".dimmed().to_string()
    } else {
        modules.join(", ")
    }
}

/// Human-readable time until an epoch-millisecond deadline
pub fn format_remaining(expires_at_ms: i64) -> String {
    let remaining = (expires_at_ms - chrono::Utc::now().timestamp_millis()) / 1000;
    if remaining <= 0 {
        return "expired".red().to_string();
    }
    let (hours, minutes, seconds) = (remaining / 3600, (remaining % 3600) / 60, remaining % 60);
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
