//! Terminal styling utilities

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static RECIPE: Emoji<'_, '_> = Emoji("📜 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static MODEL: Emoji<'_, '_> = Emoji("🧮 ", "");
pub static FOLDS: Emoji<'_, '_> = Emoji("🔁 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

/// Print the application banner
pub fn print_banner(version: &str) {
    println!();
    println!(
        "    {} {}",
        style("prepflow").cyan().bold(),
        style(format!("v{}", version)).dim()
    );
    println!(
        "    {}",
        style("Fit once on training data, apply everywhere").dim()
    );
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// One labelled line of a configuration card
pub struct ConfigLine<'a> {
    pub icon: &'a Emoji<'a, 'a>,
    pub label: &'a str,
    pub value: String,
}

impl<'a> ConfigLine<'a> {
    pub fn path(icon: &'a Emoji<'a, 'a>, label: &'a str, path: &Path) -> Self {
        Self {
            icon,
            label,
            value: truncate_path(path, 38),
        }
    }

    pub fn text(icon: &'a Emoji<'a, 'a>, label: &'a str, value: &str) -> Self {
        Self {
            icon,
            label,
            value: truncate_string(value, 38),
        }
    }
}

/// Print a configuration card
pub fn print_config(lines: &[ConfigLine<'_>]) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    for entry in lines {
        println!(
            "    │  {} {:<8} {:<39}│",
            entry.icon,
            format!("{}:", entry.label),
            entry.value
        );
    }
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print elapsed time for a step
pub fn print_step_time(elapsed: Duration) {
    println!(
        "      {}",
        style(format!("({:.2}s)", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion(message: &str) {
    println!();
    println!("    {} {}", ROCKET, style(message).green().bold());
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    if let Some(info) = detail {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!(
            "      Found {} {}",
            style(count).yellow().bold(),
            description
        );
    }
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_keeps_tail() {
        assert_eq!(truncate_string("short.csv", 38), "short.csv");
        assert_eq!(truncate_string("abcdefghij", 6), "...hij");
    }

    #[test]
    fn test_config_icons_are_distinct() {
        let icons = [&RECIPE, &FOLDER, &TARGET, &MODEL, &FOLDS, &SAVE];
        for (i, a) in icons.iter().enumerate() {
            for b in &icons[i + 1..] {
                assert_ne!(a.0, b.0);
            }
        }
    }
}
