//! Output formatting for CLI commands.

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::models::{Scene, SceneRewrite, Suggestion};

/// Output mode for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

/// Print a single item as pretty-printed JSON.
pub fn output_json<T: Serialize>(item: &T) {
    match serde_json::to_string_pretty(item) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize to JSON: {}", e)),
    }
}

/// Print a formatted table with headers and rows.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    if rows.is_empty() {
        println!("{}", "No scenes.".dimmed());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(headers);

    for row in rows {
        table.add_row(row);
    }

    println!("{table}");
}

pub fn print_success(msg: &str) {
    println!("{} {}", "OK".green().bold(), msg);
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a dimmed hint.
pub fn print_hint(msg: &str) {
    println!("{}", msg.dimmed());
}

/// Print the scene list in script order.
pub fn print_scenes(scenes: &[Scene]) {
    let rows = scenes
        .iter()
        .enumerate()
        .map(|(i, s)| {
            vec![
                (i + 1).to_string(),
                s.tag.clone(),
                s.content.clone(),
                s.id.clone(),
            ]
        })
        .collect();
    print_table(&["#", "Tag", "Content", "ID"], rows);
}

/// Print a rewrite on its own (one-shot edit command).
pub fn print_rewrite(rewrite: &SceneRewrite) {
    println!("\n{}", format!("[{}]", rewrite.tag).bold());
    println!("{}", rewrite.content);
    print_kv("Reasoning", &rewrite.reasoning);
}

/// Print a pending suggestion as before/after.
pub fn print_suggestion(suggestion: &Suggestion) {
    let original = &suggestion.original;
    let proposed = &suggestion.suggestion;

    println!("\n{}", "Suggested edit".bold().underline());
    if original.tag != proposed.tag {
        println!(
            "  {} {} {}",
            original.tag.red().strikethrough(),
            "->".dimmed(),
            proposed.tag.green()
        );
    } else {
        print_kv("Tag", &original.tag);
    }
    println!("  {} {}", "-".red(), original.content.red());
    println!("  {} {}", "+".green(), proposed.content.green());
    print_kv("Reasoning", &proposed.reasoning);
    print_hint("  /approve to apply, /dismiss to discard");
}
