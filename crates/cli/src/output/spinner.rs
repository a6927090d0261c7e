use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use super::OutputMode;

fn plain() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn create(msg: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner:.cyan.bold} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "]);
    let sp = ProgressBar::new_spinner();
    sp.set_style(style);
    sp.set_message(msg.to_string());
    sp.enable_steady_tick(Duration::from_millis(80));
    sp
}

/// A spinner in human mode; JSON output stays clean.
pub fn for_mode(mode: OutputMode, msg: &str) -> Option<ProgressBar> {
    match mode {
        OutputMode::Human => Some(create(msg)),
        OutputMode::Json => None,
    }
}

pub fn finish_ok(sp: &ProgressBar, msg: &str) {
    sp.set_style(plain());
    sp.finish_with_message(format!("{} {}", "✓".green().bold(), msg));
}

pub fn finish_err(sp: &ProgressBar, msg: &str) {
    sp.set_style(plain());
    sp.finish_with_message(format!("{} {}", "✗".red().bold(), msg));
}

pub fn finish_clear(sp: &ProgressBar) {
    sp.finish_and_clear();
}
