use colored::Colorize;

const LABEL_WIDTH: usize = 12;

pub fn print_header(title: &str) {
    println!();
    println!("  {}", title.bright_cyan().bold());
    println!("  {}", "═".repeat(title.chars().count()).cyan());
}

fn label(text: &str) -> String {
    format!("{text:<LABEL_WIDTH$}").dimmed().to_string()
}

pub fn print_kv(key: &str, value: &str) {
    println!("    {} {}", label(key), value.bright_white());
}

/// Green when `ok`, red otherwise.
pub fn print_kv_colored(key: &str, value: &str, ok: bool) {
    let value = if ok { value.green() } else { value.red() };
    println!("    {} {value}", label(key));
}

/// A titled, indented block of verbatim text such as a TICKscript.
pub fn print_block(title: &str, text: &str) {
    println!();
    println!("  {} {}", "▸".bright_cyan(), title.bold());
    for line in text.lines() {
        println!("    {}", line.dimmed());
    }
}

pub fn print_dim(msg: &str) {
    println!("  {}", msg.dimmed());
}
