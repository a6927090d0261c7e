pub mod confirm;
mod format;
pub mod spinner;
mod table;
pub mod theme;

pub use format::{print_error, print_json, print_success, OutputMode};
pub use table::{build_table, flag_cell, text_cell};
