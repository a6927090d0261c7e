use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, ContentArrangement, Table};

pub fn build_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan).add_attribute(Attribute::Bold)),
    );
    table
}

/// A green or red cell for on/off columns such as Active and Status.
pub fn flag_cell(text: &str, on: bool) -> Cell {
    Cell::new(text).fg(if on { Color::Green } else { Color::Red })
}

/// Shows `-` for fields the server left out.
pub fn text_cell(value: &serde_json::Value) -> Cell {
    Cell::new(value.as_str().unwrap_or("-"))
}
