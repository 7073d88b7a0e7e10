//! Debug previews of tables: schema tree and the first rows as a table

use arrow::array::{Array, RecordBatch};
use arrow::datatypes::Schema;
use arrow::util::display::array_value_to_string;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

/// Number of rows shown by [`log_preview`].
pub const PREVIEW_ROWS: usize = 5;

/// Schema as an indented tree:
///
/// ```text
/// root
///  |-- song_id: Utf8 (nullable = true)
/// ```
pub fn schema_tree(schema: &Schema) -> String {
    let mut out = String::from("root");
    for field in schema.fields() {
        out.push_str(&format!(
            "\n |-- {}: {} (nullable = {})",
            field.name(),
            field.data_type(),
            field.is_nullable()
        ));
    }
    out
}

/// First `limit` rows of `batch` rendered as a box table.
pub fn render_rows(batch: &RecordBatch, limit: usize) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            batch
                .schema()
                .fields()
                .iter()
                .map(|f| Cell::new(f.name()).fg(Color::Cyan)),
        );

    for row in 0..batch.num_rows().min(limit) {
        let cells = batch.columns().iter().map(|col| {
            if col.is_null(row) {
                "null".to_string()
            } else {
                array_value_to_string(col.as_ref(), row).unwrap_or_else(|e| format!("<{e}>"))
            }
        });
        table.add_row(cells);
    }
    table.to_string()
}

/// Log schema and first rows of a table at debug level.
pub fn log_preview(name: &str, batch: &RecordBatch) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    log::debug!("{name} schema:\n{}", schema_tree(&batch.schema()));
    log::debug!(
        "{name} (showing {} of {} rows):\n{}",
        batch.num_rows().min(PREVIEW_ROWS),
        batch.num_rows(),
        render_rows(batch, PREVIEW_ROWS)
    );
}
