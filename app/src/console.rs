//! Plain text rendering for terminal output.

use datavibe_core::models::Row;
use serde_json::Value;

/// Render `rows` as an aligned table with a header row and a separator.
/// Columns missing from a row render as empty cells.
pub fn render_table(columns: &[String], rows: &[Row]) -> String {
    if columns.is_empty() {
        return String::from("(no columns)\n");
    }
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| row.get(column).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    push_line(&mut output, columns, &widths);
    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');
    for row in &cells {
        push_line(&mut output, row, &widths);
    }
    output
}

fn push_line(output: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    output.push_str(padded.join(" | ").trim_end());
    output.push('\n');
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Two-column `key: value` listing with keys aligned.
pub fn render_pairs(pairs: &[(&str, String)]) -> String {
    let width = pairs
        .iter()
        .map(|(key, _)| key.chars().count() + 1)
        .max()
        .unwrap_or(0);
    pairs
        .iter()
        .map(|(key, value)| format!("{:<width$}  {value}\n", format!("{key}:")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn aligns_columns_and_fills_missing_cells() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            row(json!({"id": 1, "name": "Alice"})),
            row(json!({"id": 22})),
        ];
        let rendered = render_table(&columns, &rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "id | name");
        assert_eq!(lines[1], "---+------");
        assert_eq!(lines[2], "1  | Alice");
        assert_eq!(lines[3], "22 |");
    }

    #[test]
    fn null_and_nested_values_are_printable() {
        assert_eq!(cell_text(&Value::Null), "NULL");
        assert_eq!(cell_text(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(cell_text(&json!("plain")), "plain");
    }

    #[test]
    fn pairs_align_keys() {
        let rendered = render_pairs(&[("user", "u1".into()), ("email", "a@b.com".into())]);
        assert_eq!(rendered, "user:   u1\nemail:  a@b.com\n");
    }
}
