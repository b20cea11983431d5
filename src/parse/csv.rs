//! CSV parsing: one `csv_row` unit per data row.
//!
//! The first record is the header row. Empty header cells are placeholder
//! columns, rendered value-only by the key-value flattening.

use std::path::Path;

use crate::models::{Position, SourceUnit, UnitKind};

use super::table::Table;
use super::ParseError;

pub fn parse(path: &Path, source_file: &str) -> Result<Vec<SourceUnit>, ParseError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| ParseError::Csv(e.to_string()))?;

    let headers: Vec<Option<String>> = reader
        .headers()
        .map_err(|e| ParseError::Csv(e.to_string()))?
        .iter()
        .map(|h| {
            let h = h.trim();
            (!h.is_empty()).then(|| h.to_string())
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ParseError::Csv(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let table = Table { headers, rows };
    Ok(table
        .kv_rows()
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            SourceUnit::new(text, source_file, UnitKind::CsvRow).with_pos(Position {
                row: Some(i as u32 + 1),
                ..Default::default()
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn rows_flatten_to_key_value_strings() {
        let file = write_csv("name,dept\nAda,Research\nAlan,Cryptography\n");
        let units = parse(file.path(), "staff.csv").unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "name: Ada; dept: Research");
        assert_eq!(units[0].kind, UnitKind::CsvRow);
        assert_eq!(units[0].pos.row, Some(1));
        assert_eq!(units[1].text, "name: Alan; dept: Cryptography");
        assert_eq!(units[1].pos.row, Some(2));
    }

    #[test]
    fn empty_header_cell_is_value_only() {
        let file = write_csv("name,\nAda,36\n");
        let units = parse(file.path(), "staff.csv").unwrap();
        assert_eq!(units[0].text, "name: Ada; 36");
    }

    #[test]
    fn missing_trailing_cells_render_empty() {
        let file = write_csv("a,b,c\n1,2\n");
        let units = parse(file.path(), "sparse.csv").unwrap();
        assert_eq!(units[0].text, "a: 1; b: 2; c: ");
    }

    #[test]
    fn header_only_file_yields_no_units() {
        let file = write_csv("a,b,c\n");
        assert!(parse(file.path(), "empty.csv").unwrap().is_empty());
    }
}
