//! Key-value flattening of extracted tables.
//!
//! Every table-bearing format (PDF, DOCX, PPTX, CSV) reduces its tables
//! to one string per row: `"<header>: <value>"` for columns with a real
//! header, the bare value for columns whose header was synthesized, all
//! fields joined with `"; "`. Missing cells render as empty strings so a
//! row's field count always matches the column count.

/// A table captured as a header row plus data rows.
///
/// `headers[j]` is `None` when the original header cell was empty or the
/// table had no header row at all (placeholder column).
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<Option<String>>,
    pub rows: Vec<Vec<String>>,
}

/// Why a raw cell grid could not be converted into a [`Table`].
#[derive(Debug)]
pub enum TableError {
    Empty,
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::Empty => write!(f, "table has no cells"),
        }
    }
}

impl std::error::Error for TableError {}

impl Table {
    /// Build a table from a raw cell grid.
    ///
    /// With two or more rows the first row becomes the header row (empty
    /// header cells become placeholders). A single-row grid has no header
    /// row: every column is a placeholder and the row is data.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Result<Self, TableError> {
        if grid.is_empty() || grid.iter().all(|r| r.is_empty()) {
            return Err(TableError::Empty);
        }
        let width = grid.iter().map(|r| r.len()).max().unwrap_or(0);
        if grid.len() >= 2 {
            let mut it = grid.into_iter();
            let first = it.next().unwrap_or_default();
            let headers = (0..width)
                .map(|j| {
                    first
                        .get(j)
                        .map(|h| h.trim())
                        .filter(|h| !h.is_empty())
                        .map(str::to_string)
                })
                .collect();
            Ok(Table {
                headers,
                rows: it.collect(),
            })
        } else {
            Ok(Table {
                headers: vec![None; width],
                rows: grid,
            })
        }
    }

    /// Flatten each data row into its key-value string.
    ///
    /// Returned strings are in row order, one per data row.
    pub fn kv_rows(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(j, header)| {
                        let value = row.get(j).map(|v| v.trim()).unwrap_or("");
                        match header {
                            Some(h) => format!("{}: {}", h, value),
                            None => value.to_string(),
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn headers_prefix_values() {
        let t = Table::from_grid(grid(&[
            &["Name", "Age"],
            &["Ada", "36"],
            &["Alan", "41"],
        ]))
        .unwrap();
        assert_eq!(t.kv_rows(), vec!["Name: Ada; Age: 36", "Name: Alan; Age: 41"]);
    }

    #[test]
    fn placeholder_header_emits_bare_value() {
        let t = Table::from_grid(grid(&[&["Name", ""], &["Ada", "36"]])).unwrap();
        assert_eq!(t.kv_rows(), vec!["Name: Ada; 36"]);
    }

    #[test]
    fn missing_cells_render_as_empty_strings() {
        let t = Table::from_grid(grid(&[&["A", "B", "C"], &["1"]])).unwrap();
        assert_eq!(t.kv_rows(), vec!["A: 1; B: ; C: "]);
    }

    #[test]
    fn single_row_grid_is_headerless_data() {
        let t = Table::from_grid(grid(&[&["x", "y"]])).unwrap();
        assert_eq!(t.headers, vec![None, None]);
        assert_eq!(t.kv_rows(), vec!["x; y"]);
    }

    #[test]
    fn empty_grid_is_an_error() {
        assert!(Table::from_grid(vec![]).is_err());
        assert!(Table::from_grid(vec![vec![], vec![]]).is_err());
    }
}
