//! PDF parsing: per-page free text plus detected tables.
//!
//! `pdf-extract` yields flat text per page with no geometry, so tables
//! are recovered with a layout heuristic: a run of two or more
//! consecutive lines that each split into multiple columns on tabs or
//! wide space gaps is treated as a table grid, first line as the header
//! row. Grid lines are excluded from the page's prose unit, so table
//! content is never duplicated as free text.

use std::path::Path;

use crate::models::{Position, SourceUnit, UnitKind};

use super::table::Table;
use super::ParseError;

pub fn parse(path: &Path, source_file: &str) -> Result<Vec<SourceUnit>, ParseError> {
    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes, source_file)
}

pub(crate) fn parse_bytes(bytes: &[u8], source_file: &str) -> Result<Vec<SourceUnit>, ParseError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ParseError::Pdf(e.to_string()))?;

    let mut units = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        page_units(page, source_file, i as u32 + 1, &mut units);
    }
    Ok(units)
}

/// Convert one page's text into a prose unit plus table-row units.
fn page_units(text: &str, source_file: &str, page: u32, units: &mut Vec<SourceUnit>) {
    let (prose, grids) = split_tables(text);

    let prose = prose.trim();
    if !prose.is_empty() {
        units.push(
            SourceUnit::new(prose, source_file, UnitKind::PdfText).with_pos(Position {
                page: Some(page),
                ..Default::default()
            }),
        );
    }

    for (t, grid) in grids.into_iter().enumerate() {
        if let Ok(table) = Table::from_grid(grid) {
            for (r, row) in table.kv_rows().into_iter().enumerate() {
                units.push(
                    SourceUnit::new(row, source_file, UnitKind::TableRow).with_pos(Position {
                        page: Some(page),
                        table: Some(t as u32 + 1),
                        row: Some(r as u32 + 1),
                        ..Default::default()
                    }),
                );
            }
        }
    }
}

/// Partition page text into prose and table grids.
///
/// A line belongs to a grid candidate when it splits into at least two
/// columns; a candidate run becomes a grid only with two or more lines
/// (header plus data). Shorter runs fall back to prose, so an isolated
/// line with a wide gap is not mistaken for a table.
fn split_tables(text: &str) -> (String, Vec<Vec<Vec<String>>>) {
    let mut prose = String::new();
    let mut grids = Vec::new();
    let mut run: Vec<(&str, Vec<String>)> = Vec::new();

    fn flush(
        run: &mut Vec<(&str, Vec<String>)>,
        grids: &mut Vec<Vec<Vec<String>>>,
        prose: &mut String,
    ) {
        if run.len() >= 2 {
            grids.push(run.drain(..).map(|(_, cells)| cells).collect());
        } else {
            for (line, _) in run.drain(..) {
                prose.push_str(line.trim());
                prose.push('\n');
            }
        }
    }

    for line in text.lines() {
        let cells = split_columns(line);
        if cells.len() >= 2 {
            run.push((line, cells));
        } else {
            flush(&mut run, &mut grids, &mut prose);
            let line = line.trim();
            if !line.is_empty() {
                prose.push_str(line);
                prose.push('\n');
            }
        }
    }
    flush(&mut run, &mut grids, &mut prose);

    (prose, grids)
}

/// Split a line into column cells on tabs or runs of two-plus spaces.
/// Single spaces stay inside a cell.
fn split_columns(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut gap = 0usize;
    let mut saw_tab = false;

    for ch in line.trim_end().chars() {
        if ch == '\t' {
            saw_tab = true;
            gap += 1;
            continue;
        }
        if ch == ' ' {
            gap += 1;
            continue;
        }
        if !current.is_empty() {
            if saw_tab || gap >= 2 {
                cells.push(std::mem::take(&mut current));
            } else if gap == 1 {
                current.push(' ');
            }
        }
        gap = 0;
        saw_tab = false;
        current.push(ch);
    }
    if !current.is_empty() {
        cells.push(current);
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pdf_is_a_pdf_error() {
        assert!(matches!(
            parse_bytes(b"not a pdf", "broken.pdf"),
            Err(ParseError::Pdf(_))
        ));
    }

    #[test]
    fn columns_split_on_wide_gaps_but_not_single_spaces() {
        assert_eq!(
            split_columns("Net revenue   12.4   up 3%"),
            vec!["Net revenue", "12.4", "up 3%"]
        );
        assert_eq!(split_columns("Item\tCount"), vec!["Item", "Count"]);
        assert_eq!(
            split_columns("Plain prose sentence."),
            vec!["Plain prose sentence."]
        );
    }

    #[test]
    fn aligned_line_runs_become_table_rows() {
        let mut units = Vec::new();
        page_units(
            "Results were strong this quarter.\n\
             Metric      Value\n\
             Revenue     12\n\
             Margin      40\n\
             See appendix for details.",
            "report.pdf",
            2,
            &mut units,
        );

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].kind, UnitKind::PdfText);
        assert_eq!(
            units[0].text,
            "Results were strong this quarter.\nSee appendix for details."
        );
        assert_eq!(units[0].pos.page, Some(2));

        assert_eq!(units[1].kind, UnitKind::TableRow);
        assert_eq!(units[1].text, "Metric: Revenue; Value: 12");
        assert_eq!(units[1].pos.page, Some(2));
        assert_eq!(units[1].pos.table, Some(1));
        assert_eq!(units[1].pos.row, Some(1));
        assert_eq!(units[2].text, "Metric: Margin; Value: 40");
        assert_eq!(units[2].pos.row, Some(2));
    }

    #[test]
    fn isolated_wide_gap_line_stays_prose() {
        let mut units = Vec::new();
        page_units(
            "Heading      2024\nOne sentence of body text follows here.",
            "doc.pdf",
            1,
            &mut units,
        );
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].kind, UnitKind::PdfText);
        assert!(units[0].text.contains("Heading      2024"));
    }

    #[test]
    fn separate_grids_get_distinct_table_numbers() {
        let mut units = Vec::new();
        page_units(
            "A   1\nB   2\nintervening prose line\nX   9\nY   8",
            "doc.pdf",
            1,
            &mut units,
        );
        let tables: Vec<_> = units
            .iter()
            .filter(|u| u.kind == UnitKind::TableRow)
            .collect();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].pos.table, Some(1));
        assert_eq!(tables[1].pos.table, Some(2));
    }
}
