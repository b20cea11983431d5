//! PPTX parsing: one text unit per slide, plus flattened slide tables.
//!
//! Slides (`ppt/slides/slideN.xml`) are processed in numeric order. Text
//! runs outside tables are joined into a single `pptx_slide` unit; each
//! `a:tbl` is flattened to `table_row` units. A table that fails
//! conversion is logged and skipped; the rest of the deck is still
//! returned.

use std::path::Path;

use quick_xml::events::Event;
use tracing::warn;

use crate::models::{Position, SourceUnit, UnitKind};

use super::table::Table;
use super::{read_zip_entry, ParseError};

pub fn parse(path: &Path, source_file: &str) -> Result<Vec<SourceUnit>, ParseError> {
    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes, source_file)
}

pub(crate) fn parse_bytes(bytes: &[u8], source_file: &str) -> Result<Vec<SourceUnit>, ParseError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ParseError::Ooxml(e.to_string()))?;

    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut units = Vec::new();
    for (i, name) in slide_names.iter().enumerate() {
        let slide_num = i as u32 + 1;
        let xml = read_zip_entry(&mut archive, name)?;
        scan_slide(&xml, source_file, slide_num, &mut units)?;
    }
    Ok(units)
}

fn scan_slide(
    xml: &[u8],
    source_file: &str,
    slide_num: u32,
    units: &mut Vec<SourceUnit>,
) -> Result<(), ParseError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut text_runs: Vec<String> = Vec::new();
    let mut tables: Vec<Vec<Vec<String>>> = Vec::new();

    let mut table_depth: usize = 0;
    let mut grid: Vec<Vec<String>> = Vec::new();
    let mut cell_text = String::new();
    let mut in_cell = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => {
                    if table_depth == 0 {
                        grid.clear();
                    }
                    table_depth += 1;
                }
                b"tr" if table_depth == 1 => grid.push(Vec::new()),
                b"tc" if table_depth == 1 => {
                    in_cell = true;
                    cell_text.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().unwrap_or_default();
                if in_cell {
                    cell_text.push_str(&text);
                } else if table_depth == 0 {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        text_runs.push(text);
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if in_cell => cell_text.push(' '),
                b"tc" if table_depth == 1 => {
                    in_cell = false;
                    if let Some(row) = grid.last_mut() {
                        row.push(cell_text.trim().to_string());
                    }
                }
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        tables.push(std::mem::take(&mut grid));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !text_runs.is_empty() {
        units.push(
            SourceUnit::new(text_runs.join(" "), source_file, UnitKind::PptxSlide).with_pos(
                Position {
                    slide: Some(slide_num),
                    ..Default::default()
                },
            ),
        );
    }

    for (t, grid) in tables.into_iter().enumerate() {
        let table_num = t as u32 + 1;
        match Table::from_grid(grid) {
            Ok(table) => {
                for (r, text) in table.kv_rows().into_iter().enumerate() {
                    units.push(
                        SourceUnit::new(text, source_file, UnitKind::TableRow).with_pos(Position {
                            slide: Some(slide_num),
                            table: Some(table_num),
                            row: Some(r as u32 + 1),
                            ..Default::default()
                        }),
                    );
                }
            }
            Err(e) => {
                // Per-table failures are non-fatal: skip the table, keep the deck.
                warn!(
                    source_file,
                    slide = slide_num,
                    table = table_num,
                    error = %e,
                    "skipping unconvertible slide table"
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pptx_with_slides(slides: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            for (i, body) in slides.iter().enumerate() {
                zip.start_file(
                    format!("ppt/slides/slide{}.xml", i + 1),
                    zip::write::SimpleFileOptions::default(),
                )
                .unwrap();
                let xml = format!(
                    "<?xml version=\"1.0\"?><p:sld xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">{}</p:sld>",
                    body
                );
                zip.write_all(xml.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn slide_text_runs_join_into_one_unit() {
        let bytes = pptx_with_slides(&[
            "<a:p><a:r><a:t>Quarterly results.</a:t></a:r></a:p><a:p><a:r><a:t>Revenue grew.</a:t></a:r></a:p>",
            "<a:p><a:r><a:t>Outlook.</a:t></a:r></a:p>",
        ]);
        let units = parse_bytes(&bytes, "deck.pptx").unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "Quarterly results. Revenue grew.");
        assert_eq!(units[0].kind, UnitKind::PptxSlide);
        assert_eq!(units[0].pos.slide, Some(1));
        assert_eq!(units[1].pos.slide, Some(2));
    }

    #[test]
    fn slide_tables_flatten_with_slide_position() {
        let bytes = pptx_with_slides(&[
            "<a:tbl>\
               <a:tr><a:tc><a:txBody><a:p><a:r><a:t>Metric</a:t></a:r></a:p></a:txBody></a:tc><a:tc><a:txBody><a:p><a:r><a:t>Value</a:t></a:r></a:p></a:txBody></a:tc></a:tr>\
               <a:tr><a:tc><a:txBody><a:p><a:r><a:t>Revenue</a:t></a:r></a:p></a:txBody></a:tc><a:tc><a:txBody><a:p><a:r><a:t>12</a:t></a:r></a:p></a:txBody></a:tc></a:tr>\
             </a:tbl>",
        ]);
        let units = parse_bytes(&bytes, "deck.pptx").unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "Metric: Revenue; Value: 12");
        assert_eq!(units[0].pos.slide, Some(1));
        assert_eq!(units[0].pos.table, Some(1));
        assert_eq!(units[0].pos.row, Some(1));
    }

    #[test]
    fn degenerate_table_is_skipped_not_fatal() {
        let bytes = pptx_with_slides(&[
            "<a:p><a:r><a:t>Intro.</a:t></a:r></a:p><a:tbl></a:tbl>",
        ]);
        let units = parse_bytes(&bytes, "deck.pptx").unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].kind, UnitKind::PptxSlide);
    }

    #[test]
    fn slides_sort_numerically_not_lexically() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            for n in [10, 2] {
                zip.start_file(
                    format!("ppt/slides/slide{}.xml", n),
                    zip::write::SimpleFileOptions::default(),
                )
                .unwrap();
                let xml = format!(
                    "<p:sld xmlns:a=\"x\" xmlns:p=\"y\"><a:p><a:r><a:t>slide {}</a:t></a:r></a:p></p:sld>",
                    n
                );
                zip.write_all(xml.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        let units = parse_bytes(&buf, "deck.pptx").unwrap();
        assert_eq!(units[0].text, "slide 2");
        assert_eq!(units[0].pos.slide, Some(1));
        assert_eq!(units[1].text, "slide 10");
        assert_eq!(units[1].pos.slide, Some(2));
    }
}
