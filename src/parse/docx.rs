//! DOCX parsing: body paragraphs plus tables from `word/document.xml`.
//!
//! Streams the document XML once. Top-level `w:p` elements become
//! `docx_paragraph` units (the paragraph index counts every body
//! paragraph, empty ones included, so positions stay stable). Each
//! `w:tbl` is captured as a cell grid and flattened to `table_row` units
//! with its first row as headers.

use std::path::Path;

use quick_xml::events::Event;

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
    let xml = read_zip_entry(&mut archive, "word/document.xml")?;
    scan_document(&xml, source_file)
}

fn scan_document(xml: &[u8], source_file: &str) -> Result<Vec<SourceUnit>, ParseError> {
    let mut units = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut paragraph_index: u32 = 0;
    let mut paragraph_text = String::new();
    let mut in_paragraph = false;

    let mut table_depth: usize = 0;
    let mut table_num: u32 = 0;
    let mut grid: Vec<Vec<String>> = Vec::new();
    let mut cell_text = String::new();
    let mut in_cell = false;

    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => {
                    if table_depth == 0 {
                        table_num += 1;
                        grid.clear();
                    }
                    table_depth += 1;
                }
                b"tr" if table_depth == 1 => grid.push(Vec::new()),
                b"tc" if table_depth == 1 => {
                    in_cell = true;
                    cell_text.clear();
                }
                b"p" if table_depth == 0 => {
                    in_paragraph = true;
                    paragraph_index += 1;
                    paragraph_text.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().unwrap_or_default();
                if in_cell {
                    cell_text.push_str(&text);
                } else if in_paragraph {
                    paragraph_text.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if in_cell => {
                    // Separate cell paragraphs so their runs don't fuse.
                    cell_text.push(' ');
                }
                b"p" if table_depth == 0 && in_paragraph => {
                    in_paragraph = false;
                    let text = paragraph_text.trim();
                    if !text.is_empty() {
                        units.push(
                            SourceUnit::new(text, source_file, UnitKind::DocxParagraph).with_pos(
                                Position {
                                    paragraph: Some(paragraph_index),
                                    ..Default::default()
                                },
                            ),
                        );
                    }
                }
                b"tc" if table_depth == 1 => {
                    in_cell = false;
                    if let Some(row) = grid.last_mut() {
                        row.push(cell_text.trim().to_string());
                    }
                }
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        if let Ok(table) = Table::from_grid(std::mem::take(&mut grid)) {
                            for (i, text) in table.kv_rows().into_iter().enumerate() {
                                units.push(
                                    SourceUnit::new(text, source_file, UnitKind::TableRow)
                                        .with_pos(Position {
                                            table: Some(table_num),
                                            row: Some(i as u32 + 1),
                                            ..Default::default()
                                        }),
                                );
                            }
                        }
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

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_document_xml(body: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn paragraphs_keep_their_body_index() {
        let bytes = docx_with_document_xml(
            "<w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>\
             <w:p/>\
             <w:p><w:r><w:t>Third paragraph.</w:t></w:r></w:p>",
        );
        let units = parse_bytes(&bytes, "doc.docx").unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "First paragraph.");
        assert_eq!(units[0].pos.paragraph, Some(1));
        // The empty paragraph is skipped but still counted.
        assert_eq!(units[1].text, "Third paragraph.");
        assert_eq!(units[1].pos.paragraph, Some(3));
    }

    #[test]
    fn split_runs_fuse_into_one_paragraph() {
        let bytes = docx_with_document_xml(
            "<w:p><w:r><w:t>Hel</w:t></w:r><w:r><w:t>lo world.</w:t></w:r></w:p>",
        );
        let units = parse_bytes(&bytes, "doc.docx").unwrap();
        assert_eq!(units[0].text, "Hello world.");
    }

    #[test]
    fn tables_flatten_to_rows_with_positions() {
        let bytes = docx_with_document_xml(
            "<w:tbl>\
               <w:tr><w:tc><w:p><w:r><w:t>Name</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Age</w:t></w:r></w:p></w:tc></w:tr>\
               <w:tr><w:tc><w:p><w:r><w:t>Ada</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>36</w:t></w:r></w:p></w:tc></w:tr>\
             </w:tbl>",
        );
        let units = parse_bytes(&bytes, "doc.docx").unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "Name: Ada; Age: 36");
        assert_eq!(units[0].kind, UnitKind::TableRow);
        assert_eq!(units[0].pos.table, Some(1));
        assert_eq!(units[0].pos.row, Some(1));
    }

    #[test]
    fn table_cell_paragraphs_do_not_count_as_body_paragraphs() {
        let bytes = docx_with_document_xml(
            "<w:tbl>\
               <w:tr><w:tc><w:p><w:r><w:t>H</w:t></w:r></w:p></w:tc></w:tr>\
               <w:tr><w:tc><w:p><w:r><w:t>v</w:t></w:r></w:p></w:tc></w:tr>\
             </w:tbl>\
             <w:p><w:r><w:t>After the table.</w:t></w:r></w:p>",
        );
        let units = parse_bytes(&bytes, "doc.docx").unwrap();
        let para = units
            .iter()
            .find(|u| u.kind == UnitKind::DocxParagraph)
            .unwrap();
        assert_eq!(para.pos.paragraph, Some(1));
    }

    #[test]
    fn invalid_zip_is_an_ooxml_error() {
        assert!(matches!(
            parse_bytes(b"not a zip", "doc.docx"),
            Err(ParseError::Ooxml(_))
        ));
    }
}
