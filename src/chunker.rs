//! Sentence-level chunking of parsed units.
//!
//! Table and CSV rows pass through unchanged; everything else is split
//! on Unicode sentence boundaries (UAX #29), one chunk per non-blank
//! sentence. Output order equals input order, with sentences in reading
//! order, so citations stay stable across re-ingests of the same file.

use unicode_segmentation::UnicodeSegmentation;

use crate::models::{Chunk, Position, SourceUnit, UnitKind};

/// Convert parsed units into retrievable chunks.
///
/// Sentence chunks carry `sentence` numbered from 1 within their source
/// unit and copy the unit's `page`/`paragraph`/`slide` fields. A unit
/// with empty or whitespace-only text yields no chunks.
pub fn chunk_units(units: Vec<SourceUnit>) -> Vec<Chunk> {
    let mut chunks = Vec::with_capacity(units.len());

    for unit in units {
        if unit.kind.is_tabular() {
            chunks.push(Chunk::new(unit.text, unit.source_file, unit.kind, unit.pos));
            continue;
        }

        let mut index: u32 = 0;
        for sentence in unit.text.split_sentence_bounds() {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            index += 1;
            let pos = Position {
                page: unit.pos.page,
                paragraph: unit.pos.paragraph,
                slide: unit.pos.slide,
                sentence: Some(index),
                ..Default::default()
            };
            chunks.push(Chunk::new(
                sentence,
                unit.source_file.clone(),
                UnitKind::Sentence,
                pos,
            ));
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_unit(text: &str) -> SourceUnit {
        SourceUnit::new(text, "report.pdf", UnitKind::PdfText).with_pos(Position {
            page: Some(3),
            ..Default::default()
        })
    }

    #[test]
    fn sentences_are_numbered_in_reading_order() {
        let chunks = chunk_units(vec![text_unit(
            "The model converged. Loss fell below 0.1! Was that expected?",
        )]);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "The model converged.");
        assert_eq!(chunks[1].text, "Loss fell below 0.1!");
        assert_eq!(chunks[2].text, "Was that expected?");
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.kind, UnitKind::Sentence);
            assert_eq!(chunk.pos.sentence, Some(i as u32 + 1));
            assert_eq!(chunk.pos.page, Some(3));
            assert_eq!(chunk.source_file, "report.pdf");
        }
    }

    #[test]
    fn concatenation_reconstructs_the_source_text() {
        let text = "One sentence here. Another follows. And a third.";
        let chunks = chunk_units(vec![text_unit(text)]);
        let rebuilt = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn table_rows_pass_through_unchanged() {
        let unit = SourceUnit::new("Name: Ada; Age: 36", "staff.csv", UnitKind::CsvRow).with_pos(
            Position {
                row: Some(2),
                ..Default::default()
            },
        );
        let chunks = chunk_units(vec![unit.clone()]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, unit.text);
        assert_eq!(chunks[0].kind, UnitKind::CsvRow);
        assert_eq!(chunks[0].pos, unit.pos);
    }

    #[test]
    fn blank_text_yields_zero_chunks() {
        assert!(chunk_units(vec![text_unit("")]).is_empty());
        assert!(chunk_units(vec![text_unit("   \n\t ")]).is_empty());
    }

    #[test]
    fn output_order_follows_input_order() {
        let units = vec![
            SourceUnit::new("Second file? First sentence.", "b.txt", UnitKind::TxtParagraph),
            SourceUnit::new("Row: 1", "t.csv", UnitKind::CsvRow),
            SourceUnit::new("Tail text.", "c.txt", UnitKind::TxtParagraph),
        ];
        let chunks = chunk_units(units);
        let sources: Vec<&str> = chunks.iter().map(|c| c.source_file.as_str()).collect();
        assert_eq!(sources, ["b.txt", "b.txt", "t.csv", "c.txt"]);
    }

    #[test]
    fn paragraph_metadata_is_copied_to_sentences() {
        let unit = SourceUnit::new("Alpha. Beta.", "doc.docx", UnitKind::DocxParagraph).with_pos(
            Position {
                paragraph: Some(7),
                ..Default::default()
            },
        );
        let chunks = chunk_units(vec![unit]);
        assert_eq!(chunks[0].pos.paragraph, Some(7));
        assert_eq!(chunks[1].pos.paragraph, Some(7));
        assert_eq!(chunks[1].pos.sentence, Some(2));
    }
}
