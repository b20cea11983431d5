//! Plain-text and Markdown parsing.
//!
//! Each non-empty line is one paragraph unit. The paragraph index counts
//! only emitted paragraphs, 1-based.

use std::path::Path;

use crate::models::{Position, SourceUnit, UnitKind};

use super::ParseError;

pub fn parse(path: &Path, source_file: &str) -> Result<Vec<SourceUnit>, ParseError> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_text(&text, source_file))
}

pub(crate) fn parse_text(text: &str, source_file: &str) -> Vec<SourceUnit> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| {
            SourceUnit::new(line, source_file, UnitKind::TxtParagraph).with_pos(Position {
                paragraph: Some(i as u32 + 1),
                ..Default::default()
            })
        })
        .collect()
}
