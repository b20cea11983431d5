//! Core data models used throughout the pipeline.
//!
//! These types represent the units that flow from parsing through chunking,
//! storage, and retrieval: parser output ([`SourceUnit`]), the stored unit
//! ([`Chunk`]), the metadata projection written to the vector index
//! ([`ChunkMetadata`]), and the pairs returned by similarity queries
//! ([`RetrievedChunk`]).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Origin tag for a unit of extracted content.
///
/// Parsers emit one of the format-specific kinds; the chunker rewrites
/// everything except table rows to [`UnitKind::Sentence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    PdfText,
    DocxParagraph,
    PptxSlide,
    TxtParagraph,
    TableRow,
    CsvRow,
    Sentence,
}

impl UnitKind {
    /// Wire name of the kind (matches the serialized form).
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::PdfText => "pdf_text",
            UnitKind::DocxParagraph => "docx_paragraph",
            UnitKind::PptxSlide => "pptx_slide",
            UnitKind::TxtParagraph => "txt_paragraph",
            UnitKind::TableRow => "table_row",
            UnitKind::CsvRow => "csv_row",
            UnitKind::Sentence => "sentence",
        }
    }

    /// True for table-derived rows, which pass through chunking unchanged.
    pub fn is_tabular(&self) -> bool {
        matches!(self, UnitKind::TableRow | UnitKind::CsvRow)
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positional metadata attached to a unit or chunk. All indices are 1-based.
///
/// Which fields are present depends on the origin: a PDF page sets `page`,
/// a DOCX table row sets `table` and `row`, a sentence chunk sets
/// `sentence` plus whatever the source unit carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<u32>,
}

impl Position {
    pub fn is_empty(&self) -> bool {
        *self == Position::default()
    }
}

/// Raw unit produced by a parser, before chunking.
///
/// One unit per paragraph, page, slide, or flattened table row.
/// `source_file` is always the file's base name, never a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub text: String,
    pub source_file: String,
    pub kind: UnitKind,
    #[serde(default)]
    pub pos: Position,
}

impl SourceUnit {
    pub fn new(text: impl Into<String>, source_file: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            text: text.into(),
            source_file: source_file.into(),
            kind,
            pos: Position::default(),
        }
    }

    pub fn with_pos(mut self, pos: Position) -> Self {
        self.pos = pos;
        self
    }
}

/// The atomic retrievable unit: a sentence or a table row with enough
/// positional metadata to reconstruct a citation.
///
/// Chunks are created once during ingestion and immutable thereafter;
/// they are deleted en masse when their `source_file` is removed from
/// the index. `hash` is the SHA-256 hex of `text`, used to detect
/// unchanged chunks on re-ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_file: String,
    pub kind: UnitKind,
    #[serde(default)]
    pub pos: Position,
    pub hash: String,
}

impl Chunk {
    pub fn new(
        text: impl Into<String>,
        source_file: impl Into<String>,
        kind: UnitKind,
        pos: Position,
    ) -> Self {
        let text = text.into();
        let hash = content_hash(&text);
        Self {
            text,
            source_file: source_file.into(),
            kind,
            pos,
            hash,
        }
    }

    /// The metadata projection stored alongside the embedding.
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source_file: self.source_file.clone(),
            kind: self.kind,
            pos: self.pos,
        }
    }
}

/// SHA-256 hex digest of a chunk's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Metadata projection written to the vector index per record.
///
/// Exactly `source_file`, the origin kind, and whichever positional
/// fields are present; this is what citation formatting consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_file: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    #[serde(flatten)]
    pub pos: Position,
}

/// A `{text, metadata}` pair returned by a similarity query, in
/// descending relevance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}
