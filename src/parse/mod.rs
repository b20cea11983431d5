//! Multi-format document parsing.
//!
//! [`parse_file`] dispatches on the file extension and returns a flat
//! list of [`SourceUnit`]s: free text split by page, paragraph, or slide,
//! and tables flattened to one key-value row per record (see [`table`]).
//!
//! Supported extensions: `pdf`, `csv`, `pptx`, `docx`, `txt`, `md`.
//! Anything else fails with [`ParseError::UnsupportedFormat`]. Read and
//! format errors propagate; the one exception is PPTX per-table
//! conversion, which logs and skips a failed table while the rest of the
//! deck is still returned.

pub mod csv;
pub mod docx;
pub mod pdf;
pub mod pptx;
pub mod table;
pub mod txt;

use std::io::Read;
use std::path::Path;

use crate::models::SourceUnit;

/// Maximum decompressed bytes to read from a single ZIP entry
/// (zip-bomb protection for OOXML containers).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Parsing error. Everything except [`ParseError::UnsupportedFormat`]
/// wraps a backend failure for one concrete format.
#[derive(Debug)]
pub enum ParseError {
    /// The file extension maps to no known parser.
    UnsupportedFormat(String),
    Io(std::io::Error),
    Pdf(String),
    Ooxml(String),
    Csv(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnsupportedFormat(ext) => {
                write!(f, "unsupported file format: .{}", ext)
            }
            ParseError::Io(e) => write!(f, "read failed: {}", e),
            ParseError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ParseError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
            ParseError::Csv(e) => write!(f, "CSV parsing failed: {}", e),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::Io(e)
    }
}

/// Parse a file into pre-chunk units, dispatched by extension.
///
/// The extension comparison is case-insensitive. `source_file` on every
/// returned unit is the file's base name, never a path.
pub fn parse_file(path: &Path) -> Result<Vec<SourceUnit>, ParseError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => pdf::parse(path, &source_file),
        "csv" => csv::parse(path, &source_file),
        "pptx" => pptx::parse(path, &source_file),
        "docx" => docx::parse(path, &source_file),
        "txt" | "md" => txt::parse(path, &source_file),
        other => Err(ParseError::UnsupportedFormat(other.to_string())),
    }
}

/// Read one named ZIP entry with a decompressed-size bound.
pub(crate) fn read_zip_entry(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ParseError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ParseError::Ooxml(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ParseError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ParseError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(out)
}
