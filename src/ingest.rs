//! Ingestion stage: parse + chunk a batch of files.
//!
//! Drives [`parse_file`] and [`chunk_units`] over each path in order and
//! concatenates the results into one uniform chunk batch. Any parse
//! failure aborts the whole batch; there is no partial-success ingestion.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::chunker::chunk_units;
use crate::models::Chunk;
use crate::parse::parse_file;

#[derive(Debug, Default)]
pub struct IngestionStage;

impl IngestionStage {
    pub fn new() -> Self {
        Self
    }

    /// Parse and chunk every file, in input order.
    pub fn ingest(&self, file_paths: &[PathBuf]) -> Result<Vec<Chunk>> {
        let mut all_chunks = Vec::new();
        for path in file_paths {
            let units = parse_file(path)
                .with_context(|| format!("failed to ingest {}", path.display()))?;
            let chunks = chunk_units(units);
            debug!(path = %path.display(), chunks = chunks.len(), "parsed and chunked file");
            all_chunks.extend(chunks);
        }
        Ok(all_chunks)
    }
}
