//! Retrieval/store stage: owns the vector index lifecycle.
//!
//! Upserts chunk batches, deletes by source file, and answers similarity
//! queries, always through the injected [`Embedder`] and [`VectorStore`]
//! handles. The same embedder must serve ingestion and query; the stage
//! stamps the store with the embedder's fingerprint on first write and
//! rejects a mismatching embedder on every later write or query.
//!
//! Record ids are `"<source_file>_<ordinal>"` with the ordinal file-scoped
//! and deterministic (1-based, order of appearance in the batch). New
//! records are written first; ids the batch no longer produces are then
//! removed, so a re-ingest with fewer chunks leaves no stale tail behind
//! while a failed re-ingest leaves the previous records intact. Chunks
//! whose content hash matches the stored record keep their vector and
//! are not re-embedded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::debug;

use crate::embedding::Embedder;
use crate::models::{Chunk, RetrievedChunk};
use crate::store::{StoredRecord, VectorStore};

pub struct RetrievalStage {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    default_top_k: usize,
}

impl RetrievalStage {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            default_top_k,
        }
    }

    /// Validate the stored embedding fingerprint against our embedder,
    /// stamping the store on first use when `stamp_if_missing`.
    async fn check_fingerprint(&self, stamp_if_missing: bool) -> Result<()> {
        let ours = self.embedder.fingerprint();
        match self.store.embedding_fingerprint().await? {
            Some(stored) if stored != ours => bail!(
                "embedding model mismatch: index was built with {}, current embedder is {}",
                stored,
                ours
            ),
            Some(_) => Ok(()),
            None => {
                if stamp_if_missing {
                    self.store.set_embedding_fingerprint(&ours).await?;
                }
                Ok(())
            }
        }
    }

    /// Embed and index a chunk batch. Returns the number of records written.
    pub async fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        self.check_fingerprint(true).await?;

        // Assign per-file ordinals in order of appearance.
        let mut counters: HashMap<&str, u32> = HashMap::new();
        let mut files: Vec<String> = Vec::new();
        let mut ids = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let n = counters.entry(chunk.source_file.as_str()).or_insert(0);
            if *n == 0 {
                files.push(chunk.source_file.clone());
            }
            *n += 1;
            ids.push(format!("{}_{}", chunk.source_file, n));
        }

        // Keep stored vectors for unchanged chunks; embed the rest in one batch.
        let mut reused: Vec<Option<Vec<f32>>> = Vec::with_capacity(chunks.len());
        let mut to_embed: Vec<String> = Vec::new();
        for (chunk, id) in chunks.iter().zip(&ids) {
            match self.store.get_record(id).await? {
                Some(existing) if existing.content_hash == chunk.hash => {
                    reused.push(Some(existing.vector));
                }
                _ => {
                    reused.push(None);
                    to_embed.push(chunk.text.clone());
                }
            }
        }
        let fresh = if to_embed.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(&to_embed).await?
        };
        if fresh.len() != to_embed.len() {
            bail!(
                "embedder returned {} vectors for {} texts",
                fresh.len(),
                to_embed.len()
            );
        }

        let mut fresh_iter = fresh.into_iter();
        let mut records = Vec::with_capacity(chunks.len());
        for ((chunk, id), kept) in chunks.iter().zip(&ids).zip(reused) {
            let vector = match kept {
                Some(v) => v,
                None => fresh_iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("embedding batch exhausted early"))?,
            };
            records.push(StoredRecord {
                id: id.clone(),
                vector,
                text: chunk.text.clone(),
                metadata: chunk.metadata(),
                content_hash: chunk.hash.clone(),
            });
        }

        // Upsert first, then drop only the ids this batch no longer
        // produces; a failure anywhere above leaves the previous index
        // state untouched, and shrinking re-ingests still leave no
        // stale ordinals behind.
        let mut previous: Vec<String> = Vec::new();
        for file in &files {
            previous.extend(self.store.ids_where_source(file).await?);
        }
        let written = records.len();
        self.store.upsert(records).await?;
        let current: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let stale: Vec<String> = previous
            .into_iter()
            .filter(|id| !current.contains(id.as_str()))
            .collect();
        if !stale.is_empty() {
            self.store.delete_ids(&stale).await?;
        }
        debug!(files = files.len(), records = written, "indexed chunk batch");
        Ok(written)
    }

    /// Remove every record for `source_file`. Zero matches is a success.
    pub async fn delete(&self, source_file: &str) -> Result<usize> {
        let removed = self.store.delete_where_source(source_file).await?;
        debug!(source_file, removed, "deleted indexed records");
        Ok(removed)
    }

    /// Distinct source files currently indexed.
    pub async fn list_files(&self) -> Result<Vec<String>> {
        self.store.list_sources().await
    }

    /// Retrieve the `top_k` chunks nearest to `user_query`, best first.
    ///
    /// `top_k` falls back to the configured default when absent and must
    /// be at least 1; asking for more records than the corpus holds
    /// returns everything available.
    pub async fn query(
        &self,
        user_query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>> {
        let k = top_k.unwrap_or(self.default_top_k);
        if k == 0 {
            bail!("top_k must be a positive integer");
        }
        self.check_fingerprint(false).await?;

        let vector = self.embedder.embed_one(user_query).await?;
        let hits = self.store.query(&vector, k).await?;
        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                text: hit.record.text,
                metadata: hit.record.metadata,
            })
            .collect())
    }
}
