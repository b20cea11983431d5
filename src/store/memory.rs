//! In-memory [`VectorStore`] for tests and small corpora.
//!
//! Records live in a `HashMap` behind `std::sync::RwLock`. Queries are
//! brute-force cosine similarity over all stored vectors, ranked
//! descending with record id as the tie-breaker so results are
//! deterministic.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use super::{ScoredRecord, StoredRecord, VectorStore};

#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, StoredRecord>>,
    fingerprint: RwLock<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, records: Vec<StoredRecord>) -> Result<()> {
        let mut stored = self.records.write().unwrap();
        for record in records {
            stored.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn delete_where_source(&self, source_file: &str) -> Result<usize> {
        let mut stored = self.records.write().unwrap();
        let before = stored.len();
        stored.retain(|_, r| r.metadata.source_file != source_file);
        Ok(before - stored.len())
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<usize> {
        let mut stored = self.records.write().unwrap();
        let before = stored.len();
        for id in ids {
            stored.remove(id);
        }
        Ok(before - stored.len())
    }

    async fn ids_where_source(&self, source_file: &str) -> Result<Vec<String>> {
        let stored = self.records.read().unwrap();
        let mut ids: Vec<String> = stored
            .values()
            .filter(|r| r.metadata.source_file == source_file)
            .map(|r| r.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        let stored = self.records.read().unwrap();
        let mut scored: Vec<ScoredRecord> = stored
            .values()
            .map(|r| ScoredRecord {
                score: cosine_sim(vector, &r.vector),
                record: r.clone(),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn list_sources(&self) -> Result<Vec<String>> {
        let stored = self.records.read().unwrap();
        let mut sources: Vec<String> = stored
            .values()
            .map(|r| r.metadata.source_file.clone())
            .collect();
        sources.sort();
        sources.dedup();
        Ok(sources)
    }

    async fn get_record(&self, id: &str) -> Result<Option<StoredRecord>> {
        Ok(self.records.read().unwrap().get(id).cloned())
    }

    async fn embedding_fingerprint(&self) -> Result<Option<String>> {
        Ok(self.fingerprint.read().unwrap().clone())
    }

    async fn set_embedding_fingerprint(&self, fingerprint: &str) -> Result<()> {
        *self.fingerprint.write().unwrap() = Some(fingerprint.to_string());
        Ok(())
    }
}
