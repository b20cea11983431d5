//! Vector index abstraction.
//!
//! The [`VectorStore`] trait defines the index lifecycle the retrieval
//! stage needs, enabling pluggable backends (in-memory for tests and
//! small corpora, a remote vector database in deployment).
//!
//! Implementations must be `Send + Sync`. Individual operations are
//! assumed atomic at the storage layer; there is no cross-call
//! transaction, so backends serving concurrent clients must serialize
//! writes per index while permitting concurrent reads.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`upsert`](VectorStore::upsert) | Insert or overwrite records by id |
//! | [`delete_where_source`](VectorStore::delete_where_source) | Remove all records for one source file |
//! | [`delete_ids`](VectorStore::delete_ids) | Remove records by id |
//! | [`ids_where_source`](VectorStore::ids_where_source) | Ids of all records for one source file |
//! | [`query`](VectorStore::query) | Nearest-neighbor search, ranked |
//! | [`list_sources`](VectorStore::list_sources) | Distinct indexed source files |
//! | [`get_record`](VectorStore::get_record) | Fetch one record by id |
//! | [`embedding_fingerprint`](VectorStore::embedding_fingerprint) | Stored embedding-model stamp |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ChunkMetadata;

/// One vector index entry: embedding, document text, and the metadata
/// projection used for filtering and citations.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// `"<source_file>_<per-file ordinal>"`, deterministic per file.
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// SHA-256 of `text`; lets re-ingests keep vectors for unchanged chunks.
    pub content_hash: String,
}

/// A record with its similarity score, as returned by a query.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: StoredRecord,
    pub score: f32,
}

/// Abstract vector index backend.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite records, keyed by `id`.
    async fn upsert(&self, records: Vec<StoredRecord>) -> Result<()>;

    /// Remove every record whose metadata `source_file` equals the given
    /// value (exact match). Returns the number removed; zero matches is a
    /// success, not an error.
    async fn delete_where_source(&self, source_file: &str) -> Result<usize>;

    /// Remove the records with the given ids. Unknown ids are ignored;
    /// returns the number actually removed.
    async fn delete_ids(&self, ids: &[String]) -> Result<usize>;

    /// Ids of every record for `source_file` (exact match), sorted.
    async fn ids_where_source(&self, source_file: &str) -> Result<Vec<String>>;

    /// Return up to `top_k` records nearest to `vector`, best first.
    /// A `top_k` larger than the corpus returns everything available.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>>;

    /// Distinct `source_file` values currently indexed, sorted.
    async fn list_sources(&self) -> Result<Vec<String>>;

    /// Fetch one record by id.
    async fn get_record(&self, id: &str) -> Result<Option<StoredRecord>>;

    /// The embedding-model stamp recorded for this index, if any.
    async fn embedding_fingerprint(&self) -> Result<Option<String>>;

    /// Record the embedding-model stamp for this index.
    async fn set_embedding_fingerprint(&self, fingerprint: &str) -> Result<()>;
}
