//! # docqa-harness
//!
//! A message-routed document question-answering pipeline. Files are
//! parsed into text and table units, split into sentence chunks, embedded
//! and stored in a vector index, retrieved by semantic similarity, and
//! synthesized into a citation-grounded answer by a language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐
//! │  parse    │──▶│  chunker  │──▶│ retrieval │──▶ vector index
//! │ pdf/docx/ │   │ sentences │   │ embed +   │
//! │ pptx/csv  │   │ + tables  │   │ upsert    │
//! └──────────┘   └───────────┘   └─────┬─────┘
//!                                      │ query
//!                                ┌─────▼─────┐
//!                                │ synthesis │──▶ cited answer
//!                                └───────────┘
//! ```
//!
//! The [`coordinator::Coordinator`] binds the stages with typed
//! [`message::Message`]s: an `INGESTION_REQUEST` flows through parsing and
//! chunking into the index, a `RETRIEVAL_REQUEST` flows through similarity
//! search into a grounded model call, and a `DELETEFROM_DB` removes a
//! file's records. External capabilities — the embedding model, the vector
//! index, and the language model — sit behind the [`embedding::Embedder`],
//! [`store::VectorStore`], and [`synthesis::CompletionModel`] traits and
//! are injected into the stages, so tests run against deterministic
//! doubles.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`message`] | Typed message envelope and payload union |
//! | [`models`] | Units, chunks, metadata projection |
//! | [`parse`] | Extension-dispatched format parsers |
//! | [`chunker`] | Sentence-level chunking |
//! | [`embedding`] | Embedding provider boundary |
//! | [`store`] | Vector index boundary |
//! | [`ingest`] | Parse + chunk stage |
//! | [`retrieval`] | Upsert, delete, similarity query stage |
//! | [`synthesis`] | Prompt, model call, cited answer |
//! | [`coordinator`] | Message router |
//! | [`config`] | TOML configuration |

pub mod chunker;
pub mod config;
pub mod coordinator;
pub mod embedding;
pub mod ingest;
pub mod message;
pub mod models;
pub mod parse;
pub mod retrieval;
pub mod store;
pub mod synthesis;

pub use coordinator::Coordinator;
pub use message::{Message, Payload};
pub use models::{Chunk, ChunkMetadata, Position, RetrievedChunk, SourceUnit, UnitKind};
