//! Shared test doubles for the external collaborator boundaries.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use docqa_harness::coordinator::Coordinator;
use docqa_harness::embedding::Embedder;
use docqa_harness::ingest::IngestionStage;
use docqa_harness::retrieval::RetrievalStage;
use docqa_harness::store::memory::InMemoryStore;
use docqa_harness::synthesis::{CompletionModel, SynthesisStage};

/// Deterministic embedder: hashed bag of words. Identical texts embed
/// identically, overlapping texts land nearby under cosine similarity.
pub struct BagOfWordsEmbedder;

impl BagOfWordsEmbedder {
    fn vector_for(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 32];
        for word in text.to_lowercase().split_whitespace() {
            let mut h: usize = 5381;
            for b in word.bytes() {
                h = h.wrapping_mul(33).wrapping_add(b as usize);
            }
            v[h % 32] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    fn model_name(&self) -> &str {
        "test-bag-of-words"
    }
    fn dims(&self) -> usize {
        32
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }
}

/// Completion model that replays a fixed raw response.
pub struct ScriptedModel(pub String);

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// A coordinator over an in-memory store, the bag-of-words embedder, and
/// a scripted model, plus a handle to the store for assertions.
pub fn coordinator_with(raw_model_response: &str) -> (Coordinator, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let coordinator = Coordinator::new(
        IngestionStage::new(),
        RetrievalStage::new(Arc::new(BagOfWordsEmbedder), store.clone(), 5),
        SynthesisStage::new(Arc::new(ScriptedModel(raw_model_response.to_string()))),
    );
    (coordinator, store)
}
