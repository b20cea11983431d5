//! Coordinator: routes typed messages between pipeline stages.
//!
//! Purely a dispatcher. It inspects the payload variant, forwards the
//! request to exactly one stage, transforms the stage's output into the
//! next message in the chain, and preserves `trace_id` across every
//! derived message. Unknown message kinds are logged and answered with
//! `None` so an unrecognized request is never fatal to the caller.
//!
//! Two chains exist:
//! - `INGESTION_REQUEST` → `ADDTO_DB` → `DB_STATUS`
//! - `RETRIEVAL_REQUEST` → `LLM_REQUEST` → `LLM_RESPONSE`
//!
//! plus the direct `DELETEFROM_DB` → `DB_STATUS` path.

use anyhow::{bail, Result};
use tracing::warn;

use crate::ingest::IngestionStage;
use crate::message::{role, Message, Payload};
use crate::retrieval::RetrievalStage;
use crate::synthesis::SynthesisStage;

pub struct Coordinator {
    ingestion: IngestionStage,
    retrieval: RetrievalStage,
    synthesis: SynthesisStage,
}

impl Coordinator {
    pub fn new(
        ingestion: IngestionStage,
        retrieval: RetrievalStage,
        synthesis: SynthesisStage,
    ) -> Self {
        Self {
            ingestion,
            retrieval,
            synthesis,
        }
    }

    /// Route one message through its chain.
    ///
    /// Returns the terminal response message, or `None` for message kinds
    /// the coordinator does not route. Ingestion and store errors
    /// propagate; synthesis failures are already folded into the
    /// `LLM_RESPONSE` payload by the synthesis stage.
    pub async fn handle(&self, message: Message) -> Result<Option<Message>> {
        match &message.payload {
            Payload::IngestionRequest { file_paths } => {
                let chunks = self.ingestion.ingest(file_paths)?;
                let add = message.derive(
                    role::INGESTION,
                    role::RETRIEVAL,
                    Payload::AddToDb { chunks },
                );
                Ok(Some(self.store_chunks(add).await?))
            }
            Payload::DeleteFromDb { source_file } => {
                let removed = self.retrieval.delete(source_file).await?;
                Ok(Some(message.derive(
                    role::RETRIEVAL,
                    message.sender.clone(),
                    Payload::DbStatus {
                        status: "ok".to_string(),
                        detail: format!("deleted {} records for {}", removed, source_file),
                    },
                )))
            }
            Payload::RetrievalRequest { user_query, top_k } => {
                let top_chunks = self.retrieval.query(user_query, *top_k).await?;
                let llm_request = message.derive(
                    role::RETRIEVAL,
                    role::SYNTHESIS,
                    Payload::LlmRequest {
                        user_query: user_query.clone(),
                        top_chunks,
                    },
                );
                Ok(Some(self.synthesize(llm_request, &message.sender).await?))
            }
            other => {
                warn!(
                    trace_id = %message.trace_id,
                    kind = other.kind(),
                    "unknown message type, not routed"
                );
                Ok(None)
            }
        }
    }

    /// Forward an `ADDTO_DB` message to the store stage's upsert.
    ///
    /// Receiving any other kind is a caller contract bug, not a runtime
    /// condition to recover from.
    async fn store_chunks(&self, message: Message) -> Result<Message> {
        match &message.payload {
            Payload::AddToDb { chunks } => {
                let written = self.retrieval.add_chunks(chunks).await?;
                Ok(message.derive(
                    role::RETRIEVAL,
                    role::COORDINATOR,
                    Payload::DbStatus {
                        status: "ok".to_string(),
                        detail: format!("indexed {} chunks", written),
                    },
                ))
            }
            other => bail!("store stage expects ADDTO_DB, got {}", other.kind()),
        }
    }

    /// Forward an `LLM_REQUEST` message to the synthesis stage.
    async fn synthesize(&self, message: Message, reply_to: &str) -> Result<Message> {
        match &message.payload {
            Payload::LlmRequest {
                user_query,
                top_chunks,
            } => {
                let answer = self.synthesis.answer(user_query, top_chunks).await;
                Ok(message.derive(
                    role::SYNTHESIS,
                    reply_to,
                    Payload::LlmResponse {
                        response: answer.response,
                        citation: answer.citation,
                        query: answer.query,
                    },
                ))
            }
            other => bail!("synthesis stage expects LLM_REQUEST, got {}", other.kind()),
        }
    }
}
