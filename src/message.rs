//! Typed messages binding the pipeline stages.
//!
//! Stages communicate through a [`Message`] envelope carrying a
//! [`Payload`] tagged union. The payload's variant is the message type;
//! there is no loosely typed dictionary to validate at runtime, so a
//! shape mismatch is unrepresentable rather than an assertion failure.
//!
//! `trace_id` is a caller-supplied correlation token. Stages propagate it
//! unchanged through every message derived in a chain and never interpret
//! it; it exists to correlate logs and retries end-to-end.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Chunk, RetrievedChunk};

/// Well-known stage role names, used for the informational
/// `sender`/`receiver` fields.
pub mod role {
    pub const CALLER: &str = "Caller";
    pub const COORDINATOR: &str = "Coordinator";
    pub const INGESTION: &str = "IngestionStage";
    pub const RETRIEVAL: &str = "RetrievalStage";
    pub const SYNTHESIS: &str = "SynthesisStage";
}

/// Message payload, tagged by message type.
///
/// Each variant fixes the shape of its payload. The serialized form uses
/// the original wire names (`INGESTION_REQUEST`, `ADDTO_DB`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Payload {
    /// Parse and chunk a batch of files, then index the chunks.
    #[serde(rename = "INGESTION_REQUEST")]
    IngestionRequest { file_paths: Vec<PathBuf> },
    /// Upsert a chunk batch into the vector index.
    #[serde(rename = "ADDTO_DB")]
    AddToDb { chunks: Vec<Chunk> },
    /// Remove every indexed record for one source file.
    #[serde(rename = "DELETEFROM_DB")]
    DeleteFromDb { source_file: String },
    /// Retrieve chunks relevant to a query and synthesize an answer.
    #[serde(rename = "RETRIEVAL_REQUEST")]
    RetrievalRequest {
        user_query: String,
        /// Overrides the configured top-k when present.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        top_k: Option<usize>,
    },
    /// Query plus retrieved context, bound for the synthesis stage.
    #[serde(rename = "LLM_REQUEST")]
    LlmRequest {
        user_query: String,
        top_chunks: Vec<RetrievedChunk>,
    },
    /// Final cited answer (or in-band error text) for the caller.
    #[serde(rename = "LLM_RESPONSE")]
    LlmResponse {
        response: String,
        citation: String,
        query: String,
    },
    /// Acknowledgment for an upsert or delete against the index.
    #[serde(rename = "DB_STATUS")]
    DbStatus { status: String, detail: String },
}

impl Payload {
    /// Wire name of this message type.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::IngestionRequest { .. } => "INGESTION_REQUEST",
            Payload::AddToDb { .. } => "ADDTO_DB",
            Payload::DeleteFromDb { .. } => "DELETEFROM_DB",
            Payload::RetrievalRequest { .. } => "RETRIEVAL_REQUEST",
            Payload::LlmRequest { .. } => "LLM_REQUEST",
            Payload::LlmResponse { .. } => "LLM_RESPONSE",
            Payload::DbStatus { .. } => "DB_STATUS",
        }
    }
}

/// Envelope for inter-stage communication.
///
/// `sender` and `receiver` document the intended route; dispatch is
/// driven solely by the payload variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub receiver: String,
    pub trace_id: String,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        trace_id: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            trace_id: trace_id.into(),
            payload,
        }
    }

    /// Caller-side constructor addressed to the coordinator, with a fresh
    /// UUID v4 trace id.
    pub fn request(payload: Payload) -> Self {
        Self::new(
            role::CALLER,
            role::COORDINATOR,
            Uuid::new_v4().to_string(),
            payload,
        )
    }

    /// Derive a follow-up message in the same chain, preserving the
    /// trace id.
    pub fn derive(
        &self,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self::new(sender, receiver, self.trace_id.clone(), payload)
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kind_names_match_wire_protocol() {
        let msg = Message::request(Payload::RetrievalRequest {
            user_query: "q".into(),
            top_k: None,
        });
        assert_eq!(msg.kind(), "RETRIEVAL_REQUEST");

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "RETRIEVAL_REQUEST");
        assert_eq!(json["payload"]["user_query"], "q");
    }

    #[test]
    fn derive_preserves_trace_id() {
        let req = Message::request(Payload::DeleteFromDb {
            source_file: "a.txt".into(),
        });
        let reply = req.derive(
            role::RETRIEVAL,
            role::COORDINATOR,
            Payload::DbStatus {
                status: "ok".into(),
                detail: "deleted 0 records".into(),
            },
        );
        assert_eq!(reply.trace_id, req.trace_id);
        assert_eq!(reply.kind(), "DB_STATUS");
    }

    #[test]
    fn message_round_trips_through_json() {
        let msg = Message::request(Payload::IngestionRequest {
            file_paths: vec![PathBuf::from("docs/report.pdf")],
        });
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
