use chrono::{DateTime, Utc};
use serde::Serialize;

use lw_core::types::UserId;

/// One row of the final extracted table.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedMessage {
    pub message_id: i64,
    pub date: DateTime<Utc>,
    pub sender_name: Option<String>,
    pub sender_handle: Option<String>,
    pub text: String,
}

/// Accompanies the final batch of `ExtractedMessage`s.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub chat_title: Option<String>,
    pub total_messages_scanned: u64,
    pub matched: u64,
    pub keywords: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

/// The final payload emitted exactly once with `progress = 100` (spec
/// §4.4). `None` covers the empty-chat, inaccessible-chat, and rate-limited
/// terminations, each of which still emits a single `(100, None)` event.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionPayload {
    pub messages: Vec<ExtractedMessage>,
    pub summary: ExtractionSummary,
}

/// A single update on the `extract` stream (spec §4.4 contract:
/// `extract(...) -> stream of (progress%, final_payload?)`).
#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    pub percent: u32,
    pub payload: Option<ExtractionPayload>,
}

/// Extraction request parameters.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub requested_by: UserId,
    pub chat_handle: lw_core::types::ChatHandle,
    pub limit: Option<u32>,
    pub keywords: Option<String>,
}
