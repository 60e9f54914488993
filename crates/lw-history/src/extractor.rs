use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use lw_core::config::{
    HISTORY_MESSAGE_WORKERS, HISTORY_PAGE_CONCURRENCY, HISTORY_PAGE_SIZE, HISTORY_PROGRESS_STEP_PCT,
};
use lw_core::keywords::admits;
use lw_platform::{PlatformError, PlatformMessage};
use lw_sessions::SessionPool;

use crate::types::{
    ExtractedMessage, ExtractionPayload, ExtractionProgress, ExtractionRequest, ExtractionSummary,
};

/// On-demand paginated backfill from a chat, streamed as progress updates
/// and concluded with a tabular artifact.
///
/// Billing-agnostic by design: charge/refund decisions live
/// at the adapter boundary that calls `extract`, not here.
pub struct HistoryExtractor {
    pool: Arc<SessionPool>,
    page_semaphore: Arc<Semaphore>,
    message_semaphore: Arc<Semaphore>,
}

impl HistoryExtractor {
    pub fn new(pool: Arc<SessionPool>) -> Arc<Self> {
        Arc::new(Self {
            pool,
            page_semaphore: Arc::new(Semaphore::new(HISTORY_PAGE_CONCURRENCY)),
            message_semaphore: Arc::new(Semaphore::new(HISTORY_MESSAGE_WORKERS)),
        })
    }

    /// `extract(chat_handle, limit?, keywords?) -> stream of (progress%,
    /// final_payload?)`. The final payload is emitted
    /// exactly once with `progress = 100`.
    pub fn extract(self: &Arc<Self>, request: ExtractionRequest) -> ReceiverStream<ExtractionProgress> {
        let (tx, rx) = mpsc::channel(16);
        let extractor = Arc::clone(self);
        tokio::spawn(async move {
            extractor.run(request, tx).await;
        });
        ReceiverStream::new(rx)
    }

    async fn run(self: Arc<Self>, request: ExtractionRequest, tx: mpsc::Sender<ExtractionProgress>) {
        let session = match self.pool.acquire_transient().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "history extraction: no session available");
                let _ = tx.send(empty_progress(None, request.keywords.clone())).await;
                return;
            }
        };

        let chat = match session.client.resolve_chat(&request.chat_handle).await {
            Ok(chat) => chat,
            Err(e) => {
                warn!(chat = %request.chat_handle, error = %e, "history extraction: chat not resolvable");
                self.pool.release_transient(session).await;
                let _ = tx.send(empty_progress(None, request.keywords.clone())).await;
                return;
            }
        };

        if chat.total_messages.unwrap_or(0) == 0 {
            info!(chat = %request.chat_handle, "history extraction: chat is empty");
            self.pool.release_transient(session).await;
            let _ = tx
                .send(empty_progress(chat.title.clone(), request.keywords.clone()))
                .await;
            return;
        }

        let expected_total = request
            .limit
            .map(|l| l as u64)
            .unwrap_or_else(|| chat.total_messages.unwrap_or(1));

        let mut cursor: Option<i64> = None;
        let mut extracted: Vec<ExtractedMessage> = Vec::new();
        let mut scanned: u64 = 0;
        let mut matched: u64 = 0;
        let mut last_reported_pct: u32 = 0;

        loop {
            if let Some(limit) = request.limit {
                if scanned >= limit as u64 {
                    break;
                }
            }

            let page_permit = self.page_semaphore.clone().acquire_owned().await;
            let page_size = request
                .limit
                .map(|l| l.saturating_sub(scanned as u32).min(HISTORY_PAGE_SIZE))
                .unwrap_or(HISTORY_PAGE_SIZE)
                .max(1);
            let page_result = session.client.history_page(&chat, cursor, page_size).await;
            drop(page_permit);

            let page = match page_result {
                Ok(page) => page,
                Err(PlatformError::RateLimited { wait_secs }) => {
                    warn!(chat = %request.chat_handle, wait_secs, "history extraction: rate limited, aborting");
                    tokio::time::sleep(std::time::Duration::from_secs(wait_secs)).await;
                    self.pool.release_transient(session).await;
                    let _ = tx.send(ExtractionProgress { percent: 100, payload: None }).await;
                    return;
                }
                Err(e) => {
                    warn!(chat = %request.chat_handle, error = %e, "history extraction: page fetch failed, aborting");
                    self.pool.release_transient(session).await;
                    let _ = tx.send(ExtractionProgress { percent: 100, payload: None }).await;
                    return;
                }
            };

            if page.is_empty() {
                break;
            }

            cursor = page.last().map(|m| m.message_id);
            let page_len = page.len() as u64;
            let (page_extracted, page_matched) = self.process_page(page, request.keywords.as_deref()).await;

            scanned += page_len;
            matched += page_matched;
            extracted.extend(page_extracted);

            let pct = ((scanned.min(expected_total) * 100) / expected_total.max(1)).min(99) as u32;
            if pct >= last_reported_pct + HISTORY_PROGRESS_STEP_PCT {
                last_reported_pct = pct;
                let _ = tx.send(ExtractionProgress { percent: pct, payload: None }).await;
            }
        }

        self.pool.release_transient(session).await;

        let summary = ExtractionSummary {
            chat_title: chat.title.clone(),
            total_messages_scanned: scanned,
            matched,
            keywords: request.keywords.clone(),
            extracted_at: chrono::Utc::now(),
        };
        let _ = tx
            .send(ExtractionProgress {
                percent: 100,
                payload: Some(ExtractionPayload {
                    messages: extracted,
                    summary,
                }),
            })
            .await;
    }

    /// Apply the keyword predicate to a page's messages, bounded by the
    /// message worker semaphore (spec §4.4: "dispatch per-message
    /// processing tasks to a worker pool (≤5 workers)").
    async fn process_page(
        &self,
        page: Vec<PlatformMessage>,
        keywords: Option<&str>,
    ) -> (Vec<ExtractedMessage>, u64) {
        let mut handles = Vec::with_capacity(page.len());
        for message in page {
            let semaphore = self.message_semaphore.clone();
            let keywords = keywords.map(str::to_string);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let is_match = admits(&message.text, keywords.as_deref());
                (message, is_match)
            }));
        }

        let mut extracted = Vec::new();
        let mut matched = 0u64;
        for handle in handles {
            if let Ok((message, is_match)) = handle.await {
                if !is_match {
                    continue;
                }
                matched += 1;
                extracted.push(ExtractedMessage {
                    message_id: message.message_id,
                    date: message.date,
                    sender_name: message.sender.display_name.clone(),
                    sender_handle: message.sender.username.clone(),
                    text: message.text,
                });
            }
        }
        (extracted, matched)
    }
}

fn empty_progress(chat_title: Option<String>, keywords: Option<String>) -> ExtractionProgress {
    ExtractionProgress {
        percent: 100,
        payload: Some(ExtractionPayload {
            messages: Vec::new(),
            summary: ExtractionSummary {
                chat_title,
                total_messages_scanned: 0,
                matched: 0,
                keywords,
                extracted_at: chrono::Utc::now(),
            },
        }),
    }
}
