//! On-demand history backfill.
//!
//! Shares its keyword predicate with `lw-processor` (both defer to
//! `lw_core::keywords::admits`) and the transient half of `lw-sessions`'
//! session pool, but otherwise runs independently of the live monitor —
//! an extraction is a one-shot request/response/progress-stream exchange,
//! not a standing subscription.

pub mod error;
pub mod extractor;
pub mod types;

pub use error::{HistoryError, Result};
pub use extractor::HistoryExtractor;
pub use types::{
    ExtractedMessage, ExtractionPayload, ExtractionProgress, ExtractionRequest, ExtractionSummary,
};
