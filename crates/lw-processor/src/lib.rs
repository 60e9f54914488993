//! The message-dispatch pipeline: keyword filtering,
//! tariff-aware rendering, bounded-concurrency delivery with retries and
//! TTL caches.

pub mod cache;
pub mod error;
pub mod keywords;
pub mod processor;
pub mod render;
pub mod types;

pub use error::{ProcessorError, Result};
pub use processor::MessageProcessor;
