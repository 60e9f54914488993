//! Settled-payment ingestion: signature verification, order
//! id dispatch, idempotent crediting, and outbound payment-form URLs.

pub mod bridge;
pub mod error;
pub mod receipt;
pub mod signature;
pub mod types;

pub use bridge::PaymentBridge;
pub use error::{PaymentsError, Result};
pub use types::{parse_order_id, OrderId};
