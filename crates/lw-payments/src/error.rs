use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentsError {
    #[error(transparent)]
    Store(#[from] lw_store::StoreError),

    #[error("signature mismatch")]
    BadSignature,

    #[error("unparseable order id: {0}")]
    BadOrderId(String),
}

pub type Result<T> = std::result::Result<T, PaymentsError>;
