use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Store(#[from] lw_store::StoreError),

    #[error(transparent)]
    Egress(#[from] lw_egress::EgressError),
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
