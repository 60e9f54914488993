use thiserror::Error;

#[derive(Debug, Error)]
pub enum TariffError {
    #[error(transparent)]
    Store(#[from] lw_store::StoreError),
}

pub type Result<T> = std::result::Result<T, TariffError>;
