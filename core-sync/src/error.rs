use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] core_store::StoreError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("No free name found for '{candidate}' after {attempts} attempts")]
    NamingExhausted { candidate: String, attempts: u32 },

    #[error("A queue drain is already in progress")]
    DrainInProgress,
}

pub type Result<T> = std::result::Result<T, SyncError>;
