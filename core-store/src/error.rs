use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid command row {id}: {reason}")]
    InvalidCommand { id: i64, reason: String },

    #[error("Invalid query parameters: {0}")]
    InvalidQuery(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
