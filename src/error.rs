/// Errors raised by the card store and the roadmap service.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Card already exists: {0}")]
    DuplicateCard(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BoardError>;
