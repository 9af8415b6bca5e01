use thiserror::Error;

/// Failures surfaced by the stores the engine reads from.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Unavailable(value.to_string())
            }
            other => Self::Database(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid responses: {0}")]
    InvalidInput(String),

    #[error("question metadata unavailable: {0}")]
    MetadataUnavailable(String),
}

impl From<StoreError> for ScoringError {
    fn from(value: StoreError) -> Self {
        Self::MetadataUnavailable(value.to_string())
    }
}
