use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankingError {
    #[error("Invalid comparison: both sides are the same item")]
    InvalidComparison,
    #[error("Item already exists: {0}")]
    ItemAlreadyExists(String),
    #[error("Item not found: {0}")]
    ItemNotFound(String),
    #[error("No item pool is active")]
    NoActivePool,
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
