use thiserror::Error;

/// Errors related to the core types of the URL shortener.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid base62 character '{character}' at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("cannot decode an empty base62 string")]
    EmptyInput,
    #[error("base62 value does not fit in 64 bits: {0}")]
    Overflow(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("unknown collision strategy '{0}', expected linear, regenerate or append")]
    UnknownStrategy(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
    #[error("store operation timed out: {0}")]
    Timeout(String),
    #[error("store query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("store operation failed: {0}")]
    Operation(String),
}
