use thiserror::Error;

/// Type alias for index results.
pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("short code already indexed: {0}")]
    DuplicateKey(String),
}
