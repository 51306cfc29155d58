use snip_core::{CollisionStrategy, CoreError, StoreError};
use snip_index::IndexError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code already indexed: {0}")]
    DuplicateKey(String),
    #[error("invalid character '{character}' at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("no free short code for '{code}' after {attempts} attempts using {strategy}")]
    CollisionExhausted {
        code: String,
        strategy: CollisionStrategy,
        attempts: u32,
    },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("external store error: {0}")]
    ExternalStore(#[from] StoreError),
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

impl From<CoreError> for EngineError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidCharacter {
                character,
                position,
            } => Self::InvalidCharacter {
                character,
                position,
            },
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

impl From<IndexError> for EngineError {
    fn from(value: IndexError) -> Self {
        match value {
            IndexError::DuplicateKey(code) => Self::DuplicateKey(code),
        }
    }
}
