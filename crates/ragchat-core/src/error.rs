use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("Index is empty")]
    IndexEmpty,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Stable label for the error category, used in stage events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Embedding(_) => "embedding_error",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::InvalidVector(_) => "invalid_vector",
            Error::IndexEmpty => "index_empty",
            Error::InvalidQuery(_) => "invalid_query",
            Error::Generation(_) => "generation_error",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Storage(_) => "storage_error",
        }
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        Error::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
