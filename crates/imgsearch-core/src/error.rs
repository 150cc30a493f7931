use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid query context: {0}")]
    InvalidQueryContext(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Degenerate vector: similarity is undefined for a zero-norm embedding")]
    DegenerateVector,

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Search cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse grouping of [`Error`] used by callers to decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Client-caused; fix the request, do not retry.
    BadInput,
    /// Index-caused per-candidate problems.
    Data,
    /// Embedding service or vector index could not be reached.
    Unavailable,
    Cancelled,
    Internal,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidInput(_) | Error::InvalidQueryContext(_) | Error::InvalidWeights(_) => ErrorClass::BadInput,
            Error::DimensionMismatch { .. } | Error::DegenerateVector => ErrorClass::Data,
            Error::EmbeddingUnavailable(_) | Error::IndexUnavailable(_) => ErrorClass::Unavailable,
            Error::Cancelled => ErrorClass::Cancelled,
            Error::InvalidConfig(_) => ErrorClass::Internal,
        }
    }

    /// HTTP-equivalent status for transports that need one.
    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::BadInput => 400,
            ErrorClass::Data => 422,
            ErrorClass::Unavailable => 503,
            ErrorClass::Cancelled => 499,
            ErrorClass::Internal => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Unavailable
    }
}

pub type Result<T> = std::result::Result<T, Error>;
