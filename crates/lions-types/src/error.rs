use thiserror::Error;

/// Outcome taxonomy shared by every forum component.
///
/// The HTTP boundary maps each variant onto a status code; nothing below the
/// boundary knows about HTTP.
#[derive(Debug, Error)]
pub enum ForumError {
    /// Malformed or out-of-range input. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The store was unavailable or a write failed.
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ForumError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        Self::Storage(err.into())
    }
}

pub type ForumResult<T> = Result<T, ForumError>;
