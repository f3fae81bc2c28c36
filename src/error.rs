//! Error taxonomy for the advisory engine
//!
//! Only `AdvisoryError` crosses the aggregator boundary. Generative, context
//! and persistence failures are absorbed internally and turned into a
//! degraded-but-successful advisory.

/// Failures surfaced to the caller of `Aggregator::advise`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvisoryError {
    /// Malformed domain result or missing required context; never retried
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The request-level deadline elapsed before an advisory was ready
    #[error("advisory request exceeded its {deadline_ms} ms deadline")]
    Timeout { deadline_ms: u64 },
}

impl AdvisoryError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AdvisoryError::InvalidInput(msg.into())
    }
}

/// Failures of the generative-language collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerativeError {
    #[error("generative backend disabled by configuration")]
    Disabled,
    #[error("generative backend timed out after {0} ms")]
    Timeout(u64),
    #[error("generative backend unreachable: {0}")]
    Unreachable(String),
    #[error("generative backend returned server error {0}")]
    ServerError(u16),
    #[error("generative backend rejected the request with status {0}")]
    ClientError(u16),
    #[error("malformed generative response: {0}")]
    Malformed(String),
}

impl GenerativeError {
    /// Timeouts and 5xx responses get one fresh retry; everything else
    /// goes straight to the fallback path.
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerativeError::Timeout(_) | GenerativeError::ServerError(_))
    }
}

/// Failures of a context-fetch collaborator (weather/market providers)
#[derive(Debug, thiserror::Error)]
pub enum ContextFetchError {
    #[error("context fetch timed out after {0} ms")]
    Timeout(u64),
    #[error("context provider unavailable: {0}")]
    Unavailable(String),
    #[error("context provider HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("context provider returned undecodable data: {0}")]
    Decode(String),
}

/// Failures of the persistence collaborator
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
