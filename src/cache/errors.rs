use thiserror::Error;

/// Failures reported by the redis and REST adapters
#[derive(Debug, Error)]
pub enum CacheError {
    /// Connecting failed, or the REST endpoint was unreachable
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    /// A stored entry or a REST reply could not be decoded
    #[error("Cache serialization error: {0}")]
    SerializationError(String),

    /// The call did not finish within the configured cache timeout
    #[error("Cache operation timed out: {0}")]
    Timeout(String),

    /// The server answered with an error reply
    #[error("Cache backend error: {0}")]
    BackendError(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
