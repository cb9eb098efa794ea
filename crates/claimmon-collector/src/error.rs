/// Errors raised by [`crate::cache::MetricCache`] implementations.
///
/// # Examples
///
/// ```rust
/// use claimmon_collector::error::CacheError;
///
/// let err = CacheError::Unavailable("connection refused".to_string());
/// assert!(err.to_string().contains("connection refused"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backing store could not be reached.
    #[error("Cache: unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("Cache: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
