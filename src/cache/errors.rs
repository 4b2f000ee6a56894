//! Upload store error types
//!
//! Structured errors for the file cache. I/O failures carry the operation
//! that was in flight so log lines and HTTP error bodies read like
//! "renaming upload: permission denied" instead of a bare errno.

/// Errors surfaced by [`FileCache`](super::FileCache) operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("no upload with ID '{0}'")]
    NotFound(String),

    #[error("{op}: {source}")]
    Io {
        op: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not mint a fresh ID after {0} attempts")]
    CollisionExhausted(u32),
}

impl CacheError {
    /// Wrap an I/O error with the operation it interrupted.
    pub fn io(op: impl Into<String>, source: std::io::Error) -> Self {
        CacheError::Io {
            op: op.into(),
            source,
        }
    }

    /// Whether this error means the ID simply was not present.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}
