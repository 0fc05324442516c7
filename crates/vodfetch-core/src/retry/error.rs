//! Per-attempt fragment error type for retry classification.

use std::fmt;

/// Error returned by a single fragment (or playlist) request attempt.
/// Kept as a plain enum so the retry layer can classify it before the job
/// converts it into the public `RetrievalError` taxonomy.
#[derive(Debug)]
pub enum FragmentError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Transfer completed with a 2xx status but an empty body. Fragments are
    /// never zero bytes, so this is treated like a truncated connection.
    EmptyBody,
    /// Disk write failed (e.g. disk full, permission denied). Not retried.
    Storage(std::io::Error),
}

impl fmt::Display for FragmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentError::Curl(e) => write!(f, "{}", e),
            FragmentError::Http(code) => write!(f, "HTTP {}", code),
            FragmentError::EmptyBody => write!(f, "empty response body"),
            FragmentError::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl std::error::Error for FragmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FragmentError::Curl(e) => Some(e),
            FragmentError::Storage(e) => Some(e),
            FragmentError::Http(_) | FragmentError::EmptyBody => None,
        }
    }
}
